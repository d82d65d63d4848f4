//! Phone value normalization.

/// Normalize a raw phone cell.
///
/// Surrounding whitespace and leading `+` signs are removed. Returns `None` when nothing is
/// left, so blank values never reach a bucket. Normalizing an already normalized phone
/// returns it unchanged.
///
/// # Examples
///
/// ```rust
/// use phone_buckets::phone::normalize_phone;
///
/// assert_eq!(normalize_phone(" +79000000001 "), Some("79000000001".to_string()));
/// assert_eq!(normalize_phone("   "), None);
/// ```
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim_start_matches(|c: char| c == '+' || c.is_whitespace())
        .trim_end();

    if trimmed.is_empty() {
        return None;
    }

    Some(trimmed.to_string())
}

/// Normalize an optional cell (missing cells behave like blank ones)
pub fn normalize_cell(raw: Option<&str>) -> Option<String> {
    raw.and_then(normalize_phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_plus_and_whitespace() {
        assert_eq!(normalize_phone("+7900000001").as_deref(), Some("7900000001"));
        assert_eq!(normalize_phone("  7900000001\t").as_deref(), Some("7900000001"));
        assert_eq!(normalize_phone(" + 7900000001").as_deref(), Some("7900000001"));
        assert_eq!(normalize_phone("++5").as_deref(), Some("5"));
        assert_eq!(normalize_phone("+ +1").as_deref(), Some("1"));
    }

    #[test]
    fn test_blank_values_rejected() {
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("   "), None);
        assert_eq!(normalize_phone("+"), None);
        assert_eq!(normalize_phone(" + "), None);
        assert_eq!(normalize_cell(None), None);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for raw in ["+7900000001", " 7900 000 ", "+ +1", "abc", "8(900)1234567"] {
            if let Some(once) = normalize_phone(raw) {
                assert_eq!(normalize_phone(&once), Some(once.clone()), "input {raw:?}");
            }
        }
    }

    #[test]
    fn test_inner_formatting_kept() {
        // Only the edges are cleaned; the value itself is passed through
        assert_eq!(normalize_phone("8 (900) 123").as_deref(), Some("8 (900) 123"));
    }
}
