//! # Configuration Module
//!
//! Configuration structures for the pipeline and its plumbing. Everything is built once at
//! startup, from the environment (after `.env` is loaded), and passed down by reference.
//! The core never reads the environment itself.

use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::day_number::{DayNumberPolicy, DEFAULT_DAY_OF_YEAR_OFFSET};
use crate::errors::PipelineError;
use crate::routing::RoutingTables;
use crate::writer::WriteOrder;

// Constants for directory defaults
pub const DEFAULT_INBOX_DIR: &str = "./csv";
pub const DEFAULT_OUTBOX_DIR: &str = "./txt";

/// What happens to warnings about skipped files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipSeverity {
    /// Only recorded in the log
    Log,
    /// Logged and also sent to the notifier as an alert
    #[default]
    Alert,
}

impl FromStr for SkipSeverity {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(SkipSeverity::Log),
            "alert" => Ok(SkipSeverity::Alert),
            other => Err(PipelineError::Config(format!(
                "unknown skip severity '{other}' (expected 'log' or 'alert')"
            ))),
        }
    }
}

/// Recovery configuration for notification delivery
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Timeout for a single delivery attempt in seconds
    pub operation_timeout_secs: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 1000,  // 1 second
            max_retry_delay_ms: 10000,  // 10 seconds
            operation_timeout_secs: 30, // 30 seconds
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

/// Policies and tables consumed by the core
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub day_policy: DayNumberPolicy,
    pub write_order: WriteOrder,
    pub skip_severity: SkipSeverity,
    pub routing: RoutingTables,
}

/// Telegram delivery settings
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot used for report files (and alerts when no error bot is set)
    pub bot_token: String,
    /// Chat receiving report files
    pub chat_id: String,
    pub error_bot_token: Option<String>,
    pub error_chat_id: Option<String>,
}

// Tokens stay out of logs
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field(
                "error_bot_token",
                &self.error_bot_token.as_ref().map(|_| "<redacted>"),
            )
            .field("error_chat_id", &self.error_chat_id)
            .finish()
    }
}

/// Whole application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory scanned for `*.csv` inputs
    pub inbox_dir: PathBuf,
    /// Directory receiving `.txt` artifacts
    pub outbox_dir: PathBuf,
    /// Processed inputs are moved here when set
    pub archive_dir: Option<PathBuf>,
    /// Directory holding the daily `leads_sub6_<date>.txt` files
    pub leads_dir: Option<PathBuf>,
    /// Telegram delivery; `None` means notifications are only logged
    pub telegram: Option<TelegramConfig>,
    pub pipeline: PipelineConfig,
    pub recovery: RecoveryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            inbox_dir: PathBuf::from(DEFAULT_INBOX_DIR),
            outbox_dir: PathBuf::from(DEFAULT_OUTBOX_DIR),
            archive_dir: None,
            leads_dir: None,
            telegram: None,
            pipeline: PipelineConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup (environment, map in tests).
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let day_policy = parse_day_policy(&get)?;

        let write_order = get("WRITE_ORDER")
            .map(|value| value.parse::<WriteOrder>())
            .transpose()?
            .unwrap_or_default();

        let skip_severity = get("SKIP_SEVERITY")
            .map(|value| value.parse::<SkipSeverity>())
            .transpose()?
            .unwrap_or_default();

        let routing = match get("ROUTING_TABLE_PATH") {
            Some(path) => RoutingTables::load(Path::new(&path))?,
            None => RoutingTables::default(),
        };

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                bot_token,
                chat_id,
                error_bot_token: get("ERROR_BOT_TOKEN"),
                error_chat_id: get("ERROR_CHAT_ID"),
            }),
            (None, None) => None,
            _ => {
                return Err(PipelineError::Config(
                    "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            inbox_dir: get("PHONE_BUCKETS_INBOX")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INBOX_DIR)),
            outbox_dir: get("PHONE_BUCKETS_OUTBOX")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTBOX_DIR)),
            archive_dir: get("PHONE_BUCKETS_ARCHIVE").map(PathBuf::from),
            leads_dir: get("PHONE_BUCKETS_LEADS_DIR").map(PathBuf::from),
            telegram,
            pipeline: PipelineConfig {
                day_policy,
                write_order,
                skip_severity,
                routing,
            },
            recovery: RecoveryConfig::default(),
        })
    }
}

fn parse_day_policy<G>(get: &G) -> Result<DayNumberPolicy, PipelineError>
where
    G: Fn(&str) -> Option<String>,
{
    let policy = get("DAY_NUMBER_POLICY")
        .map(|value| value.parse::<DayNumberPolicy>())
        .transpose()?
        .unwrap_or_default();

    match policy {
        DayNumberPolicy::Anchored {
            base_date,
            base_number,
        } => {
            let base_date = match get("DAY_NUMBER_BASE_DATE") {
                Some(value) => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
                    PipelineError::Config(format!("DAY_NUMBER_BASE_DATE '{value}': {e}"))
                })?,
                None => base_date,
            };
            let base_number = parse_int(get("DAY_NUMBER_BASE"), "DAY_NUMBER_BASE")?
                .unwrap_or(base_number);
            Ok(DayNumberPolicy::Anchored {
                base_date,
                base_number,
            })
        }
        DayNumberPolicy::DayOfYear { .. } => {
            let offset = parse_int(get("DAY_NUMBER_OFFSET"), "DAY_NUMBER_OFFSET")?
                .unwrap_or(DEFAULT_DAY_OF_YEAR_OFFSET);
            Ok(DayNumberPolicy::DayOfYear { offset })
        }
    }
}

fn parse_int(value: Option<String>, key: &str) -> Result<Option<i64>, PipelineError> {
    value
        .map(|value| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|e| PipelineError::Config(format!("{key} '{value}': {e}")))
        })
        .transpose()
}
