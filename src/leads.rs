//! Previous-day leads file.
//!
//! A separate export drops `leads_sub6_<dd.mm.YYYY>.txt` into a directory every day. The run
//! delivers yesterday's file ahead of its own artifacts when it exists.

use chrono::{Days, NaiveDate};
use log::debug;
use std::path::{Path, PathBuf};

/// File name of the leads export for `date`
pub fn leads_file_name(date: NaiveDate) -> String {
    format!("leads_sub6_{}.txt", date.format("%d.%m.%Y"))
}

/// Path of yesterday's leads file, if it exists in `dir`
pub fn locate_previous_day(dir: &Path, today: NaiveDate) -> Option<PathBuf> {
    let yesterday = today.checked_sub_days(Days::new(1))?;
    let path = dir.join(leads_file_name(yesterday));

    if path.is_file() {
        Some(path)
    } else {
        debug!("No leads file at {}", path.display());
        None
    }
}
