//! Tracing subscriber setup for the binary.
//!
//! `RUST_LOG` selects the filter (default `info`); `LOG_FORMAT=json` switches to one JSON
//! object per line. Records emitted through the `log` facade are bridged into the same
//! subscriber.

use std::str::FromStr;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::errors::PipelineError;

const DEFAULT_FILTER: &str = "info";

/// Output format of log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(PipelineError::Config(format!(
                "unknown log format '{other}' (expected 'text' or 'json')"
            ))),
        }
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (text, json) = match format {
        LogFormat::Text => (
            Some(tracing_subscriber::fmt::layer().with_target(true)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(tracing_subscriber::fmt::layer().json().with_target(true)),
        ),
    };

    tracing_subscriber::registry()
        .with(text)
        .with(json)
        .with(env_filter)
        .init();
}
