//! # Phone Buckets
//!
//! Daily batch job that classifies phone-list CSV exports by file name, routes rows to
//! business buckets (by channel id for the web and broker exports), deduplicates phones
//! per bucket and writes one `<tag> (<day>).txt` file per bucket. Written files are then
//! delivered in a fixed priority order through a best-effort notifier.

pub mod aggregator;
pub mod archive;
pub mod circuit_breaker;
pub mod classifier;
pub mod config;
pub mod day_number;
pub mod errors;
pub mod leads;
pub mod logging;
pub mod naming;
pub mod notifier;
pub mod ordering;
pub mod phone;
pub mod pipeline;
pub mod routing;
pub mod source;
pub mod writer;
