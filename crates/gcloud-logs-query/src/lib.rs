//! Log querying for gcloud-logs
//!
//! This crate turns instance names and time ranges into Cloud Logging filters,
//! fetches matching entries (once, or repeatedly while tailing), and renders
//! them to an output sink.

mod filter;
mod format;
mod retrieval;
mod sink;
mod time;

pub use filter::{LogQuery, make_filter};
pub use format::Formatter;
pub use retrieval::{LogPrinter, POLL_INTERVAL, PAGE_SIZE, TailOptions, Watermark};
pub use sink::OutputSink;
pub use time::{ParsedTimestamp, TimestampError, isoformat, parse_timestamp};

// Re-export types used in our public API
pub use gcloud_logs_types::{LogRecord, OutputFormat, TimeWindow};
