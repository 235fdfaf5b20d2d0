//! Shared types for gcloud-logs
//!
//! This crate contains data structures used across multiple gcloud-logs crates.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

// ============================================================================
// Query Types
// ============================================================================

/// Inclusive time range for a log query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    /// Lower bound, always present
    pub from: DateTime<FixedOffset>,

    /// Upper bound (None = up to whatever the backend has)
    pub to: Option<DateTime<FixedOffset>>,
}

impl TimeWindow {
    pub fn new(from: DateTime<FixedOffset>, to: Option<DateTime<FixedOffset>>) -> Self {
        Self { from, to }
    }

    /// A window with no upper bound
    pub fn starting_at(from: DateTime<FixedOffset>) -> Self {
        Self { from, to: None }
    }
}

/// How each log record is rendered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human readable `<instance> [<timestamp>] (<severity>): <payload>` lines
    #[default]
    Line,
    /// The API's JSON representation, one record per line
    Api,
}

// ============================================================================
// Log Types
// ============================================================================

/// Severity reported by Cloud Logging when the entry carries none.
///
/// The REST API omits enum fields holding their default value, so an entry
/// without a `severity` key is a `DEFAULT` entry.
pub const DEFAULT_SEVERITY: &str = "DEFAULT";

/// A single log entry as returned by the Cloud Logging API
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    /// The entry's JSON representation (`LogEntry` in the v2 API)
    raw: Value,
}

impl LogRecord {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// The full structured representation
    pub fn as_json(&self) -> &Value {
        &self.raw
    }

    /// Compute Engine instance id from the monitored resource labels
    pub fn instance_id(&self) -> Option<&str> {
        self.raw
            .pointer("/resource/labels/instance_id")
            .and_then(Value::as_str)
    }

    /// Entry timestamp exactly as the backend rendered it
    pub fn timestamp(&self) -> Option<&str> {
        self.raw.get("timestamp").and_then(Value::as_str)
    }

    pub fn severity(&self) -> &str {
        self.raw
            .get("severity")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SEVERITY)
    }

    /// Get the message content
    ///
    /// Serial console and syslog entries carry `textPayload`. Agents that ship
    /// structured logs use `jsonPayload`, where a `message` field is shown when
    /// present and the whole object otherwise.
    pub fn payload(&self) -> String {
        if let Some(text) = self.raw.get("textPayload").and_then(Value::as_str) {
            return text.to_string();
        }

        if let Some(json) = self.raw.get("jsonPayload") {
            if let Some(Value::String(message)) = json.get("message") {
                return message.clone();
            }
            return json.to_string();
        }

        self.raw
            .get("protoPayload")
            .map(Value::to_string)
            .unwrap_or_default()
    }
}

impl From<Value> for LogRecord {
    fn from(raw: Value) -> Self {
        Self::new(raw)
    }
}

/// One page of query results
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogPage {
    /// Entries on this page, in backend order
    pub records: Vec<LogRecord>,

    /// Token for the following page (None = this was the last one)
    pub next_page_token: Option<String>,
}

impl LogPage {
    pub fn new(records: Vec<LogRecord>, next_page_token: Option<String>) -> Self {
        Self {
            records,
            next_page_token,
        }
    }

    /// A final page
    pub fn last(records: Vec<LogRecord>) -> Self {
        Self::new(records, None)
    }
}
