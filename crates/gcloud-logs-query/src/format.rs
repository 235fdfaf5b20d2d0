use console::Style;

use gcloud_logs_types::{LogRecord, OutputFormat};

/// Renders one log record as one line of output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Formatter {
    /// `<instance> [<timestamp>] (<severity>): <payload>`
    Line { colored: bool },
    /// The record's JSON representation
    Api,
}

impl Formatter {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        match format {
            OutputFormat::Line => Self::Line { colored },
            OutputFormat::Api => Self::Api,
        }
    }

    pub fn format(&self, record: &LogRecord) -> String {
        match self {
            Self::Line { colored } => line_format(record, *colored),
            Self::Api => record.as_json().to_string(),
        }
    }
}

fn line_format(record: &LogRecord, colored: bool) -> String {
    let instance = record.instance_id().unwrap_or_default();
    let timestamp = record.timestamp().unwrap_or_default();
    let severity = record.severity();
    let payload = record.payload();

    if !colored {
        return format!("{} [{}] ({}): {}", instance, timestamp, severity, payload);
    }

    // Styling is forced so colours survive redirection to a file or pipe
    let instance_style = Style::new().green().bright().force_styling(true);
    let stamp_style = Style::new().cyan().bright().force_styling(true);
    let severity_style = stamp_style.clone().bold();

    format!(
        "{}{}{}{}",
        instance_style.apply_to(instance),
        stamp_style.apply_to(format!(" [{}] ", timestamp)),
        severity_style.apply_to(format!("({}): ", severity)),
        payload
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hello() -> LogRecord {
        LogRecord::new(json!({
            "resource": {"type": "gce_instance", "labels": {"instance_id": "vm-1"}},
            "timestamp": "2023-01-01T00:00:05Z",
            "severity": "INFO",
            "textPayload": "hello world",
        }))
    }

    #[test]
    fn test_plain_line() {
        let formatter = Formatter::new(OutputFormat::Line, false);
        assert_eq!(
            formatter.format(&hello()),
            "vm-1 [2023-01-01T00:00:05Z] (INFO): hello world"
        );
    }

    #[test]
    fn test_colored_line_has_same_text() {
        let formatter = Formatter::new(OutputFormat::Line, true);
        let line = formatter.format(&hello());

        assert_ne!(line, "vm-1 [2023-01-01T00:00:05Z] (INFO): hello world");
        assert_eq!(
            console::strip_ansi_codes(&line),
            "vm-1 [2023-01-01T00:00:05Z] (INFO): hello world"
        );
        // Payload is left unstyled
        assert!(line.ends_with("hello world"));
    }

    #[test]
    fn test_api_format_is_single_line_json() {
        let formatter = Formatter::new(OutputFormat::Api, true);
        let line = formatter.format(&hello());

        assert!(!line.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(&parsed, hello().as_json());
    }

    #[test]
    fn test_missing_fields_do_not_panic() {
        let formatter = Formatter::new(OutputFormat::Line, false);
        let record = LogRecord::new(json!({"jsonPayload": {"message": "up"}}));
        assert_eq!(formatter.format(&record), " [] (DEFAULT): up");
    }
}
