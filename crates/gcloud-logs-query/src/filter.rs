use chrono::{DateTime, FixedOffset};

use gcloud_logs_types::TimeWindow;

use crate::time::isoformat;

/// Restricts results to Compute Engine VM logs
const RESOURCE_CLAUSE: &str = r#"resource.type="gce_instance""#;

/// Build a Cloud Logging filter for `instances` between `from` and `to`.
///
/// An empty instance list places no restriction on the instance. Both time
/// bounds are inclusive.
pub fn make_filter(
    instances: &[String],
    from: &DateTime<FixedOffset>,
    to: Option<&DateTime<FixedOffset>>,
) -> String {
    let mut clauses = vec![RESOURCE_CLAUSE.to_string()];

    if !instances.is_empty() {
        let any_instance = instances
            .iter()
            .map(|name| format!(r#"resource.labels.instance_id="{}""#, quote(name)))
            .collect::<Vec<_>>()
            .join(" OR ");
        clauses.push(format!("({})", any_instance));
    }

    clauses.push(format!(r#"timestamp >= "{}""#, isoformat(from)));
    if let Some(to) = to {
        clauses.push(format!(r#"timestamp <= "{}""#, isoformat(to)));
    }

    clauses.join(" AND ")
}

/// Escape a value for use inside a double-quoted filter string
fn quote(value: &str) -> String {
    value.replace('\\', r"\\").replace('"', r#"\""#)
}

/// The instance selection a run queries for
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Instances to include (empty = all)
    instances: Vec<String>,
}

impl LogQuery {
    pub fn new(instances: Vec<String>) -> Self {
        Self { instances }
    }

    pub fn instances(&self) -> &[String] {
        &self.instances
    }

    /// Filter expression for one time window
    pub fn filter(&self, window: &TimeWindow) -> String {
        make_filter(&self.instances, &window.from, window.to.as_ref())
    }
}
