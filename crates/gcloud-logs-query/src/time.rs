use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone,
    Timelike, Utc,
};
use thiserror::Error;

/// Accepted shapes carrying an explicit UTC offset
const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

/// Accepted date-and-time shapes without an offset
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("unrecognized date/time '{0}' (try 2023-01-01T10:00:00, 2023-01-01 10:00 or 10:00)")]
    Unrecognized(String),

    #[error("{0} does not exist in the local time zone")]
    NonexistentLocalTime(NaiveDateTime),
}

/// A timestamp as typed on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParsedTimestamp {
    /// Carries its own offset and is used as is
    Aware(DateTime<FixedOffset>),
    /// No offset given; the time zone is chosen at resolve time
    Naive(NaiveDateTime),
}

impl ParsedTimestamp {
    /// Attach a time zone to naive timestamps: UTC when `utc` is set, the
    /// local zone otherwise. Aware timestamps are returned unchanged.
    pub fn resolve(self, utc: bool) -> Result<DateTime<FixedOffset>, TimestampError> {
        if utc {
            self.resolve_in(&Utc)
        } else {
            self.resolve_in(&Local)
        }
    }

    /// Interpret naive timestamps as wall-clock time in `tz`
    pub fn resolve_in<Tz: TimeZone>(self, tz: &Tz) -> Result<DateTime<FixedOffset>, TimestampError> {
        match self {
            Self::Aware(dt) => Ok(dt),
            Self::Naive(naive) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset())
                .ok_or(TimestampError::NonexistentLocalTime(naive)),
        }
    }
}

/// Parse a user supplied date/time.
///
/// Bare dates mean midnight; bare times mean today (local calendar date).
pub fn parse_timestamp(input: &str) -> Result<ParsedTimestamp, TimestampError> {
    let s = input.trim();
    let unrecognized = || TimestampError::Unrecognized(input.to_string());

    if s.is_empty() {
        return Err(unrecognized());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(ParsedTimestamp::Aware(dt));
    }

    // A trailing Z on any of the naive shapes pins it to UTC
    if let Some(rest) = s.strip_suffix(['Z', 'z']) {
        return parse_naive(rest)
            .map(|naive| ParsedTimestamp::Aware(Utc.from_utc_datetime(&naive).fixed_offset()))
            .ok_or_else(unrecognized);
    }

    for format in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Ok(ParsedTimestamp::Aware(dt));
        }
    }

    parse_naive(s)
        .map(ParsedTimestamp::Naive)
        .ok_or_else(unrecognized)
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    if let Some(dt) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
    {
        return Some(dt);
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
    {
        return Some(date.and_time(NaiveTime::MIN));
    }

    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
        .map(|time| Local::now().date_naive().and_time(time))
}

/// ISO 8601 rendering used in filter expressions.
///
/// The offset is always numeric (`+00:00`, never `Z`) and fractional seconds
/// appear only when non-zero, in microseconds unless finer precision is set.
pub fn isoformat(dt: &DateTime<FixedOffset>) -> String {
    let nanos = dt.nanosecond();
    let precision = if nanos == 0 {
        SecondsFormat::Secs
    } else if nanos % 1_000 == 0 {
        SecondsFormat::Micros
    } else {
        SecondsFormat::Nanos
    };
    dt.to_rfc3339_opts(precision, false)
}
