// libs/appointment-cell/src/services/time_range.rs
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat};
use serde::Serialize;
use tracing::debug;

use crate::models::AppointmentError;

/// Offset-bearing layouts tried after RFC 3339 (which requires seconds).
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%d %H:%M%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Layouts without zone information; read as reference-offset wall time.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A validated `[start, end)` pair with `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl TimeRange {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Result<Self, AppointmentError> {
        if end <= start {
            return Err(AppointmentError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Parses caller supplied timestamps into the business reference offset.
#[derive(Debug, Clone, Copy)]
pub struct TimeRangeValidator {
    reference: FixedOffset,
}

impl TimeRangeValidator {
    pub fn new(reference: FixedOffset) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> FixedOffset {
        self.reference
    }

    pub fn validate(&self, raw_start: &str, raw_end: &str) -> Result<TimeRange, AppointmentError> {
        let start = self.parse_timestamp(raw_start)?;
        let end = self.parse_timestamp(raw_end)?;
        TimeRange::new(start, end)
    }

    /// Offset-bearing input is converted to the reference offset; input
    /// without an offset is taken to already be reference wall time.
    pub fn parse_timestamp(&self, raw: &str) -> Result<DateTime<FixedOffset>, AppointmentError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppointmentError::InvalidFormat("empty date-time".to_string()));
        }

        if let Some(parsed) = parse_with_offset(trimmed) {
            return Ok(parsed.with_timezone(&self.reference));
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return naive
                    .and_local_timezone(self.reference)
                    .single()
                    .ok_or_else(|| AppointmentError::InvalidFormat(trimmed.to_string()));
            }
        }

        debug!("Rejecting unparseable date-time '{}'", trimmed);
        Err(AppointmentError::InvalidFormat(trimmed.to_string()))
    }

    /// RFC 3339 in the reference offset; fractional seconds only when present.
    pub fn format(&self, instant: DateTime<FixedOffset>) -> String {
        instant
            .with_timezone(&self.reference)
            .to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }

    /// Short human form used in notification messages.
    pub fn display(&self, instant: DateTime<FixedOffset>) -> String {
        instant.with_timezone(&self.reference).format("%Y-%m-%d %H:%M").to_string()
    }
}

fn parse_with_offset(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }

    // The explicit layouts below do not understand a trailing `Z`.
    let normalised = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(prefix) => format!("{}+00:00", prefix),
        None => raw.to_string(),
    };

    OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&normalised, format).ok())
}
