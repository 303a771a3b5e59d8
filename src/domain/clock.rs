//! Time source and timestamp encoding
//!
//! Timestamps are stored as second-precision RFC 3339 UTC strings
//! (`2024-01-10T23:59:59Z`) so string order in the store is time order.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use std::sync::Mutex;

use super::DomainError;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Years outside 0000..=9999 change the width of the encoded string and
/// break its ordering, so they are never stored.
pub fn ensure_storable(at: DateTime<Utc>) -> Result<DateTime<Utc>, DomainError> {
    if (0..=9999).contains(&at.year()) {
        Ok(at)
    } else {
        Err(DomainError::InvalidRange(format!(
            "{} is outside the supported years 0000-9999",
            at
        )))
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::Validation(format!("Invalid timestamp '{}': {}", value, e)))
}

/// Parse a due date given either as a full timestamp or as a calendar day.
///
/// A bare day (`2024-01-10`) means the loan is due by the end of that day,
/// so it only becomes overdue once the next day starts.
pub fn parse_due_date(value: &str) -> Result<DateTime<Utc>, DomainError> {
    let due = match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(day) => end_of_day(day),
        Err(_) => parse_timestamp(value)?,
    };
    ensure_storable(due)
}

pub fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&day.and_time(last_second))
}
