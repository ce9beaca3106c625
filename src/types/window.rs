//! Voting window and date-axis generation

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Result, VotetrackError};

/// Option key holding the first voting day
pub const VOTE_LAUNCH: &str = "vote-launch";
/// Option key holding the last voting day
pub const VOTE_DEADLINE: &str = "vote-deadline";

/// Inclusive range of days during which voting is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl VotingWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Build a window from raw `vote-launch` / `vote-deadline` values
    pub fn parse(launch: &str, deadline: &str) -> Result<Self> {
        Ok(Self {
            start: parse_option_date(VOTE_LAUNCH, launch)?,
            end: parse_option_date(VOTE_DEADLINE, deadline)?,
        })
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// Last day that can hold data as of `today`.
    /// A window still running is cut at `today`.
    pub fn effective_end(&self, today: NaiveDate) -> NaiveDate {
        if today < self.end {
            today
        } else {
            self.end
        }
    }

    /// Days from `start` to `effective_end(today)`, inclusive, ascending
    pub fn axis_until(&self, today: NaiveDate) -> Vec<NaiveDate> {
        date_axis(self.start, self.effective_end(today))
    }

    /// Days from `start` to `end`, inclusive, ascending
    pub fn full_axis(&self) -> Vec<NaiveDate> {
        date_axis(self.start, self.end)
    }
}

/// Every day from `start` to `end` inclusive; empty when `start > end`
pub fn date_axis(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Naive forms seen in SQL and ORM exports and in `datetime-local` inputs
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp keeping its wall-clock value.
///
/// An RFC 3339 offset is dropped rather than converted, so the day of
/// `2024-01-01T22:00:00-03:00` is Jan 1, same as SQL `DATE(created_at)`.
/// Naive forms may use a space or `T`, with or without seconds, and with
/// fractional seconds.
pub fn parse_wall_clock(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Parse an option value as a calendar day.
///
/// Accepts `YYYY-MM-DD` or anything [`parse_wall_clock`] does; the time
/// part is dropped.
pub fn parse_option_date(key: &str, raw: &str) -> Result<NaiveDate> {
    let value = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Some(dt) = parse_wall_clock(value) {
        return Ok(dt.date());
    }

    Err(VotetrackError::Config(format!(
        "option '{}' is not a date: '{}'",
        key, raw
    )))
}
