//! Checkpoint value type
//!
//! A checkpoint records the requested date range and the next day that has not
//! been fully exported yet. It is a plain record; persistence lives in
//! [`super::store::CheckpointStore`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persisted progress marker for one export range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(rename = "startdate")]
    start_date: NaiveDate,
    #[serde(rename = "enddate")]
    end_date: NaiveDate,
    #[serde(rename = "nextdate")]
    next_date: NaiveDate,
}

impl Checkpoint {
    /// Create a checkpoint for a fresh range; the next day is the range start
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            next_date: start_date,
        }
    }

    /// Build a checkpoint with an explicit next day
    pub fn with_next_date(mut self, next_date: NaiveDate) -> Self {
        self.next_date = next_date;
        self
    }

    /// First day of the range
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Last day of the range (inclusive)
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Next day to export
    pub fn next_date(&self) -> NaiveDate {
        self.next_date
    }

    /// Record that `next_date` is the day about to be exported
    pub fn set_next_date(&mut self, next_date: NaiveDate) {
        self.next_date = next_date;
    }

    /// Whether this checkpoint was written for exactly this range
    pub fn covers_range(&self, start_date: NaiveDate, end_date: NaiveDate) -> bool {
        self.start_date == start_date && self.end_date == end_date
    }

    /// Check the range invariant: `start <= next <= end`
    pub fn validate(&self) -> Result<(), String> {
        if self.end_date < self.start_date {
            return Err(format!(
                "End date ({}) is before start date ({})",
                self.end_date, self.start_date
            ));
        }

        if self.next_date < self.start_date || self.next_date > self.end_date {
            return Err(format!(
                "Next date ({}) is outside range {} - {}",
                self.next_date, self.start_date, self.end_date
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} (next: {})",
            self.start_date, self.end_date, self.next_date
        )
    }
}
