use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three daily production periods.
///
/// Serialized as its number (1, 2, 3). Ordering follows the number, which is
/// the within-day chronological order used by the continuity lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Shift {
    First,
    Second,
    Third,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::First, Shift::Second, Shift::Third];

    pub fn number(&self) -> i16 {
        match self {
            Shift::First => 1,
            Shift::Second => 2,
            Shift::Third => 3,
        }
    }

    /// Which (date, shift) an operator opening the entry form at `now` (factory
    /// local time) is most likely recording.
    ///
    /// Entries are made about an hour before a shift ends:
    /// - 05:00-12:59 => shift 3 of the previous day
    /// - 13:00-20:59 => shift 1 of today
    /// - otherwise   => shift 2 of today
    pub fn suggest_for(now: NaiveDateTime) -> (NaiveDate, Shift) {
        let today = now.date();
        match now.hour() {
            5..=12 => (today - Duration::days(1), Shift::Third),
            13..=20 => (today, Shift::First),
            _ => (today, Shift::Second),
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A shift number outside 1..=3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidShift(pub i64);

impl fmt::Display for InvalidShift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid shift {} (expected 1, 2 or 3)", self.0)
    }
}

impl std::error::Error for InvalidShift {}

impl TryFrom<i64> for Shift {
    type Error = InvalidShift;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Shift::First),
            2 => Ok(Shift::Second),
            3 => Ok(Shift::Third),
            other => Err(InvalidShift(other)),
        }
    }
}

impl From<Shift> for i64 {
    fn from(s: Shift) -> Self {
        i64::from(s.number())
    }
}
