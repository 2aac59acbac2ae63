//! Time-of-day windows used to scope queries.

use std::fmt;

use chrono::{Duration, NaiveTime};

/// Errors from constructing a time range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// The end of the window is before its start
    #[error("time range ends ({end}) before it starts ({start})")]
    EndBeforeStart { start: NaiveTime, end: NaiveTime },

    /// Could not parse a time string
    #[error("invalid time '{0}', expected HH:MM")]
    Parse(String),
}

/// An inclusive window of times within one service day.
///
/// # Examples
///
/// ```
/// use route_costs::domain::TimeRange;
///
/// let morning = TimeRange::parse("07:30", "09:00").unwrap();
/// assert!(morning.contains_hhmm("08:15"));
/// assert!(!morning.contains_hhmm("09:01"));
///
/// // Backwards windows are rejected
/// assert!(TimeRange::parse("09:00", "07:30").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeRange {
    /// Create a window covering `start..=end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, TimeError> {
        if end < start {
            return Err(TimeError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create a window from two "HH:MM" strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, TimeError> {
        Self::new(parse_hhmm(start)?, parse_hhmm(end)?)
    }

    /// A window starting at `start` and lasting `duration`, clamped to the end of the day.
    pub fn of(start: NaiveTime, duration: Duration) -> Self {
        let (end, wrapped) = start.overflowing_add_signed(duration);
        let end = if wrapped != 0 || end < start {
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(start)
        } else {
            end
        };
        Self { start, end }
    }

    /// The whole service day.
    pub fn all_day() -> Self {
        Self {
            start: NaiveTime::default(),
            end: NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default(),
        }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }

    /// Like [`TimeRange::contains`] for an `HH:MM` string. Unparseable input is never contained.
    pub fn contains_hhmm(&self, time: &str) -> bool {
        parse_hhmm(time).map(|t| self.contains(t)).unwrap_or(false)
    }

    /// Check if the two windows share any time.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

fn parse_hhmm(s: &str) -> Result<NaiveTime, TimeError> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| TimeError::Parse(s.to_string()))
}

impl fmt::Debug for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimeRange({}-{})",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}
