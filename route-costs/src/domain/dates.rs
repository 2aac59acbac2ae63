//! Operating dates and days for routes.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Errors from constructing date types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    /// The end of a range is before its start
    #[error("date range ends ({end}) before it starts ({start})")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    /// A route must operate on at least one day of the week
    #[error("days of week cannot be empty")]
    NoDays,

    /// Bits set beyond Sunday
    #[error("invalid days of week mask {0:#010b}")]
    InvalidDays(u8),
}

/// An inclusive range of calendar dates.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use route_costs::domain::DateRange;
///
/// let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
/// let range = DateRange::new(start, end).unwrap();
///
/// assert!(range.contains(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()));
/// assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
///
/// // End before start is rejected
/// assert!(DateRange::new(end, start).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(NaiveDate, NaiveDate)", into = "(NaiveDate, NaiveDate)")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range covering `start..=end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateError> {
        if end < start {
            return Err(DateError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering a single day.
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Check if a date falls inside the range (inclusive at both ends).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Check if the two ranges share at least one date.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// The dates shared by both ranges, if any.
    pub fn intersection(&self, other: &DateRange) -> Option<DateRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(DateRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Number of dates in the range.
    pub fn number_of_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Iterate over every date in the range, in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |date| *date <= self.end)
    }
}

impl TryFrom<(NaiveDate, NaiveDate)> for DateRange {
    type Error = DateError;

    fn try_from((start, end): (NaiveDate, NaiveDate)) -> Result<Self, Self::Error> {
        DateRange::new(start, end)
    }
}

impl From<DateRange> for (NaiveDate, NaiveDate) {
    fn from(range: DateRange) -> Self {
        (range.start, range.end)
    }
}

impl fmt::Debug for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DateRange({}..={})", self.start, self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// The days of the week a route operates on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    const ALL_BITS: u8 = 0b0111_1111;

    /// Create from a list of weekdays. At least one day is required.
    pub fn new(days: &[Weekday]) -> Result<Self, DateError> {
        let bits = days.iter().fold(0u8, |acc, day| acc | Self::bit_for(*day));
        if bits == 0 {
            return Err(DateError::NoDays);
        }
        Ok(Self(bits))
    }

    /// Every day of the week.
    pub fn all() -> Self {
        Self(Self::ALL_BITS)
    }

    /// Monday to Friday.
    pub fn weekdays() -> Self {
        Self(0b0001_1111)
    }

    /// Saturday and Sunday.
    pub fn weekends() -> Self {
        Self(0b0110_0000)
    }

    fn bit_for(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & Self::bit_for(day) != 0
    }

    /// Days present in both sets. May be empty.
    pub fn intersection(&self, other: DaysOfWeek) -> DaysOfWeek {
        DaysOfWeek(self.0 & other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_all(&self) -> bool {
        self.0 == Self::ALL_BITS
    }
}

impl TryFrom<u8> for DaysOfWeek {
    type Error = DateError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        if bits == 0 {
            return Err(DateError::NoDays);
        }
        if bits & !Self::ALL_BITS != 0 {
            return Err(DateError::InvalidDays(bits));
        }
        Ok(Self(bits))
    }
}

impl From<DaysOfWeek> for u8 {
    fn from(days: DaysOfWeek) -> Self {
        days.0
    }
}

impl fmt::Debug for DaysOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
        let days: Vec<&str> = NAMES
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.0 & (1 << bit) != 0)
            .map(|(_, name)| *name)
            .collect();
        write!(f, "DaysOfWeek({})", days.join(","))
    }
}

/// Check whether there is any date in `range` falling on one of `days`.
pub(crate) fn any_date_on(range: &DateRange, days: DaysOfWeek) -> bool {
    if days.is_empty() {
        return false;
    }
    if days.is_all() || range.number_of_days() >= 7 {
        return true;
    }
    range.dates().any(|date| days.contains(date.weekday()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn range_rejects_end_before_start() {
        let err = DateRange::new(date(2024, 3, 2), date(2024, 3, 1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "date range ends (2024-03-01) before it starts (2024-03-02)"
        );
    }

    #[test]
    fn single_day_range() {
        let range = DateRange::single(date(2024, 3, 15));
        assert!(range.contains(date(2024, 3, 15)));
        assert!(!range.contains(date(2024, 3, 16)));
        assert_eq!(range.number_of_days(), 1);
    }

    #[test]
    fn overlapping_ranges() {
        let march = DateRange::new(date(2024, 3, 1), date(2024, 3, 31)).unwrap();
        let spring = DateRange::new(date(2024, 3, 20), date(2024, 5, 31)).unwrap();
        let june = DateRange::new(date(2024, 6, 1), date(2024, 6, 30)).unwrap();

        assert!(march.overlaps(&spring));
        assert!(spring.overlaps(&march));
        assert!(!march.overlaps(&june));

        let shared = march.intersection(&spring).unwrap();
        assert_eq!(shared.start(), date(2024, 3, 20));
        assert_eq!(shared.end(), date(2024, 3, 31));
        assert!(march.intersection(&june).is_none());
    }

    #[test]
    fn touching_ranges_overlap() {
        let a = DateRange::new(date(2024, 3, 1), date(2024, 3, 10)).unwrap();
        let b = DateRange::new(date(2024, 3, 10), date(2024, 3, 20)).unwrap();
        assert!(a.overlaps(&b));
        assert_eq!(a.intersection(&b).unwrap().number_of_days(), 1);
    }

    #[test]
    fn dates_iterates_inclusive() {
        let range = DateRange::new(date(2024, 2, 28), date(2024, 3, 1)).unwrap();
        let dates: Vec<_> = range.dates().collect();
        assert_eq!(
            dates,
            vec![date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]
        );
    }

    #[test]
    fn days_of_week_rejects_empty() {
        assert_eq!(DaysOfWeek::new(&[]), Err(DateError::NoDays));
    }

    #[test]
    fn days_of_week_membership() {
        let days = DaysOfWeek::new(&[Weekday::Mon, Weekday::Wed]).unwrap();
        assert!(days.contains(Weekday::Mon));
        assert!(days.contains(Weekday::Wed));
        assert!(!days.contains(Weekday::Tue));
        assert_eq!(format!("{:?}", days), "DaysOfWeek(Mon,Wed)");
    }

    #[test]
    fn weekdays_and_weekends_are_disjoint() {
        assert!(
            DaysOfWeek::weekdays()
                .intersection(DaysOfWeek::weekends())
                .is_empty()
        );
        assert!(DaysOfWeek::all().is_all());
    }

    #[test]
    fn any_date_on_short_range() {
        // 2024-03-15 is a Friday, 2024-03-16 a Saturday
        let range = DateRange::new(date(2024, 3, 15), date(2024, 3, 16)).unwrap();
        assert!(any_date_on(&range, DaysOfWeek::weekends()));
        assert!(any_date_on(&range, DaysOfWeek::weekdays()));
        assert!(!any_date_on(
            &range,
            DaysOfWeek::new(&[Weekday::Mon]).unwrap()
        ));
    }

    #[test]
    fn range_deserialize_validates() {
        let range: DateRange = serde_json::from_str(r#"["2024-03-01","2024-03-31"]"#).unwrap();
        assert_eq!(range.number_of_days(), 31);
        assert_eq!(serde_json::to_string(&range).unwrap(), r#"["2024-03-01","2024-03-31"]"#);

        assert!(serde_json::from_str::<DateRange>(r#"["2024-03-02","2024-03-01"]"#).is_err());
    }

    #[test]
    fn days_deserialize_validates() {
        let days: DaysOfWeek = serde_json::from_str("31").unwrap();
        assert_eq!(days, DaysOfWeek::weekdays());

        assert!(serde_json::from_str::<DaysOfWeek>("0").is_err());
        assert_eq!(DaysOfWeek::try_from(0b1000_0001), Err(DateError::InvalidDays(0b1000_0001)));
    }

    #[test]
    fn any_date_on_full_week() {
        let range = DateRange::new(date(2024, 3, 11), date(2024, 3, 17)).unwrap();
        assert!(any_date_on(&range, DaysOfWeek::new(&[Weekday::Thu]).unwrap()));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_range() -> impl Strategy<Value = DateRange> {
        (0i64..400, 0i64..60).prop_map(|(offset, len)| {
            let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let start = base + chrono::Duration::days(offset);
            DateRange::new(start, start + chrono::Duration::days(len)).unwrap()
        })
    }

    proptest! {
        /// Overlap is symmetric
        #[test]
        fn overlap_symmetric(a in any_range(), b in any_range()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        /// The intersection is contained in both ranges
        #[test]
        fn intersection_within_both(a in any_range(), b in any_range()) {
            if let Some(shared) = a.intersection(&b) {
                prop_assert!(a.contains(shared.start()) && a.contains(shared.end()));
                prop_assert!(b.contains(shared.start()) && b.contains(shared.end()));
            } else {
                prop_assert!(!a.overlaps(&b));
            }
        }

        /// Number of days matches the iterator length
        #[test]
        fn number_of_days_matches_dates(a in any_range()) {
            prop_assert_eq!(a.dates().count() as i64, a.number_of_days());
        }
    }
}
