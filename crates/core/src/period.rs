use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month. Salary records are keyed by month, and parsers use the
/// statement's label month as the fallback for unparseable dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Month { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("month validated on construction")
    }

    pub fn last_day(self) -> NaiveDate {
        let next = if self.month == 12 {
            Month {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Month {
                year: self.year,
                month: self.month + 1,
            }
        };
        next.first_day() - Duration::days(1)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_rejects_invalid() {
        assert!(Month::new(2020, 0).is_none());
        assert!(Month::new(2020, 13).is_none());
        assert!(Month::new(2020, 12).is_some());
    }

    #[test]
    fn month_first_and_last_day() {
        let m = Month::new(2020, 2).unwrap();
        assert_eq!(m.first_day(), date(2020, 2, 1));
        assert_eq!(m.last_day(), date(2020, 2, 29)); // leap year
    }

    #[test]
    fn december_last_day() {
        let m = Month::new(2020, 12).unwrap();
        assert_eq!(m.last_day(), date(2020, 12, 31));
    }

    #[test]
    fn month_contains() {
        let m = Month::new(2020, 12).unwrap();
        assert!(m.contains(date(2020, 12, 22)));
        assert!(!m.contains(date(2021, 12, 22)));
        assert!(!m.contains(date(2020, 11, 30)));
    }

    #[test]
    fn month_display() {
        assert_eq!(Month::new(2020, 3).unwrap().to_string(), "2020-03");
    }

    #[test]
    fn date_range_contains_is_inclusive() {
        let range = DateRange::new(date(2020, 12, 1), date(2020, 12, 31));
        assert!(range.contains(date(2020, 12, 1)));
        assert!(range.contains(date(2020, 12, 31)));
        assert!(!range.contains(date(2021, 1, 1)));
    }
}
