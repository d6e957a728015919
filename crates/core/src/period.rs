//! Inclusive calendar-date ranges used by list filters and reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive `[from, to]` range; either bound may be open.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = DateRange::between(date(2024, 1, 1), date(2024, 1, 31));
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 1, 31)));
        assert!(!range.contains(date(2024, 2, 1)));
        assert!(!range.contains(date(2023, 12, 31)));
    }

    #[test]
    fn open_range_contains_everything() {
        let range = DateRange::default();
        assert!(range.contains(date(1999, 12, 31)));
        assert!(range.contains(date(2100, 1, 1)));
    }

    #[test]
    fn half_open_ranges() {
        let from_only = DateRange::new(Some(date(2024, 6, 1)), None);
        assert!(from_only.contains(date(2030, 1, 1)));
        assert!(!from_only.contains(date(2024, 5, 31)));

        let to_only = DateRange::new(None, Some(date(2024, 6, 1)));
        assert!(to_only.contains(date(2000, 1, 1)));
        assert!(!to_only.contains(date(2024, 6, 2)));
    }
}
