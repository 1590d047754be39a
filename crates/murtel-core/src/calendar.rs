use chrono::{Datelike, NaiveDate};

/// Month in which the hydrological year begins (September).
pub const HYDROLOGICAL_YEAR_START_MONTH: u32 = 9;

/// Hydrological years run from 1 September to 31 August and are labelled by
/// the calendar year they start in.
pub fn hydrological_year(date: NaiveDate) -> i32 {
    if date.month() >= HYDROLOGICAL_YEAR_START_MONTH {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Every calendar day from `start` to `end`, both inclusive.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|day| *day <= end).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn hydrological_year_turns_over_in_september() {
        assert_eq!(hydrological_year(date(2020, 8, 31)), 2019);
        assert_eq!(hydrological_year(date(2020, 9, 1)), 2020);
        assert_eq!(hydrological_year(date(2021, 1, 15)), 2020);
    }

    #[test]
    fn date_range_is_inclusive() {
        let days = date_range(date(2019, 9, 29), date(2019, 10, 1));
        assert_eq!(
            days,
            vec![date(2019, 9, 29), date(2019, 9, 30), date(2019, 10, 1)]
        );
        assert!(date_range(date(2020, 1, 2), date(2020, 1, 1)).is_empty());
    }
}
