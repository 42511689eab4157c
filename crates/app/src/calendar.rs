//! Business-day arithmetic and the default vacation-year shape.
//!
//! Day counts are weekday-only. Company settings may carry a holiday list,
//! but nothing here consumes it; the canonical count ignores holidays.

use jiff::civil::{Date, Weekday, date};

/// Count the days in `[start, end]` (inclusive) whose weekday is Monday
/// through Friday. Returns 0 when `start > end`.
#[must_use]
pub fn business_days(start: Date, end: Date) -> u32 {
    if start > end {
        return 0;
    }

    let mut count = 0;
    let mut current = start;

    loop {
        if !matches!(current.weekday(), Weekday::Saturday | Weekday::Sunday) {
            count += 1;
        }

        if current == end {
            break;
        }

        let Ok(next) = current.tomorrow() else { break };
        current = next;
    }

    count
}

/// Bounds of the default April-to-March vacation year containing `day`.
///
/// Materialized on demand when a company has no configured period covering
/// a requested date.
#[must_use]
pub fn default_vacation_year(day: Date) -> (Date, Date) {
    let start_year = if day.month() >= 4 { day.year() } else { day.year() - 1 };

    (date(start_year, 4, 1), date(start_year + 1, 3, 31))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monday_to_friday_is_five() {
        // 2025-07-14 is a Monday.
        assert_eq!(business_days(date(2025, 7, 14), date(2025, 7, 18)), 5);
    }

    #[test]
    fn friday_to_monday_is_two() {
        assert_eq!(business_days(date(2025, 7, 18), date(2025, 7, 21)), 2);
    }

    #[test]
    fn weekend_is_zero() {
        assert_eq!(business_days(date(2025, 7, 19), date(2025, 7, 20)), 0);
    }

    #[test]
    fn single_weekday_is_one() {
        assert_eq!(business_days(date(2025, 7, 16), date(2025, 7, 16)), 1);
    }

    #[test]
    fn single_weekend_day_is_zero() {
        assert_eq!(business_days(date(2025, 7, 19), date(2025, 7, 19)), 0);
    }

    #[test]
    fn inverted_range_is_zero() {
        assert_eq!(business_days(date(2025, 7, 18), date(2025, 7, 14)), 0);
    }

    #[test]
    fn full_week_is_five() {
        // Saturday through the following Friday.
        assert_eq!(business_days(date(2025, 7, 12), date(2025, 7, 18)), 5);
    }

    #[test]
    fn count_matches_naive_scan() {
        let start = date(2025, 1, 1);
        let end = date(2025, 12, 31);

        let mut expected = 0;
        let mut current = start;
        while current <= end {
            if !matches!(current.weekday(), Weekday::Saturday | Weekday::Sunday) {
                expected += 1;
            }
            current = current.tomorrow().unwrap();
        }

        assert_eq!(business_days(start, end), expected);
        assert_eq!(business_days(start, end), business_days(start, end));
    }

    #[test]
    fn default_year_starts_in_april() {
        assert_eq!(
            default_vacation_year(date(2025, 7, 14)),
            (date(2025, 4, 1), date(2026, 3, 31)),
        );

        assert_eq!(
            default_vacation_year(date(2025, 2, 1)),
            (date(2024, 4, 1), date(2025, 3, 31)),
        );

        assert_eq!(
            default_vacation_year(date(2025, 4, 1)),
            (date(2025, 4, 1), date(2026, 3, 31)),
        );

        assert_eq!(
            default_vacation_year(date(2025, 3, 31)),
            (date(2024, 4, 1), date(2025, 3, 31)),
        );
    }
}
