//! Calendar-day helpers shared by the streak and insight engines.
//!
//! Every boundary here is computed from the server's local clock. Users in
//! other timezones see days and months roll over at the server's midnight.

use chrono::{Datelike, Days, Local, Months, NaiveDate};

/// Today's date on the server clock
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// First day of the month containing `date`
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Whether `date` falls in the given calendar month (`month` is 1-based)
pub fn in_month(date: NaiveDate, year: i32, month: u32) -> bool {
    date.year() == year && date.month() == month
}

/// The current and previous calendar months relative to a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start_of_this_month: NaiveDate,
    pub start_of_last_month: NaiveDate,
    pub end_of_last_month: NaiveDate,
}

impl MonthWindow {
    pub fn containing(today: NaiveDate) -> Self {
        let start_of_this_month = start_of_month(today);
        let start_of_last_month = start_of_this_month
            .checked_sub_months(Months::new(1))
            .unwrap_or(start_of_this_month);
        let end_of_last_month = start_of_this_month
            .checked_sub_days(Days::new(1))
            .unwrap_or(start_of_this_month);
        Self {
            start_of_this_month,
            start_of_last_month,
            end_of_last_month,
        }
    }

    pub fn is_this_month(&self, date: NaiveDate) -> bool {
        date >= self.start_of_this_month
    }

    pub fn is_last_month(&self, date: NaiveDate) -> bool {
        date >= self.start_of_last_month && date <= self.end_of_last_month
    }
}

/// Round half up (towards positive infinity), so `-12.5` becomes `-12`.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_window_mid_year() {
        let w = MonthWindow::containing(d(2025, 7, 15));
        assert_eq!(w.start_of_this_month, d(2025, 7, 1));
        assert_eq!(w.start_of_last_month, d(2025, 6, 1));
        assert_eq!(w.end_of_last_month, d(2025, 6, 30));
    }

    #[test]
    fn test_month_window_january_wraps_year() {
        let w = MonthWindow::containing(d(2025, 1, 3));
        assert_eq!(w.start_of_last_month, d(2024, 12, 1));
        assert_eq!(w.end_of_last_month, d(2024, 12, 31));
    }

    #[test]
    fn test_month_window_leap_february() {
        let w = MonthWindow::containing(d(2024, 3, 31));
        assert_eq!(w.start_of_last_month, d(2024, 2, 1));
        assert_eq!(w.end_of_last_month, d(2024, 2, 29));
    }

    #[test]
    fn test_month_membership() {
        let w = MonthWindow::containing(d(2025, 7, 15));
        assert!(w.is_this_month(d(2025, 7, 1)));
        assert!(!w.is_this_month(d(2025, 6, 30)));
        assert!(w.is_last_month(d(2025, 6, 30)));
        assert!(w.is_last_month(d(2025, 6, 1)));
        assert!(!w.is_last_month(d(2025, 5, 31)));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(94.5), 95);
        assert_eq!(round_half_up(94.4), 94);
        assert_eq!(round_half_up(-12.5), -12);
        assert_eq!(round_half_up(-12.6), -13);
        assert_eq!(round_half_up(0.0), 0);
    }
}
