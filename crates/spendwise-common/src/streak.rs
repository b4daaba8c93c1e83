use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Streak fields derived from a habit's completion history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitStreak {
    pub streak: u32,
    pub completed_today: bool,
}

/// Sort newest-first and drop duplicate days.
fn newest_first(completions: &[NaiveDate]) -> Vec<NaiveDate> {
    let mut dates = completions.to_vec();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();
    dates
}

/// Count consecutive completed days ending at `today`.
///
/// The chain has to start at `today`: a habit last done yesterday has a
/// streak of 0 even if it ran for weeks before that. Completions dated after
/// `today` are ignored.
pub fn compute_streak(today: NaiveDate, completions: &[NaiveDate]) -> HabitStreak {
    let dates = newest_first(completions);
    let mut past = dates.into_iter().skip_while(|d| *d > today).peekable();

    let completed_today = past.peek() == Some(&today);

    let mut streak = 0;
    let mut expected = Some(today);
    for date in past {
        if Some(date) != expected {
            break;
        }
        streak += 1;
        expected = date.checked_sub_days(Days::new(1));
    }

    HabitStreak {
        streak,
        completed_today,
    }
}

/// Longest run of consecutive days anywhere in the history
pub fn longest_streak(completions: &[NaiveDate]) -> u32 {
    let dates = newest_first(completions);
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    for date in dates {
        run = match prev.and_then(|p| p.checked_sub_days(Days::new(1))) {
            Some(expected) if expected == date => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(date);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn days_ago(n: u64) -> NaiveDate {
        today().checked_sub_days(Days::new(n)).unwrap()
    }

    #[test]
    fn test_no_completions() {
        let s = compute_streak(today(), &[]);
        assert_eq!(s.streak, 0);
        assert!(!s.completed_today);
    }

    #[test]
    fn test_consecutive_days_including_today() {
        let completions: Vec<_> = (0..5).map(days_ago).collect();
        let s = compute_streak(today(), &completions);
        assert_eq!(s.streak, 5);
        assert!(s.completed_today);
    }

    #[test]
    fn test_gap_breaks_chain() {
        let s = compute_streak(today(), &[days_ago(0), days_ago(3)]);
        assert_eq!(s.streak, 1);
        assert!(s.completed_today);
    }

    #[test]
    fn test_yesterday_only_is_zero() {
        let completions: Vec<_> = (1..4).map(days_ago).collect();
        let s = compute_streak(today(), &completions);
        assert_eq!(s.streak, 0);
        assert!(!s.completed_today);
    }

    #[test]
    fn test_last_completed_two_days_ago_is_zero() {
        let s = compute_streak(today(), &[days_ago(2), days_ago(3)]);
        assert_eq!(s.streak, 0);
        assert!(!s.completed_today);
    }

    #[test]
    fn test_duplicates_and_unordered_input() {
        let completions = vec![days_ago(1), days_ago(0), days_ago(0), days_ago(2), days_ago(1)];
        let s = compute_streak(today(), &completions);
        assert_eq!(s.streak, 3);
        assert!(s.completed_today);
    }

    #[test]
    fn test_future_dates_ignored() {
        let tomorrow = today().checked_add_days(Days::new(1)).unwrap();
        let s = compute_streak(today(), &[tomorrow, days_ago(0), days_ago(1)]);
        assert_eq!(s.streak, 2);
        assert!(s.completed_today);
    }

    #[test]
    fn test_streak_across_month_boundary() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let completions = vec![
            today,
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 27).unwrap(),
        ];
        assert_eq!(compute_streak(today, &completions).streak, 3);
    }

    #[test]
    fn test_longest_streak() {
        assert_eq!(longest_streak(&[]), 0);
        assert_eq!(longest_streak(&[days_ago(4)]), 1);

        let completions = vec![
            days_ago(0),
            days_ago(5),
            days_ago(6),
            days_ago(7),
            days_ago(9),
            days_ago(10),
        ];
        assert_eq!(longest_streak(&completions), 3);
    }

    #[test]
    fn test_longest_streak_ignores_duplicates() {
        let completions = vec![days_ago(1), days_ago(1), days_ago(2)];
        assert_eq!(longest_streak(&completions), 2);
    }
}
