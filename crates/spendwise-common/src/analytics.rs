use crate::calendar::{in_month, round_half_up};
use crate::models::expense::{normalize_category, Expense};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Smallest bar width renderers should draw for a non-empty category
pub const MIN_DISPLAY_PERCENT: i64 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
    /// Share of the month total, rounded; not floored
    pub percent: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryBreakdown {
    pub year: i32,
    pub month: u32,
    pub month_total: f64,
    pub categories: Vec<CategoryTotal>,
}

/// Sum of all expenses in the given month
pub fn month_total(expenses: &[Expense], year: i32, month: u32) -> f64 {
    expenses
        .iter()
        .filter(|e| in_month(e.spent_on, year, month))
        .map(|e| e.amount)
        .sum()
}

/// Group one month's expenses by category, largest first.
pub fn category_breakdown(expenses: &[Expense], year: i32, month: u32) -> CategoryBreakdown {
    let mut by_category: HashMap<String, f64> = HashMap::new();
    let mut total = 0.0;

    for e in expenses.iter().filter(|e| in_month(e.spent_on, year, month)) {
        *by_category
            .entry(normalize_category(Some(&e.category)))
            .or_insert(0.0) += e.amount;
        total += e.amount;
    }

    let mut categories: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, amount)| CategoryTotal {
            percent: share_percent(amount, total),
            category,
            amount,
        })
        .collect();

    categories.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });

    CategoryBreakdown {
        year,
        month,
        month_total: total,
        categories,
    }
}

fn share_percent(amount: f64, total: f64) -> i64 {
    if total > 0.0 {
        round_half_up(amount / total * 100.0)
    } else {
        0
    }
}

/// Percent to draw for a bar: at least [`MIN_DISPLAY_PERCENT`].
pub fn display_percent(percent: i64) -> i64 {
    percent.max(MIN_DISPLAY_PERCENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn expense(category: &str, amount: f64, spent_on: NaiveDate) -> Expense {
        Expense {
            expense_id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            amount,
            currency: "LKR".to_string(),
            category: category.to_string(),
            note: None,
            spent_on,
            created_at: Utc::now(),
        }
    }

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    #[test]
    fn test_breakdown_groups_and_sorts() {
        let expenses = vec![
            expense("Food", 100.0, june(1)),
            expense("Food", 50.0, june(2)),
            expense("Travel", 50.0, june(3)),
        ];
        let b = category_breakdown(&expenses, 2025, 6);
        assert_eq!(b.month_total, 200.0);
        assert_eq!(b.categories.len(), 2);
        assert_eq!(b.categories[0].category, "Food");
        assert_eq!(b.categories[0].amount, 150.0);
        assert_eq!(b.categories[0].percent, 75);
        assert_eq!(b.categories[1].category, "Travel");
        assert_eq!(b.categories[1].amount, 50.0);
        assert_eq!(b.categories[1].percent, 25);
    }

    #[test]
    fn test_breakdown_filters_other_months() {
        let expenses = vec![
            expense("Food", 100.0, june(30)),
            expense("Food", 999.0, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()),
            expense("Food", 999.0, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()),
        ];
        let b = category_breakdown(&expenses, 2025, 6);
        assert_eq!(b.month_total, 100.0);
        assert_eq!(month_total(&expenses, 2025, 6), 100.0);
    }

    #[test]
    fn test_blank_category_becomes_other() {
        let expenses = vec![expense("", 10.0, june(1)), expense("  ", 5.0, june(2))];
        let b = category_breakdown(&expenses, 2025, 6);
        assert_eq!(b.categories.len(), 1);
        assert_eq!(b.categories[0].category, "Other");
        assert_eq!(b.categories[0].amount, 15.0);
    }

    #[test]
    fn test_small_share_not_floored() {
        let expenses = vec![expense("Rent", 990.0, june(1)), expense("Tea", 10.0, june(1))];
        let b = category_breakdown(&expenses, 2025, 6);
        assert_eq!(b.categories[1].percent, 1);
        assert_eq!(display_percent(b.categories[1].percent), 4);
        assert_eq!(display_percent(b.categories[0].percent), 99);
    }

    #[test]
    fn test_empty_month() {
        let b = category_breakdown(&[], 2025, 6);
        assert_eq!(b.month_total, 0.0);
        assert!(b.categories.is_empty());
    }

    #[test]
    fn test_ties_sorted_by_name() {
        let expenses = vec![expense("Zoo", 50.0, june(1)), expense("Art", 50.0, june(1))];
        let b = category_breakdown(&expenses, 2025, 6);
        assert_eq!(b.categories[0].category, "Art");
        assert_eq!(b.categories[1].category, "Zoo");
    }
}
