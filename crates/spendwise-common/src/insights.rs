//! Monthly budget insight computation.
//!
//! Pure over a user's budget and expense history; callers load the rows.

use crate::calendar::{round_half_up, MonthWindow};
use crate::models::expense::Expense;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Upper bound for the reported budget usage
pub const MAX_BUDGET_PERCENT: i64 = 999;
pub const DANGER_THRESHOLD: i64 = 90;
pub const WARNING_THRESHOLD: i64 = 60;
/// Food growth (percent) above which the food message is shown
pub const FOOD_INCREASE_THRESHOLD: i64 = 20;
pub const FOOD_CATEGORY: &str = "Food";

/// Budget band
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Safe,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpendingInsight {
    pub budget_used_percent: i64,
    pub current_spent: f64,
    pub monthly_budget: f64,
    pub food_increase_percent: i64,
    pub level: AlertLevel,
    pub show_banner: bool,
    pub trigger_notification: bool,
    pub message: Option<String>,
}

#[derive(Debug, Default)]
struct MonthTotals {
    this_month: f64,
    last_month: f64,
    food_this_month: f64,
    food_last_month: f64,
}

fn month_totals(window: &MonthWindow, expenses: &[Expense]) -> MonthTotals {
    let mut totals = MonthTotals::default();
    for e in expenses.iter().filter(|e| e.amount.is_finite()) {
        let is_food = e.category == FOOD_CATEGORY;
        if window.is_this_month(e.spent_on) {
            totals.this_month += e.amount;
            if is_food {
                totals.food_this_month += e.amount;
            }
        } else if window.is_last_month(e.spent_on) {
            totals.last_month += e.amount;
            if is_food {
                totals.food_last_month += e.amount;
            }
        }
    }
    totals
}

/// Percent change in food spending versus last month, 0 without a baseline.
fn food_increase_percent(this_month: f64, last_month: f64) -> i64 {
    if last_month > 0.0 {
        round_half_up((this_month - last_month) / last_month * 100.0)
    } else {
        0
    }
}

/// Compute the insight for the month containing `today`.
///
/// Returns `None` when no usable budget is set. `expenses` may contain rows
/// from any period; only this month and last month are considered.
pub fn compute_insights(
    monthly_budget: Option<f64>,
    today: NaiveDate,
    expenses: &[Expense],
) -> Option<SpendingInsight> {
    let budget = monthly_budget.filter(|b| b.is_finite() && *b > 0.0)?;

    let window = MonthWindow::containing(today);
    let totals = month_totals(&window, expenses);

    let budget_used_percent =
        round_half_up(totals.this_month / budget * 100.0).min(MAX_BUDGET_PERCENT);
    let food_increase_percent =
        food_increase_percent(totals.food_this_month, totals.food_last_month);

    let (level, show_banner, trigger_notification, mut message) =
        if budget_used_percent >= DANGER_THRESHOLD {
            (
                AlertLevel::Danger,
                true,
                true,
                Some(format!(
                    "You've used {}% of your monthly budget. Spend carefully.",
                    budget_used_percent
                )),
            )
        } else if budget_used_percent >= WARNING_THRESHOLD {
            (
                AlertLevel::Warning,
                true,
                false,
                Some(format!(
                    "You've already used {}% of your monthly budget. Keep an eye on spending.",
                    budget_used_percent
                )),
            )
        } else {
            (AlertLevel::Safe, false, false, None)
        };

    // Food message never replaces a budget message
    if message.is_none() && food_increase_percent > FOOD_INCREASE_THRESHOLD {
        message = Some(format!(
            "Food expenses increased by {}% compared to last month.",
            food_increase_percent
        ));
    }

    Some(SpendingInsight {
        budget_used_percent,
        current_spent: totals.this_month,
        monthly_budget: budget,
        food_increase_percent,
        level,
        show_banner,
        trigger_notification,
        message,
    })
}
