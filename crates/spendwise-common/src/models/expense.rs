use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category assigned when an expense arrives without one
pub const DEFAULT_CATEGORY: &str = "Other";

/// Currency assigned when an expense arrives without one
pub const DEFAULT_CURRENCY: &str = "LKR";

/// Trim a category and fall back to [`DEFAULT_CATEGORY`] when blank.
pub fn normalize_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

/// A single expense owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub expense_id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub spent_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Body for creating or replacing an expense
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseInput {
    pub amount: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub spent_on: Option<NaiveDate>,
}

impl ExpenseInput {
    /// Returns the amount if it is present, finite and positive.
    pub fn valid_amount(&self) -> Option<f64> {
        self.amount.filter(|a| a.is_finite() && *a > 0.0)
    }
}
