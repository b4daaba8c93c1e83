use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use spendwise_common::models::expense::Expense;
use sqlx::PgPool;
use uuid::Uuid;

const EXPENSE_COLUMNS: &str =
    "expense_id, user_id, amount, currency, category, note, spent_on, created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExpenseRow {
    pub expense_id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub category: String,
    pub note: Option<String>,
    pub spent_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            expense_id: row.expense_id,
            user_id: row.user_id,
            amount: row.amount,
            currency: row.currency,
            category: row.category,
            note: row.note,
            spent_on: row.spent_on,
            created_at: row.created_at,
        }
    }
}

/// Validated values for an insert or full update
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub amount: f64,
    pub currency: String,
    pub category: String,
    pub note: Option<String>,
    pub spent_on: NaiveDate,
}

/// Every query is scoped by `user_id`; rows owned by someone else behave as
/// if they did not exist.
pub struct ExpenseRepo;

impl ExpenseRepo {
    pub async fn create(pool: &PgPool, user_id: Uuid, expense: &NewExpense) -> Result<ExpenseRow> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!(
            r#"
            INSERT INTO expense (expense_id, user_id, amount, currency, category, note, spent_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(expense.amount)
        .bind(&expense.currency)
        .bind(&expense.category)
        .bind(&expense.note)
        .bind(expense.spent_on)
        .fetch_one(pool)
        .await
        .context("Failed to create expense")?;
        Ok(row)
    }

    pub async fn get(pool: &PgPool, user_id: Uuid, expense_id: Uuid) -> Result<Option<ExpenseRow>> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!(
            "SELECT {} FROM expense WHERE expense_id = $1 AND user_id = $2",
            EXPENSE_COLUMNS
        ))
        .bind(expense_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get expense")?;
        Ok(row)
    }

    /// All of a user's expenses, most recent day first
    pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<ExpenseRow>> {
        let rows = sqlx::query_as::<_, ExpenseRow>(&format!(
            "SELECT {} FROM expense WHERE user_id = $1 ORDER BY spent_on DESC, created_at DESC",
            EXPENSE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list expenses")?;
        Ok(rows)
    }

    /// Expenses with `from <= spent_on <= to`
    pub async fn list_between(
        pool: &PgPool,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExpenseRow>> {
        let rows = sqlx::query_as::<_, ExpenseRow>(&format!(
            "SELECT {} FROM expense WHERE user_id = $1 AND spent_on >= $2 AND spent_on <= $3 ORDER BY spent_on DESC, created_at DESC",
            EXPENSE_COLUMNS
        ))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
        .context("Failed to list expenses in range")?;
        Ok(rows)
    }

    /// Expenses on or after `since`
    pub async fn list_since(
        pool: &PgPool,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<ExpenseRow>> {
        let rows = sqlx::query_as::<_, ExpenseRow>(&format!(
            "SELECT {} FROM expense WHERE user_id = $1 AND spent_on >= $2 ORDER BY spent_on DESC, created_at DESC",
            EXPENSE_COLUMNS
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(pool)
        .await
        .context("Failed to list recent expenses")?;
        Ok(rows)
    }

    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        expense_id: Uuid,
        expense: &NewExpense,
    ) -> Result<Option<ExpenseRow>> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!(
            r#"
            UPDATE expense
            SET amount = $3, currency = $4, category = $5, note = $6, spent_on = $7
            WHERE expense_id = $1 AND user_id = $2
            RETURNING {}
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(expense_id)
        .bind(user_id)
        .bind(expense.amount)
        .bind(&expense.currency)
        .bind(&expense.category)
        .bind(&expense.note)
        .bind(expense.spent_on)
        .fetch_optional(pool)
        .await
        .context("Failed to update expense")?;
        Ok(row)
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, expense_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM expense WHERE expense_id = $1 AND user_id = $2")
            .bind(expense_id)
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to delete expense")?;
        Ok(result.rows_affected() > 0)
    }

    /// "Clear all": returns the number of rows removed
    pub async fn delete_all(pool: &PgPool, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM expense WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to clear expenses")?;
        Ok(result.rows_affected())
    }
}
