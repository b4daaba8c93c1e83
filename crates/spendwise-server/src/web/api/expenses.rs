use crate::state::AppState;
use crate::web::api::error::{ApiError, ApiResult};
use crate::web::api::middleware::AuthUser;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, Months, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use spendwise_common::analytics::{category_breakdown, CategoryBreakdown};
use spendwise_common::calendar;
use spendwise_common::models::expense::{
    normalize_category, Expense, ExpenseInput, DEFAULT_CURRENCY,
};
use spendwise_db::{ExpenseRepo, NewExpense};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct BreakdownQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Validate a create/update body and fill in defaults.
fn to_new_expense(input: ExpenseInput) -> ApiResult<NewExpense> {
    let amount = input
        .valid_amount()
        .ok_or_else(|| ApiError::validation("Amount must be a positive number"))?;

    let currency = input
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let note = input
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    Ok(NewExpense {
        amount,
        currency,
        category: normalize_category(input.category.as_deref()),
        note,
        spent_on: input.spent_on.unwrap_or_else(calendar::today),
    })
}

/// GET /api/expenses
#[tracing::instrument(skip(state, auth))]
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Expense>>> {
    let rows = ExpenseRepo::list(&state.pool, auth.user_id).await?;
    Ok(Json(rows.into_iter().map(Expense::from).collect()))
}

/// POST /api/expenses
#[tracing::instrument(skip(state, auth, input))]
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(input): Json<ExpenseInput>,
) -> ApiResult<impl IntoResponse> {
    let new = to_new_expense(input)?;
    let row = ExpenseRepo::create(&state.pool, auth.user_id, &new).await?;
    Ok((StatusCode::CREATED, Json(Expense::from(row))))
}

/// DELETE /api/expenses -- clear all of the caller's expenses
#[tracing::instrument(skip(state, auth))]
pub async fn clear_expenses(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let deleted = ExpenseRepo::delete_all(&state.pool, auth.user_id).await?;
    tracing::info!("Cleared {} expense(s) for {}", deleted, auth.user_id);
    Ok(Json(json!({ "deleted": deleted })))
}

/// GET /api/expenses/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn get_expense(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Expense>> {
    let row = ExpenseRepo::get(&state.pool, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense not found"))?;
    Ok(Json(row.into()))
}

/// PUT /api/expenses/{id}
#[tracing::instrument(skip(state, auth, input))]
pub async fn update_expense(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ExpenseInput>,
) -> ApiResult<Json<Expense>> {
    let new = to_new_expense(input)?;
    let row = ExpenseRepo::update(&state.pool, auth.user_id, id, &new)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense not found"))?;
    Ok(Json(row.into()))
}

/// DELETE /api/expenses/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    if !ExpenseRepo::delete(&state.pool, auth.user_id, id).await? {
        return Err(ApiError::not_found("Expense not found"));
    }
    Ok(Json(json!({ "status": "ok" })))
}

/// GET /api/expenses/breakdown?year=&month= -- defaults to the current month
#[tracing::instrument(skip(state, auth))]
pub async fn breakdown(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<BreakdownQuery>,
) -> ApiResult<Json<CategoryBreakdown>> {
    let today = calendar::today();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());

    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ApiError::validation("Invalid year or month"))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| ApiError::validation("Invalid year or month"))?;

    let expenses: Vec<Expense> = ExpenseRepo::list_between(&state.pool, auth.user_id, first, last)
        .await?
        .into_iter()
        .map(Expense::from)
        .collect();

    Ok(Json(category_breakdown(&expenses, year, month)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_expense_defaults() {
        let input = ExpenseInput {
            amount: Some(250.0),
            category: Some("  ".to_string()),
            note: Some("   ".to_string()),
            ..Default::default()
        };
        let new = to_new_expense(input).unwrap();
        assert_eq!(new.amount, 250.0);
        assert_eq!(new.category, "Other");
        assert_eq!(new.currency, "LKR");
        assert!(new.note.is_none());
        assert_eq!(new.spent_on, calendar::today());
    }

    #[test]
    fn test_new_expense_keeps_given_values() {
        let input = ExpenseInput {
            amount: Some(12.5),
            category: Some(" Food ".to_string()),
            note: Some(" lunch ".to_string()),
            currency: Some("usd".to_string()),
            spent_on: Some("2025-02-28".parse().unwrap()),
        };
        let new = to_new_expense(input).unwrap();
        assert_eq!(new.category, "Food");
        assert_eq!(new.note.as_deref(), Some("lunch"));
        assert_eq!(new.currency, "USD");
        assert_eq!(new.spent_on, "2025-02-28".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn test_new_expense_rejects_bad_amount() {
        for amount in [None, Some(0.0), Some(-1.0), Some(f64::INFINITY)] {
            let input = ExpenseInput {
                amount,
                ..Default::default()
            };
            assert!(matches!(
                to_new_expense(input),
                Err(ApiError::Validation(_))
            ));
        }
    }
}
