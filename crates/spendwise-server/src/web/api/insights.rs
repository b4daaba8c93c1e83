use crate::state::AppState;
use crate::web::api::error::{ApiError, ApiResult};
use crate::web::api::middleware::AuthUser;
use axum::{extract::State, Json};
use spendwise_common::calendar::{self, MonthWindow};
use spendwise_common::insights::{compute_insights, SpendingInsight};
use spendwise_common::models::expense::Expense;
use spendwise_db::{ExpenseRepo, UserRepo};
use std::sync::Arc;

/// GET /api/insights -- budget insight for the current month, `null` when no
/// budget is set
#[tracing::instrument(skip(state, auth))]
pub async fn get_insights(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Option<SpendingInsight>>> {
    let user = UserRepo::get_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let Some(budget) = user.monthly_budget else {
        return Ok(Json(None));
    };

    let today = calendar::today();
    let window = MonthWindow::containing(today);
    let expenses: Vec<Expense> =
        ExpenseRepo::list_since(&state.pool, auth.user_id, window.start_of_last_month)
            .await?
            .into_iter()
            .map(Expense::from)
            .collect();

    Ok(Json(compute_insights(Some(budget), today, &expenses)))
}
