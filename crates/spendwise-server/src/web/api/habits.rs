use crate::state::AppState;
use crate::web::api::error::{ApiError, ApiResult};
use crate::web::api::middleware::AuthUser;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Days, NaiveDate};
use serde_json::json;
use spendwise_common::calendar;
use spendwise_common::models::habit::{
    palette_for, HabitInput, HabitLongestStreak, HabitStats, HabitView,
};
use spendwise_common::streak::{compute_streak, longest_streak};
use spendwise_db::{HabitCompletionRepo, HabitCompletionRow, HabitRepo, HabitRow};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Completion days keyed by habit
fn group_by_habit(rows: Vec<HabitCompletionRow>) -> HashMap<Uuid, Vec<NaiveDate>> {
    let mut grouped: HashMap<Uuid, Vec<NaiveDate>> = HashMap::new();
    for row in rows {
        grouped.entry(row.habit_id).or_default().push(row.completed_on);
    }
    grouped
}

fn to_view(habit: HabitRow, today: NaiveDate, completions: &[NaiveDate]) -> HabitView {
    let streak = compute_streak(today, completions);
    HabitView {
        id: habit.habit_id,
        title: habit.title,
        icon: habit.icon,
        color: habit.color,
        streak: streak.streak,
        completed_today: streak.completed_today,
    }
}

async fn view_of(pool: &PgPool, user_id: Uuid, habit: HabitRow) -> ApiResult<HabitView> {
    let completions = HabitCompletionRepo::list_for_habit(pool, user_id, habit.habit_id).await?;
    Ok(to_view(habit, calendar::today(), &completions))
}

async fn owned_habit(pool: &PgPool, user_id: Uuid, habit_id: Uuid) -> ApiResult<HabitRow> {
    HabitRepo::get(pool, user_id, habit_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Habit not found"))
}

/// GET /api/habits
#[tracing::instrument(skip(state, auth))]
pub async fn list_habits(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<HabitView>>> {
    let habits = HabitRepo::list_for_user(&state.pool, auth.user_id).await?;
    let grouped =
        group_by_habit(HabitCompletionRepo::list_for_user(&state.pool, auth.user_id).await?);
    let today = calendar::today();

    let views = habits
        .into_iter()
        .map(|habit| {
            let completions = grouped
                .get(&habit.habit_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            to_view(habit, today, completions)
        })
        .collect();
    Ok(Json(views))
}

/// POST /api/habits
#[tracing::instrument(skip(state, auth, input))]
pub async fn create_habit(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(input): Json<HabitInput>,
) -> ApiResult<impl IntoResponse> {
    let title = input
        .valid_title()
        .ok_or_else(|| ApiError::validation("Title is required"))?;

    let existing = HabitRepo::count_for_user(&state.pool, auth.user_id).await?;
    let (color, icon) = palette_for(existing);
    let habit = HabitRepo::create(&state.pool, auth.user_id, title, icon, color).await?;

    Ok((
        StatusCode::CREATED,
        Json(to_view(habit, calendar::today(), &[])),
    ))
}

/// PUT /api/habits/{id}
#[tracing::instrument(skip(state, auth, input))]
pub async fn rename_habit(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<HabitInput>,
) -> ApiResult<Json<HabitView>> {
    let title = input
        .valid_title()
        .ok_or_else(|| ApiError::validation("Title is required"))?;

    let habit = HabitRepo::rename(&state.pool, auth.user_id, id, title)
        .await?
        .ok_or_else(|| ApiError::not_found("Habit not found"))?;
    Ok(Json(view_of(&state.pool, auth.user_id, habit).await?))
}

/// DELETE /api/habits/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn delete_habit(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    if !HabitRepo::delete(&state.pool, auth.user_id, id).await? {
        return Err(ApiError::not_found("Habit not found"));
    }
    Ok(Json(json!({ "status": "ok" })))
}

/// POST /api/habits/{id}/complete -- mark done for today; repeating is a no-op
#[tracing::instrument(skip(state, auth))]
pub async fn complete_habit(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<HabitView>> {
    let habit = owned_habit(&state.pool, auth.user_id, id).await?;
    HabitCompletionRepo::upsert(&state.pool, id, auth.user_id, calendar::today()).await?;
    Ok(Json(view_of(&state.pool, auth.user_id, habit).await?))
}

/// DELETE /api/habits/{id}/complete -- undo today's completion
#[tracing::instrument(skip(state, auth))]
pub async fn undo_complete_habit(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<HabitView>> {
    let habit = owned_habit(&state.pool, auth.user_id, id).await?;
    HabitCompletionRepo::delete(&state.pool, id, auth.user_id, calendar::today()).await?;
    Ok(Json(view_of(&state.pool, auth.user_id, habit).await?))
}

/// GET /api/habits/stats -- completions in the last 7 and 30 days (today
/// included) and each habit's longest streak
#[tracing::instrument(skip(state, auth))]
pub async fn habit_stats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<HabitStats>> {
    let today = calendar::today();
    let since = |days: u64| {
        today
            .checked_sub_days(Days::new(days))
            .ok_or_else(|| anyhow::anyhow!("Date out of range"))
    };

    let weekly_completions =
        HabitCompletionRepo::count_since(&state.pool, auth.user_id, since(6)?).await?;
    let monthly_completions =
        HabitCompletionRepo::count_since(&state.pool, auth.user_id, since(29)?).await?;

    let habits = HabitRepo::list_for_user(&state.pool, auth.user_id).await?;
    let grouped =
        group_by_habit(HabitCompletionRepo::list_for_user(&state.pool, auth.user_id).await?);
    let longest_streaks = habits
        .iter()
        .map(|h| HabitLongestStreak {
            id: h.habit_id,
            longest_streak: grouped
                .get(&h.habit_id)
                .map(|days| longest_streak(days))
                .unwrap_or(0),
        })
        .collect();

    Ok(Json(HabitStats {
        weekly_completions,
        monthly_completions,
        longest_streaks,
    }))
}
