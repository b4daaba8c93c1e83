use crate::state::AppState;
use crate::web::api::error::{ApiError, ApiResult};
use crate::web::api::middleware::AuthUser;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::json;
use spendwise_common::models::auth::User;
use spendwise_db::UserRepo;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub monthly_budget: Option<f64>,
}

/// GET /api/me
#[tracing::instrument(skip(state, auth))]
pub async fn me(State(state): State<Arc<AppState>>, auth: AuthUser) -> ApiResult<Json<User>> {
    let user = UserRepo::get_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.to_user()))
}

/// PUT /api/me
#[tracing::instrument(skip(state, auth, req))]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let name = req.name.as_deref().map(str::trim);
    if name == Some("") {
        return Err(ApiError::validation("Name cannot be empty"));
    }
    let avatar_url = req.avatar_url.as_deref().map(str::trim).filter(|a| !a.is_empty());

    let user = UserRepo::update_profile(&state.pool, auth.user_id, name, avatar_url)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.to_user()))
}

/// GET /api/user/budget
#[tracing::instrument(skip(state, auth))]
pub async fn get_budget(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let user = UserRepo::get_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(json!({ "monthly_budget": user.monthly_budget })))
}

/// POST /api/user/budget
#[tracing::instrument(skip(state, auth))]
pub async fn set_budget(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<BudgetRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let budget = req
        .monthly_budget
        .filter(|b| b.is_finite() && *b > 0.0)
        .ok_or_else(|| ApiError::validation("Monthly budget must be a positive number"))?;

    if !UserRepo::set_monthly_budget(&state.pool, auth.user_id, budget).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!("Monthly budget set for {}", auth.user_id);
    Ok(Json(json!({ "monthly_budget": budget })))
}
