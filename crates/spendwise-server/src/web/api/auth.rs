use crate::auth::{
    create_access_token, generate_refresh_token, hash_password, hash_refresh_token,
    is_valid_email, normalize_email, verify_password, MIN_PASSWORD_LEN,
};
use crate::state::AppState;
use crate::web::api::error::{ApiError, ApiResult};
use crate::web::api::middleware::AuthUser;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use spendwise_common::models::auth::{
    AuthProvider, AuthResponse, LoginRequest, RefreshRequest, RegisterRequest,
};
use spendwise_db::{RefreshTokenRepo, UserRepo, UserRow};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Mint an access token plus a stored refresh token for `user`.
pub(crate) async fn issue_tokens(state: &AppState, user: &UserRow) -> ApiResult<AuthResponse> {
    let auth_config = &state.config.auth;
    let access_token = create_access_token(
        &user.user_id.to_string(),
        &user.email,
        &auth_config.jwt_secret,
        auth_config.access_token_ttl_secs,
    )?;

    let (raw_refresh, refresh_hash) = generate_refresh_token();
    let expires_at = Utc::now() + Duration::days(auth_config.refresh_token_ttl_days);
    RefreshTokenRepo::create(&state.pool, &refresh_hash, user.user_id, expires_at).await?;

    if let Err(e) = UserRepo::touch_last_login(&state.pool, user.user_id).await {
        tracing::warn!("Failed to record login time for {}: {:#}", user.user_id, e);
    }

    Ok(AuthResponse {
        user: user.to_user(),
        access_token,
        refresh_token: raw_refresh,
    })
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}

/// POST /api/auth/register
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(ApiError::validation("A valid email is required"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if UserRepo::get_by_email(&state.pool, &email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let name = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let user_id = Uuid::new_v4();
    if let Err(e) = UserRepo::create(
        &state.pool,
        user_id,
        &email,
        Some(&password_hash),
        name,
        AuthProvider::Local,
    )
    .await
    {
        // Lost a race with a concurrent registration
        if is_unique_violation(&e) {
            return Err(ApiError::Conflict("User already exists".into()));
        }
        return Err(e.into());
    }

    let user = UserRepo::get_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Registered user {} not found", user_id))?;
    tracing::info!("Registered user {}", user_id);

    let body = issue_tokens(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// POST /api/auth/login
#[tracing::instrument(skip(state, req))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let invalid = || ApiError::auth("Invalid email or password");

    let user = UserRepo::get_by_email(&state.pool, &normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;

    // Social-only accounts have no password to check
    let password_hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    if !verify_password(&req.password, password_hash)? {
        return Err(invalid());
    }

    Ok(Json(issue_tokens(&state, &user).await?))
}

/// POST /api/auth/refresh
#[tracing::instrument(skip(state, req))]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let token_hash = hash_refresh_token(&req.refresh_token);

    // Rotation: the presented token is consumed whether or not it is still valid
    let token_row = RefreshTokenRepo::take(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| ApiError::auth("Invalid refresh token"))?;

    if token_row.is_expired(Utc::now()) {
        return Err(ApiError::auth("Refresh token expired"));
    }

    let user = UserRepo::get_by_id(&state.pool, token_row.user_id)
        .await?
        .ok_or_else(|| ApiError::auth("User not found"))?;

    Ok(Json(issue_tokens(&state, &user).await?))
}

/// POST /api/auth/logout
///
/// With a `refresh_token` body, revokes that token. Without one, revokes
/// every refresh token of the authenticated caller.
#[tracing::instrument(skip(state, auth, req))]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth: Option<AuthUser>,
    req: Option<Json<LogoutRequest>>,
) -> ApiResult<Json<serde_json::Value>> {
    let token = req.and_then(|Json(r)| r.refresh_token);

    match (token, auth) {
        (Some(raw), _) => {
            RefreshTokenRepo::delete(&state.pool, &hash_refresh_token(&raw)).await?;
        }
        (None, Some(auth)) => {
            let revoked = RefreshTokenRepo::delete_all_for_user(&state.pool, auth.user_id).await?;
            tracing::debug!("Revoked {} refresh token(s) for {}", revoked, auth.user_id);
        }
        (None, None) => {
            return Err(ApiError::validation("refresh_token is required"));
        }
    }

    Ok(Json(json!({"status": "ok"})))
}
