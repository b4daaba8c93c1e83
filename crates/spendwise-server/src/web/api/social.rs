use crate::social::provision_user;
use crate::state::AppState;
use crate::web::api::auth::issue_tokens;
use crate::web::api::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use spendwise_common::models::auth::{AuthProvider, AuthResponse, SocialLoginRequest};
use std::sync::Arc;

/// POST /api/auth/{provider} -- sign in with a Google or Apple identity token
#[tracing::instrument(skip(state, req))]
pub async fn social_login(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Json(req): Json<SocialLoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let provider: AuthProvider = provider
        .parse()
        .ok()
        .filter(AuthProvider::is_social)
        .ok_or_else(|| ApiError::not_found(format!("Unknown sign-in provider '{}'", provider)))?;

    let verifier = state
        .verifier(provider)
        .ok_or_else(|| ApiError::not_found(format!("Sign-in with {} is not enabled", provider)))?;

    let identity = verifier.verify(&req.id_token).await.map_err(|e| {
        tracing::warn!("Rejected {} identity token: {:#}", provider, e);
        ApiError::auth("Invalid identity token")
    })?;

    let fallback_name = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let user = provision_user(&state.pool, provider, &identity, fallback_name)
        .await?
        .ok_or_else(|| ApiError::auth("Identity token has no email address"))?;

    Ok(Json(issue_tokens(&state, &user).await?))
}
