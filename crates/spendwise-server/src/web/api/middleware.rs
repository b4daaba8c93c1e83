use crate::auth::validate_access_token;
use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use spendwise_common::models::auth::Claims;
use std::sync::Arc;
use uuid::Uuid;

/// Extractor that validates a JWT Bearer token and provides the claims.
/// `Option<AuthUser>` yields `None` only when no Authorization header is sent;
/// a bad token is still rejected.
#[derive(Debug)]
pub struct AuthUser {
    pub claims: Claims,
    /// Parsed `sub`, the owner id for every repository query
    pub user_id: Uuid,
}

fn unauthorized(msg: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg }))).into_response()
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match auth_header {
            Some(val) => match val.strip_prefix("Bearer ") {
                Some(t) => t,
                None => return Err(unauthorized("Invalid authorization header format")),
            },
            None => return Err(unauthorized("Missing authorization header")),
        };

        let claims = validate_access_token(token, state.jwt_secret())
            .map_err(|_| unauthorized("Invalid or expired token"))?;
        // Tokens are only minted with a uuid subject
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| unauthorized("Invalid or expired token"))?;
        Ok(AuthUser { claims, user_id })
    }
}

impl OptionalFromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(None);
        }
        <AuthUser as FromRequestParts<Arc<AppState>>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}
