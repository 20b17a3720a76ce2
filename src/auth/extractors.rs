use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use thiserror::Error;
use tracing::warn;

use crate::{
    auth::{jwt::TokenError, repo_types::User},
    error::ApiError,
    state::AppState,
};

/// Why a protected request was turned away.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token is missing")]
    MissingToken,
    #[error("Token format invalid")]
    MalformedHeader,
    #[error("Token is invalid or expired")]
    InvalidOrExpiredToken(#[source] TokenError),
    #[error("User not found")]
    UserNotFound,
}

/// Pulls `<token>` out of `Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(token)
        }
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Runs the full guard: header, token, then the user the token names.
pub async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = bearer_token(headers)?;

    let claims = state.jwt.verify(token).map_err(|e| {
        warn!(reason = e.reason(), "rejected bearer token");
        AuthError::InvalidOrExpiredToken(e)
    })?;

    let user = state
        .users
        .find_by_id(claims.user_id)
        .await
        .map_err(ApiError::persistence("Failed to load user"))?;

    user.ok_or_else(|| {
        warn!(user_id = %claims.user_id, "token refers to a missing user");
        AuthError::UserNotFound.into()
    })
}

/// The authenticated caller, resolved before the handler body runs.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authorize(state, &parts.headers).await.map(AuthUser)
    }
}
