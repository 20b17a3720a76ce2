use tracing::info;

use crate::{
    auth::{jwt::IssuedToken, repo_types::User},
    error::ApiError,
    state::AppState,
};

/// Issues a token for `user` and records it in the session registry.
pub async fn start_session(state: &AppState, user: &User) -> Result<IssuedToken, ApiError> {
    let issued = state
        .jwt
        .issue(user.id, &user.email)
        .map_err(ApiError::persistence("Failed to issue token"))?;

    state
        .sessions
        .record(user.id, &issued.token, issued.expires_at)
        .await
        .map_err(ApiError::persistence("Failed to record session"))?;

    info!(user_id = %user.id, "session started");
    Ok(issued)
}
