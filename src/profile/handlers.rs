use axum::{extract::rejection::JsonRejection, extract::State, routing::get, Json, Router};
use tracing::{debug, info, instrument, warn};

use super::dto::{Profile, ProfileResponse, UpdateProfileRequest};
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser, repo_types::ProfilePatch},
    db::RepoError,
    error::ApiError,
    state::AppState,
    validation::is_valid_email,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_profile(AuthUser(user): AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        success: true,
        user: Profile::from(&user),
    })
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;
    let patch = ProfilePatch::from(payload);

    if patch.is_empty() {
        debug!("profile update without recognised fields");
        return Ok(Json(MessageResponse::ok("Profile updated successfully")));
    }

    if patch.email.as_deref().is_some_and(|e| !is_valid_email(e)) {
        warn!("profile update with invalid email");
        return Err(ApiError::validation("Invalid email format"));
    }

    match state.users.update_profile(user.id, &patch).await {
        Ok(()) => {}
        Err(RepoError::Conflict) => {
            warn!("profile email collides with another account");
            return Err(ApiError::Conflict);
        }
        Err(e) => return Err(ApiError::persistence("Failed to update profile")(e)),
    }

    info!("profile updated");
    Ok(Json(MessageResponse::ok("Profile updated successfully")))
}
