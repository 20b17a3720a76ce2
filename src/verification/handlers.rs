use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::Duration;
use tracing::{info, instrument, warn};

use crate::{
    auth::{dto::PublicUser, services::start_session},
    error::ApiError,
    notifications::{deliver, templates},
    state::AppState,
    validation::present,
};

const CODE_TTL: Duration = Duration::minutes(10);

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyCodeResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<VerifiedUser>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedUser {
    #[serde(flatten)]
    pub user: PublicUser,
    pub email_verified: bool,
}

#[derive(Debug, Serialize)]
pub struct SendCodeResponse {
    pub success: bool,
    pub message: &'static str,
}

pub fn verification_routes() -> Router<AppState> {
    Router::new()
        .route("/send-email-verification", post(send_email_verification))
        .route("/verify-email-code", post(verify_email_code))
}

pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

#[instrument(skip(state, payload))]
pub async fn send_email_verification(
    State(state): State<AppState>,
    payload: Result<Json<SendCodeRequest>, JsonRejection>,
) -> Result<Json<SendCodeResponse>, ApiError> {
    let Json(payload) = payload?;
    let Some(email) = payload.email.filter(|e| !e.is_empty()) else {
        return Err(ApiError::validation("Email is required"));
    };

    let code = generate_code();
    let expires_at = state.clock.now() + CODE_TTL;
    state
        .codes
        .replace(&email, &code, expires_at)
        .await
        .map_err(ApiError::persistence("Failed to save verification code"))?;

    deliver(state.mailer.as_ref(), templates::verification_code(&email, &code)).await;

    Ok(Json(SendCodeResponse {
        success: true,
        message: "Verification code sent successfully",
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_email_code(
    State(state): State<AppState>,
    payload: Result<Json<VerifyCodeRequest>, JsonRejection>,
) -> Result<Json<VerifyCodeResponse>, ApiError> {
    let Json(payload) = payload?;
    if !present(&payload.email) || !present(&payload.code) {
        return Err(ApiError::validation("Email and code are required"));
    }
    let email = payload.email.unwrap_or_default();
    let code = payload.code.unwrap_or_default();

    let matched = state
        .codes
        .consume(&email, &code, state.clock.now())
        .await
        .map_err(ApiError::persistence("Failed to verify code"))?;
    if !matched {
        warn!("verification code rejected");
        return Err(ApiError::validation("Invalid or expired verification code"));
    }

    let user = state
        .users
        .find_by_email(&email)
        .await
        .map_err(ApiError::persistence("Failed to verify code"))?;

    let Some(user) = user else {
        return Ok(Json(VerifyCodeResponse {
            success: true,
            message: "Email verified successfully",
            token: None,
            user: None,
        }));
    };

    state
        .users
        .mark_email_verified(user.id)
        .await
        .map_err(ApiError::persistence("Failed to verify code"))?;
    let issued = start_session(&state, &user).await?;

    info!(user_id = %user.id, "email verified");
    Ok(Json(VerifyCodeResponse {
        success: true,
        message: "Email verified and logged in successfully",
        token: Some(issued.token),
        user: Some(VerifiedUser {
            user: PublicUser::from(&user),
            email_verified: true,
        }),
    }))
}
