use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::repo::NewContactMessage;
use crate::{
    auth::dto::MessageResponse,
    error::ApiError,
    notifications::{deliver, templates},
    state::AppState,
    validation::{is_valid_email, required},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub phone: Option<String>,
    pub newsletter: Option<bool>,
}

pub fn contact_routes() -> Router<AppState> {
    Router::new().route("/contact", post(contact))
}

#[instrument(skip(state, payload))]
pub async fn contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;

    let first_name = required("firstName", &payload.first_name)?;
    let last_name = required("lastName", &payload.last_name)?;
    let email = required("email", &payload.email)?;
    let subject = required("subject", &payload.subject)?;
    let message = required("message", &payload.message)?;

    if !is_valid_email(email) {
        warn!("contact with invalid email");
        return Err(ApiError::validation("Invalid email format"));
    }

    let saved = state
        .contacts
        .insert(NewContactMessage {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            phone: payload.phone.clone().unwrap_or_default(),
            subject: subject.to_string(),
            message: message.to_string(),
            newsletter: payload.newsletter.unwrap_or(false),
        })
        .await
        .map_err(ApiError::persistence("Failed to send message"))?;

    info!(message_id = %saved.id, "contact message stored");

    deliver(
        state.mailer.as_ref(),
        templates::admin_contact(
            &state.config.admin_email,
            &templates::ContactDetails {
                first_name: &saved.first_name,
                last_name: &saved.last_name,
                email: &saved.email,
                phone: &saved.phone,
                subject: &saved.subject,
                message: &saved.message,
                newsletter: saved.newsletter,
            },
        ),
    )
    .await;

    Ok(Json(MessageResponse::ok("Message sent successfully")))
}
