use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
            MessageResponse, PublicUser, RegisterRequest, RegisterResponse,
        },
        extractors::AuthUser,
        password::{hash_password, verify_password},
        repo_types::NewUser,
        services::start_session,
    },
    db::RepoError,
    error::ApiError,
    notifications::{deliver, templates},
    state::AppState,
    validation::{is_valid_email, present, required, MIN_PASSWORD_LEN},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/delete-account", delete(delete_account))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(payload) = payload?;

    let first_name = required("firstName", &payload.first_name)?;
    let last_name = required("lastName", &payload.last_name)?;
    let email = required("email", &payload.email)?;
    let password = required("password", &payload.password)?;
    let country = required("country", &payload.country)?;
    let experience = required("experience", &payload.experience)?;

    if !is_valid_email(email) {
        warn!("register with invalid email");
        return Err(ApiError::validation("Invalid email format"));
    }

    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::validation(
            "Password must be at least 8 characters long",
        ));
    }

    // Ensure email is not taken; the unique index still decides under races
    let existing = state
        .users
        .find_by_email(email)
        .await
        .map_err(ApiError::persistence("Failed to create user"))?;
    if existing.is_some() {
        warn!("email already registered");
        return Err(ApiError::Conflict);
    }

    let hash = hash_password(password).map_err(ApiError::persistence("Failed to create user"))?;

    let phone = payload.phone.clone().unwrap_or_default();
    let newsletter = payload.newsletter.unwrap_or(false);
    let user = match state
        .users
        .create(NewUser {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            phone: phone.clone(),
            country: country.to_string(),
            experience: experience.to_string(),
            password_hash: hash,
            newsletter,
        })
        .await
    {
        Ok(u) => u,
        Err(RepoError::Conflict) => {
            warn!("email registered concurrently");
            return Err(ApiError::Conflict);
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(ApiError::persistence("Failed to create user")(e));
        }
    };

    info!(user_id = %user.id, "user registered");

    deliver(
        state.mailer.as_ref(),
        templates::welcome(&user.email, &user.first_name),
    )
    .await;
    deliver(
        state.mailer.as_ref(),
        templates::admin_registration(
            &state.config.admin_email,
            &templates::RegistrationDetails {
                first_name,
                last_name,
                email,
                phone: &phone,
                country,
                experience,
                newsletter,
            },
        ),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "User created successfully",
            user_id: user.id,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload?;
    if !present(&payload.email) || !present(&payload.password) {
        return Err(ApiError::validation("Email and password are required"));
    }
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let user = match state.users.find_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => return Err(ApiError::persistence("Login failed")(e)),
    };

    if !verify_password(&password, &user.password_hash) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let issued = start_session(&state, &user).await?;

    deliver(
        state.mailer.as_ref(),
        templates::admin_login(
            &state.config.admin_email,
            &user.first_name,
            &user.last_name,
            &user.email,
            state.clock.now(),
        ),
    )
    .await;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        success: true,
        token: issued.token,
        user: PublicUser::from(&user),
    }))
}

/// Notifies the account owner and the admin. No reset token is issued.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;
    let email = required("email", &payload.email)?;

    let user = state
        .users
        .find_by_email(email)
        .await
        .map_err(ApiError::persistence("Failed to process request"))?;
    let Some(user) = user else {
        warn!("password reset for unknown email");
        return Err(ApiError::validation("Email not found"));
    };

    deliver(
        state.mailer.as_ref(),
        templates::password_reset(&user.email, &user.first_name),
    )
    .await;
    deliver(
        state.mailer.as_ref(),
        templates::admin_password_reset(
            &state.config.admin_email,
            &user.first_name,
            &user.last_name,
            &user.email,
            state.clock.now(),
        ),
    )
    .await;

    info!(user_id = %user.id, "password reset requested");
    Ok(Json(MessageResponse::ok("Reset email sent")))
}

/// Clears the session registry for the caller. Tokens already handed out stay
/// cryptographically valid until their own expiry.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state
        .sessions
        .invalidate_all(user.id)
        .await
        .map_err(ApiError::persistence("Failed to log out"))?;

    info!(removed, "user logged out");
    Ok(Json(MessageResponse::ok("Logged out successfully")))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;
    if !present(&payload.current_password) || !present(&payload.new_password) {
        return Err(ApiError::validation(
            "Current password and new password are required",
        ));
    }
    let current = payload.current_password.unwrap_or_default();
    let new = payload.new_password.unwrap_or_default();

    if new.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "New password must be at least 8 characters long",
        ));
    }

    if !verify_password(&current, &user.password_hash) {
        warn!("change password with wrong current password");
        return Err(ApiError::validation("Invalid current password"));
    }

    let hash = hash_password(&new).map_err(ApiError::persistence("Failed to change password"))?;
    state
        .users
        .update_password(user.id, &hash)
        .await
        .map_err(ApiError::persistence("Failed to change password"))?;

    info!("password changed");
    Ok(Json(MessageResponse::ok("Password changed successfully")))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .users
        .delete_cascade(user.id)
        .await
        .map_err(ApiError::persistence("Failed to delete account"))?;

    info!("account deleted");
    Ok(Json(MessageResponse::ok("Account deleted successfully")))
}
