//! Auth error mapping.

use furlough_app::{domain::sessions::SessionsServiceError, password::PasswordError};
use salvo::http::StatusCode;
use serde_json::json;
use tracing::error;

use crate::errors::ApiError;

pub(crate) fn into_api_error(error: SessionsServiceError) -> ApiError {
    match error {
        SessionsServiceError::InvalidCredential => ApiError::new(
            StatusCode::UNAUTHORIZED,
            "invalid_credential",
            "Invalid email or password",
        ),
        SessionsServiceError::LoginLocked { retry_after_secs } => {
            ApiError::locked(retry_after_secs)
        }
        SessionsServiceError::RateLimited { retry_after_secs } => {
            ApiError::rate_limited(retry_after_secs)
        }
        SessionsServiceError::NotAuthenticated => ApiError::unauthenticated(),
        SessionsServiceError::Expired => {
            ApiError::new(StatusCode::UNAUTHORIZED, "token_expired", "Token expired")
        }
        SessionsServiceError::RefreshReplayDetected => ApiError::new(
            StatusCode::UNAUTHORIZED,
            "refresh_replay_detected",
            "Refresh token reuse detected; all sessions revoked",
        ),
        SessionsServiceError::InviteInvalid => {
            ApiError::bad_request("invite_invalid", "Invite is invalid, used, or expired")
        }
        SessionsServiceError::ResetTokenInvalid => ApiError::bad_request(
            "reset_token_invalid",
            "Password reset token is invalid, used, or expired",
        ),
        SessionsServiceError::DuplicateEmail => {
            ApiError::conflict("duplicate_email", "Email already in use")
        }
        SessionsServiceError::NotFound => ApiError::not_found(),
        SessionsServiceError::NotAuthorized => ApiError::forbidden(),
        // Cross-tenant reads surface as not-found so existence does not leak.
        SessionsServiceError::CrossTenantAccess => ApiError::not_found(),
        SessionsServiceError::Password(source) => password_error(source),
        SessionsServiceError::Sql(source) => {
            error!("session storage error: {source}");

            ApiError::internal()
        }
        SessionsServiceError::Join(source) => {
            error!("hashing task failed: {source}");

            ApiError::internal()
        }
    }
}

pub(crate) fn password_error(error: PasswordError) -> ApiError {
    match error {
        PasswordError::WeakPassword(rule) => {
            ApiError::bad_request("weak_password", rule.describe())
                .with_details(json!({ "rule": format!("{rule:?}") }))
        }
        PasswordError::InvalidCredential => ApiError::new(
            StatusCode::UNAUTHORIZED,
            "invalid_credential",
            "Invalid email or password",
        ),
        PasswordError::StoredHashCorrupt | PasswordError::Hashing(_) => {
            error!("password hashing failure");

            ApiError::internal()
        }
    }
}
