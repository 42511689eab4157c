//! Sessions service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::{authz::AuthzDenied, password::PasswordError};

#[derive(Debug, Error)]
pub enum SessionsServiceError {
    #[error("credential mismatch")]
    InvalidCredential,

    #[error("account locked; retry in {retry_after_secs}s")]
    LoginLocked { retry_after_secs: i64 },

    #[error("rate limited; retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("token expired")]
    Expired,

    #[error("revoked refresh token replayed")]
    RefreshReplayDetected,

    #[error("invite is invalid, used, or expired")]
    InviteInvalid,

    #[error("password reset token is invalid, used, or expired")]
    ResetTokenInvalid,

    #[error("email already in use")]
    DuplicateEmail,

    #[error("not found")]
    NotFound,

    #[error("operation not permitted")]
    NotAuthorized,

    #[error("entity belongs to a different company")]
    CrossTenantAccess,

    #[error(transparent)]
    Password(PasswordError),

    #[error("storage error")]
    Sql(#[source] Error),

    #[error("background task failed")]
    Join(#[source] tokio::task::JoinError),
}

impl From<Error> for SessionsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::DuplicateEmail,
            _ => Self::Sql(error),
        }
    }
}

impl From<AuthzDenied> for SessionsServiceError {
    fn from(denied: AuthzDenied) -> Self {
        match denied {
            AuthzDenied::NotAuthorized => Self::NotAuthorized,
            AuthzDenied::CrossTenantAccess => Self::CrossTenantAccess,
        }
    }
}

impl From<PasswordError> for SessionsServiceError {
    fn from(error: PasswordError) -> Self {
        match error {
            PasswordError::InvalidCredential => Self::InvalidCredential,
            other => Self::Password(other),
        }
    }
}
