//! Identity service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::{authz::AuthzDenied, password::PasswordError};

#[derive(Debug, Error)]
pub enum IdentityServiceError {
    #[error("user not found")]
    NotFound,

    #[error("email already in use")]
    DuplicateEmail,

    #[error("credential mismatch")]
    InvalidCredential,

    #[error("account is not active")]
    NotAuthenticated,

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

impl From<Error> for IdentityServiceError {
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

impl From<AuthzDenied> for IdentityServiceError {
    fn from(denied: AuthzDenied) -> Self {
        match denied {
            AuthzDenied::NotAuthorized => Self::NotAuthorized,
            AuthzDenied::CrossTenantAccess => Self::CrossTenantAccess,
        }
    }
}

impl From<PasswordError> for IdentityServiceError {
    fn from(error: PasswordError) -> Self {
        match error {
            PasswordError::InvalidCredential => Self::InvalidCredential,
            other => Self::Password(other),
        }
    }
}
