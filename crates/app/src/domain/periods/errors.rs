//! Calendar service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::authz::AuthzDenied;

#[derive(Debug, Error)]
pub enum CalendarServiceError {
    #[error("not found")]
    NotFound,

    #[error("period name already in use")]
    DuplicateName,

    #[error("period dates are invalid")]
    InvalidDates,

    #[error("operation not permitted")]
    NotAuthorized,

    #[error("entity belongs to a different company")]
    CrossTenantAccess,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for CalendarServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::DuplicateName,
            Some(ErrorKind::CheckViolation) => Self::InvalidDates,
            _ => Self::Sql(error),
        }
    }
}

impl From<AuthzDenied> for CalendarServiceError {
    fn from(denied: AuthzDenied) -> Self {
        match denied {
            AuthzDenied::NotAuthorized => Self::NotAuthorized,
            AuthzDenied::CrossTenantAccess => Self::CrossTenantAccess,
        }
    }
}
