//! Org service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::authz::AuthzDenied;

#[derive(Debug, Error)]
pub enum OrgServiceError {
    #[error("not found")]
    NotFound,

    #[error("code already in use")]
    DuplicateCode,

    #[error("membership already active")]
    AlreadyMember,

    #[error("related resource not found")]
    InvalidReference,

    #[error("operation not permitted")]
    NotAuthorized,

    #[error("entity belongs to a different company")]
    CrossTenantAccess,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for OrgServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::DuplicateCode,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            _ => Self::Sql(error),
        }
    }
}

impl From<AuthzDenied> for OrgServiceError {
    fn from(denied: AuthzDenied) -> Self {
        match denied {
            AuthzDenied::NotAuthorized => Self::NotAuthorized,
            AuthzDenied::CrossTenantAccess => Self::CrossTenantAccess,
        }
    }
}
