//! Audit service errors.

use sqlx::Error;
use thiserror::Error;

use crate::authz::AuthzDenied;

#[derive(Debug, Error)]
pub enum AuditServiceError {
    #[error("audit event not found")]
    NotFound,

    #[error("operation not permitted")]
    NotAuthorized,

    #[error("entity belongs to a different company")]
    CrossTenantAccess,

    #[error("audit events are append-only")]
    AuditImmutable,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for AuditServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        // The append-only trigger raises with this message on UPDATE/DELETE.
        if let Some(db) = error.as_database_error()
            && db.message().contains("append-only")
        {
            return Self::AuditImmutable;
        }

        Self::Sql(error)
    }
}

impl From<AuthzDenied> for AuditServiceError {
    fn from(denied: AuthzDenied) -> Self {
        match denied {
            AuthzDenied::NotAuthorized => Self::NotAuthorized,
            AuthzDenied::CrossTenantAccess => Self::CrossTenantAccess,
        }
    }
}
