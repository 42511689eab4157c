//! Audit handlers.

pub(crate) mod get;
pub(crate) mod index;

use furlough_app::domain::audit::AuditServiceError;
use tracing::error;

use crate::errors::ApiError;

pub(crate) fn into_api_error(audit_error: AuditServiceError) -> ApiError {
    match audit_error {
        AuditServiceError::NotFound => ApiError::not_found(),
        AuditServiceError::NotAuthorized => ApiError::forbidden(),
        // Cross-tenant reads surface as not-found so existence does not leak.
        AuditServiceError::CrossTenantAccess => ApiError::not_found(),
        AuditServiceError::AuditImmutable => {
            ApiError::conflict("audit_immutable", "Audit events are append-only")
        }
        AuditServiceError::Sql(source) => {
            error!("audit storage error: {source}");

            ApiError::internal()
        }
    }
}
