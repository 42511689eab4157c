//! Request engine errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::authz::AuthzDenied;

#[derive(Debug, Error)]
pub enum RequestsServiceError {
    #[error("vacation request not found")]
    NotFound,

    #[error("dates overlap an existing request")]
    OverlappingRequest,

    #[error("request is not pending")]
    NotPending,

    #[error("request is not a draft")]
    NotDraft,

    #[error("allocation would go negative")]
    AllocationExceeded,

    #[error("start date is in the past")]
    DateInPast,

    #[error("end date precedes start date")]
    InvalidDates,

    #[error("no vacation period covers the requested dates")]
    NoActivePeriod,

    #[error("withdrawal is only possible before the vacation starts")]
    WithdrawTooLate,

    #[error("user does not belong to the specified team")]
    NotTeamMember,

    #[error("operation not permitted")]
    NotAuthorized,

    #[error("entity belongs to a different company")]
    CrossTenantAccess,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for RequestsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            // The allocation days_used >= 0 check trips when a concurrent
            // cancel already credited the days back.
            Some(ErrorKind::CheckViolation) => Self::AllocationExceeded,
            _ => Self::Sql(error),
        }
    }
}

impl From<AuthzDenied> for RequestsServiceError {
    fn from(denied: AuthzDenied) -> Self {
        match denied {
            AuthzDenied::NotAuthorized => Self::NotAuthorized,
            AuthzDenied::CrossTenantAccess => Self::CrossTenantAccess,
        }
    }
}
