//! Request engine error mapping.

use furlough_app::domain::requests::RequestsServiceError;
use tracing::error;

use crate::errors::ApiError;

pub(crate) fn into_api_error(error: RequestsServiceError) -> ApiError {
    match error {
        RequestsServiceError::NotFound => ApiError::not_found(),
        RequestsServiceError::OverlappingRequest => ApiError::conflict(
            "overlapping_request",
            "Dates overlap an existing request",
        ),
        RequestsServiceError::NotPending => {
            ApiError::conflict("not_pending", "Request is not in an actionable state")
        }
        RequestsServiceError::NotDraft => {
            ApiError::conflict("not_draft", "Only drafts can be modified")
        }
        RequestsServiceError::AllocationExceeded => ApiError::conflict(
            "allocation_exceeded",
            "Approval would take the allocation below zero",
        ),
        RequestsServiceError::DateInPast => {
            ApiError::bad_request("date_in_past", "Start date must be today or later")
        }
        RequestsServiceError::InvalidDates => {
            ApiError::bad_request("invalid_dates", "End date precedes start date")
        }
        RequestsServiceError::NoActivePeriod => ApiError::bad_request(
            "no_active_period",
            "No vacation period covers the requested dates",
        ),
        RequestsServiceError::WithdrawTooLate => ApiError::conflict(
            "withdraw_too_late",
            "Withdrawal is only possible before the vacation starts",
        ),
        RequestsServiceError::NotTeamMember => {
            ApiError::bad_request("not_team_member", "User does not belong to the specified team")
        }
        RequestsServiceError::NotAuthorized => ApiError::forbidden(),
        // Cross-tenant reads surface as not-found so existence does not leak.
        RequestsServiceError::CrossTenantAccess => ApiError::not_found(),
        RequestsServiceError::Sql(source) => {
            error!("request storage error: {source}");

            ApiError::internal()
        }
    }
}
