//! Calendar error mapping.

use furlough_app::domain::periods::CalendarServiceError;
use tracing::error;

use crate::errors::ApiError;

pub(crate) fn into_api_error(error: CalendarServiceError) -> ApiError {
    match error {
        CalendarServiceError::NotFound => ApiError::not_found(),
        CalendarServiceError::DuplicateName => {
            ApiError::conflict("duplicate_name", "Period name already in use")
        }
        CalendarServiceError::InvalidDates => {
            ApiError::bad_request("invalid_dates", "Period start must precede its end")
        }
        CalendarServiceError::NotAuthorized => ApiError::forbidden(),
        // Cross-tenant reads surface as not-found so existence does not leak.
        CalendarServiceError::CrossTenantAccess => ApiError::not_found(),
        CalendarServiceError::Sql(source) => {
            error!("calendar storage error: {source}");

            ApiError::internal()
        }
    }
}
