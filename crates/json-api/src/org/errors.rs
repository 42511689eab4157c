//! Org error mapping.

use furlough_app::domain::{companies::CompaniesServiceError, teams::OrgServiceError};
use tracing::error;

use crate::errors::ApiError;

pub(crate) fn into_api_error(error: OrgServiceError) -> ApiError {
    match error {
        OrgServiceError::NotFound => ApiError::not_found(),
        OrgServiceError::DuplicateCode => ApiError::conflict("duplicate_code", "Code already in use"),
        OrgServiceError::AlreadyMember => {
            ApiError::conflict("already_member", "User is already an active member")
        }
        OrgServiceError::InvalidReference => {
            ApiError::bad_request("invalid_reference", "Related resource not found")
        }
        OrgServiceError::NotAuthorized => ApiError::forbidden(),
        // Cross-tenant reads surface as not-found so existence does not leak.
        OrgServiceError::CrossTenantAccess => ApiError::not_found(),
        OrgServiceError::Sql(source) => {
            error!("org storage error: {source}");

            ApiError::internal()
        }
    }
}

pub(crate) fn company_into_api_error(error: CompaniesServiceError) -> ApiError {
    match error {
        CompaniesServiceError::NotFound => ApiError::not_found(),
        CompaniesServiceError::AlreadyExists => {
            ApiError::conflict("duplicate_slug", "Company slug already in use")
        }
        CompaniesServiceError::NotAuthorized => ApiError::forbidden(),
        CompaniesServiceError::CrossTenantAccess => ApiError::not_found(),
        CompaniesServiceError::Sql(source) => {
            error!("company storage error: {source}");

            ApiError::internal()
        }
    }
}
