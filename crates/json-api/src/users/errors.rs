//! Identity error mapping.

use furlough_app::domain::users::IdentityServiceError;
use tracing::error;

use crate::{auth::errors::password_error, errors::ApiError};

pub(crate) fn into_api_error(error: IdentityServiceError) -> ApiError {
    match error {
        IdentityServiceError::NotFound => ApiError::not_found(),
        IdentityServiceError::DuplicateEmail => {
            ApiError::conflict("duplicate_email", "Email already in use")
        }
        IdentityServiceError::InvalidCredential => ApiError::new(
            salvo::http::StatusCode::UNAUTHORIZED,
            "invalid_credential",
            "Invalid email or password",
        ),
        IdentityServiceError::NotAuthenticated => ApiError::unauthenticated(),
        IdentityServiceError::NotAuthorized => ApiError::forbidden(),
        // Cross-tenant reads surface as not-found so existence does not leak.
        IdentityServiceError::CrossTenantAccess => ApiError::not_found(),
        IdentityServiceError::Password(source) => password_error(source),
        IdentityServiceError::Sql(source) => {
            error!("identity storage error: {source}");

            ApiError::internal()
        }
        IdentityServiceError::Join(source) => {
            error!("hashing task failed: {source}");

            ApiError::internal()
        }
    }
}
