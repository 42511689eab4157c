//! Deactivate User Handler

use std::sync::Arc;

use furlough_app::domain::users::records::UserUuid;
use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{errors::ApiError, extensions::DepotExt, state::State, users::errors::into_api_error};

/// Deactivate User Handler
///
/// Soft delete: sets the deletion timestamp, deactivates the account, and
/// revokes its sessions. Historical requests keep their references.
#[endpoint(
    tags("users"),
    summary = "Soft-delete a user (admin)",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::NO_CONTENT, description = "User deactivated"),
        (status_code = StatusCode::FORBIDDEN, description = "Admin only"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown or out of scope"),
    ),
)]
pub(crate) async fn handler(
    user: PathParam<Uuid>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    state
        .app
        .identity
        .soft_delete_user(&principal, UserUuid::from_uuid(user.into_inner()))
        .await
        .map_err(into_api_error)?;

    res.status_code(StatusCode::NO_CONTENT);

    Ok(())
}
