//! Get User Handler

use std::sync::Arc;

use furlough_app::domain::users::records::UserUuid;
use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    errors::ApiError, extensions::DepotExt, state::State, users::errors::into_api_error,
    users::models::UserResponse,
};

/// Get User Handler
#[endpoint(
    tags("users"),
    summary = "Fetch one user in scope",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "User"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown or out of scope"),
    ),
)]
pub(crate) async fn handler(
    user: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<UserResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let record = state
        .app
        .identity
        .get_user(&principal, UserUuid::from_uuid(user.into_inner()))
        .await
        .map_err(into_api_error)?;

    Ok(Json(record.into()))
}
