//! Current User Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    errors::ApiError, extensions::DepotExt, state::State, users::errors::into_api_error,
    users::models::UserResponse,
};

/// Current User Handler
#[endpoint(
    tags("users"),
    summary = "The authenticated user's own record",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Current user"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Not authenticated"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<UserResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let user = state
        .app
        .identity
        .get_user(&principal, principal.user_uuid)
        .await
        .map_err(into_api_error)?;

    Ok(Json(user.into()))
}
