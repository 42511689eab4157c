//! List Users Handler

use std::{str::FromStr, sync::Arc};

use furlough_app::domain::{
    teams::records::FunctionUuid,
    users::records::{Role, UserFilter},
};
use salvo::prelude::*;
use uuid::Uuid;

use crate::{
    errors::ApiError, extensions::DepotExt, state::State, users::errors::into_api_error,
    users::models::UserResponse,
};

/// List Users Handler
///
/// Admins see the whole company; managers their team members plus
/// themselves; everyone else just themselves.
#[endpoint(
    tags("users"),
    summary = "List users visible to the caller",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Users in scope"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let filter = UserFilter {
        role: req
            .query::<String>("role")
            .map(|raw| Role::from_str(&raw))
            .transpose()
            .map_err(|_error| ApiError::bad_request("invalid_input", "Unknown role filter"))?,
        function_uuid: req.query::<Uuid>("function").map(FunctionUuid::from_uuid),
        is_active: req.query::<bool>("is_active"),
        search: req.query::<String>("q"),
    };

    let limit = req.query::<i64>("limit").unwrap_or(50);
    let offset = req.query::<i64>("offset").unwrap_or(0);

    let users = state
        .app
        .identity
        .list_users(&principal, filter, limit, offset)
        .await
        .map_err(into_api_error)?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}
