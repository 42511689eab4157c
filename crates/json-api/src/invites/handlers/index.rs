//! List Invites Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    auth::errors::into_api_error, errors::ApiError, extensions::DepotExt,
    invites::models::InviteResponse, state::State,
};

/// List Invites Handler
#[endpoint(
    tags("invites"),
    summary = "List issued invites (admin)",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Invites for this company"),
        (status_code = StatusCode::FORBIDDEN, description = "Admin only"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<Vec<InviteResponse>>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let invites = state
        .app
        .sessions
        .list_invites(&principal)
        .await
        .map_err(into_api_error)?;

    Ok(Json(invites.into_iter().map(Into::into).collect()))
}
