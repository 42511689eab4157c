//! Get Team Handler

use std::sync::Arc;

use furlough_app::domain::teams::records::TeamUuid;
use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    org::{errors::into_api_error, models::TeamDetailResponse},
    state::State,
};

/// Get Team Handler
#[endpoint(
    tags("org"),
    summary = "Fetch a team with members and managers",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Team detail"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown or foreign team"),
    ),
)]
pub(crate) async fn handler(
    team: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<TeamDetailResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let detail = state
        .app
        .org
        .get_team(&principal, TeamUuid::from_uuid(team.into_inner()))
        .await
        .map_err(into_api_error)?;

    Ok(Json(detail.into()))
}
