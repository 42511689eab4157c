//! List Teams Handler

use std::sync::Arc;

use furlough_app::domain::teams::records::FunctionUuid;
use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    org::{errors::into_api_error, models::TeamResponse},
    state::State,
};

/// List Teams Handler
#[endpoint(
    tags("org"),
    summary = "List the company's teams",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Teams"),
        (status_code = StatusCode::NOT_FOUND, description = "Foreign company"),
    ),
)]
pub(crate) async fn handler(
    company: PathParam<Uuid>,
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<TeamResponse>>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    if company.into_inner() != principal.company_uuid.into_uuid() {
        return Err(ApiError::not_found());
    }

    let function = req.query::<Uuid>("function").map(FunctionUuid::from_uuid);

    let teams = state
        .app
        .org
        .list_teams(&principal, function)
        .await
        .map_err(into_api_error)?;

    Ok(Json(teams.into_iter().map(Into::into).collect()))
}
