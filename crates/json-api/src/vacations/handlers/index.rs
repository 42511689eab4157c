//! List Vacation Requests Handler

use std::{str::FromStr, sync::Arc};

use furlough_app::domain::{
    requests::records::{RequestFilter, RequestStatus},
    teams::records::TeamUuid,
    users::records::UserUuid,
};
use salvo::prelude::*;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    state::State,
    vacations::{
        errors::into_api_error,
        models::{VacationRequestResponse, parse_date},
    },
};

/// List Vacation Requests Handler
///
/// Scope follows the caller's role: own requests, managed teams, or the
/// whole company. Managers see their approval queue with
/// `?status=pending`.
#[endpoint(
    tags("vacations"),
    summary = "List vacation requests in scope",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Requests in scope"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<VacationRequestResponse>>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let filter = RequestFilter {
        status: req
            .query::<String>("status")
            .map(|raw| RequestStatus::from_str(&raw))
            .transpose()
            .map_err(|_error| ApiError::bad_request("invalid_input", "Unknown status filter"))?,
        user_uuid: req.query::<Uuid>("user").map(UserUuid::from_uuid),
        team_uuid: req.query::<Uuid>("team").map(TeamUuid::from_uuid),
        from: req.query::<String>("from").map(|raw| parse_date(&raw)).transpose()?,
        to: req.query::<String>("to").map(|raw| parse_date(&raw)).transpose()?,
    };

    let limit = req.query::<i64>("limit").unwrap_or(50);
    let offset = req.query::<i64>("offset").unwrap_or(0);

    let requests = state
        .app
        .requests
        .list(&principal, filter, limit, offset)
        .await
        .map_err(into_api_error)?;

    Ok(Json(requests.into_iter().map(Into::into).collect()))
}
