//! Cancel Request Handler

use std::sync::Arc;

use furlough_app::domain::requests::records::RequestUuid;
use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    state::State,
    vacations::{errors::into_api_error, models::VacationRequestResponse},
};

/// Cancel Request Handler
///
/// Owner, admin, or a manager of the owner's team. Cancelling an approved
/// request credits its days back to the allocation.
#[endpoint(
    tags("vacations"),
    summary = "Cancel a request",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Request cancelled"),
        (status_code = StatusCode::CONFLICT, description = "Already terminal"),
    ),
)]
pub(crate) async fn handler(
    request: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<VacationRequestResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let record = state
        .app
        .requests
        .cancel(&principal, RequestUuid::from_uuid(request.into_inner()))
        .await
        .map_err(into_api_error)?;

    Ok(Json(record.into()))
}
