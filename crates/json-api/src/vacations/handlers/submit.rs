//! Submit Draft Handler

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

/// Submit Draft Handler
#[endpoint(
    tags("vacations"),
    summary = "Submit a draft for approval",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Request pending"),
        (status_code = StatusCode::CONFLICT, description = "Not a draft or overlapping"),
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
        .submit(&principal, RequestUuid::from_uuid(request.into_inner()))
        .await
        .map_err(into_api_error)?;

    Ok(Json(record.into()))
}
