//! Update Draft Handler

use std::sync::Arc;

use furlough_app::domain::requests::records::RequestUuid;
use salvo::{
    oapi::extract::{JsonBody, PathParam},
    prelude::*,
};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    state::State,
    vacations::{
        errors::into_api_error,
        models::{VacationRequestBody, VacationRequestResponse},
    },
};

/// Update Draft Handler
///
/// Drafts only; a submitted request cannot be edited, only cancelled.
#[endpoint(
    tags("vacations"),
    summary = "Edit a draft request",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Draft updated"),
        (status_code = StatusCode::CONFLICT, description = "Not a draft"),
    ),
)]
pub(crate) async fn handler(
    request: PathParam<Uuid>,
    json: JsonBody<VacationRequestBody>,
    depot: &mut Depot,
) -> Result<Json<VacationRequestResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let (payload, _submit) = json.into_inner().into_payload()?;

    let record = state
        .app
        .requests
        .modify(&principal, RequestUuid::from_uuid(request.into_inner()), payload)
        .await
        .map_err(into_api_error)?;

    Ok(Json(record.into()))
}
