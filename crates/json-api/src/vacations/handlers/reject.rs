//! Reject Request Handler

use std::sync::Arc;

use furlough_app::domain::requests::records::RequestUuid;
use salvo::{
    oapi::{ToSchema, extract::JsonBody, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    state::State,
    vacations::{errors::into_api_error, models::VacationRequestResponse},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RejectRequestBody {
    pub reason: String,
}

/// Reject Request Handler
#[endpoint(
    tags("vacations"),
    summary = "Reject a pending request",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Request rejected"),
        (status_code = StatusCode::FORBIDDEN, description = "Outside managed teams"),
        (status_code = StatusCode::CONFLICT, description = "Not pending"),
    ),
)]
pub(crate) async fn handler(
    request: PathParam<Uuid>,
    json: JsonBody<RejectRequestBody>,
    depot: &mut Depot,
) -> Result<Json<VacationRequestResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let record = state
        .app
        .requests
        .reject(
            &principal,
            RequestUuid::from_uuid(request.into_inner()),
            json.into_inner().reason,
        )
        .await
        .map_err(into_api_error)?;

    Ok(Json(record.into()))
}
