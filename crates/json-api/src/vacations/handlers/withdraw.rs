//! Withdraw Request Handler

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

/// Withdraw Request Handler
///
/// Owner-only cancellation of an approved request, permitted strictly
/// before the vacation starts. Audited separately from cancel.
#[endpoint(
    tags("vacations"),
    summary = "Withdraw an approved request before it starts",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Request withdrawn, days credited"),
        (status_code = StatusCode::CONFLICT, description = "Not approved or already started"),
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
        .withdraw(&principal, RequestUuid::from_uuid(request.into_inner()))
        .await
        .map_err(into_api_error)?;

    Ok(Json(record.into()))
}
