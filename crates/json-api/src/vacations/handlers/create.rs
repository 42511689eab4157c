//! Create Vacation Request Handler

use std::sync::Arc;

use salvo::{oapi::extract::JsonBody, prelude::*};

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    state::State,
    vacations::{
        errors::into_api_error,
        models::{VacationRequestBody, VacationRequestResponse},
    },
};

/// Create Vacation Request Handler
///
/// A final payload goes straight to pending; `submit: false` keeps a
/// draft that overlap checks ignore until submission.
#[endpoint(
    tags("vacations"),
    summary = "Create a vacation request",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::CREATED, description = "Request created"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid dates or kind"),
        (status_code = StatusCode::CONFLICT, description = "Overlapping request"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<VacationRequestBody>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<VacationRequestResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let (payload, submit) = json.into_inner().into_payload()?;

    let request = state
        .app
        .requests
        .create(&principal, payload, submit)
        .await
        .map_err(into_api_error)?;

    res.status_code(StatusCode::CREATED);

    Ok(Json(request.into()))
}
