//! List Functions Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    org::{errors::into_api_error, models::FunctionResponse},
    state::State,
};

/// List Functions Handler
#[endpoint(
    tags("org"),
    summary = "List the company's functions",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Functions"),
        (status_code = StatusCode::NOT_FOUND, description = "Foreign company"),
    ),
)]
pub(crate) async fn handler(
    company: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<Vec<FunctionResponse>>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    // Foreign company ids answer not-found, matching the company endpoint.
    if company.into_inner() != principal.company_uuid.into_uuid() {
        return Err(ApiError::not_found());
    }

    let functions = state
        .app
        .org
        .list_functions(&principal)
        .await
        .map_err(into_api_error)?;

    Ok(Json(functions.into_iter().map(Into::into).collect()))
}
