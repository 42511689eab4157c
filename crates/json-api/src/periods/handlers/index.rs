//! List Periods Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    periods::{errors::into_api_error, models::PeriodResponse},
    state::State,
};

/// List Periods Handler
#[endpoint(
    tags("periods"),
    summary = "List the company's vacation periods",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Periods"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<Vec<PeriodResponse>>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let periods = state
        .app
        .calendar
        .list_periods(&principal)
        .await
        .map_err(into_api_error)?;

    Ok(Json(periods.into_iter().map(Into::into).collect()))
}
