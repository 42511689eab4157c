//! Create Period Handler

use std::sync::Arc;

use furlough_app::domain::periods::records::NewVacationPeriod;
use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    periods::{errors::into_api_error, models::PeriodResponse},
    state::State,
    vacations::models::parse_date,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CreatePeriodRequest {
    pub name: String,
    pub start_date: String,
    pub end_date: String,

    #[serde(default)]
    pub is_default: bool,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Create Period Handler
#[endpoint(
    tags("periods"),
    summary = "Create a vacation period (admin)",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::CREATED, description = "Period created"),
        (status_code = StatusCode::CONFLICT, description = "Name already in use"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid dates"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<CreatePeriodRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<PeriodResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();
    let body = json.into_inner();

    let period = NewVacationPeriod {
        name: body.name,
        start_date: parse_date(&body.start_date)?,
        end_date: parse_date(&body.end_date)?,
        is_default: body.is_default,
        is_active: body.is_active,
    };

    let created = state
        .app
        .calendar
        .create_period(&principal, period)
        .await
        .map_err(into_api_error)?;

    res.status_code(StatusCode::CREATED);

    Ok(Json(created.into()))
}
