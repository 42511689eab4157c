//! Update Period Handler

use std::sync::Arc;

use furlough_app::domain::periods::records::{PeriodPatch, PeriodUuid};
use salvo::{
    oapi::{ToSchema, extract::JsonBody, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    periods::{errors::into_api_error, models::PeriodResponse},
    state::State,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct UpdatePeriodRequest {
    pub name: Option<String>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
}

/// Update Period Handler
///
/// Marking a period default demotes the previous default; dates are fixed
/// once requests account against them.
#[endpoint(
    tags("periods"),
    summary = "Update a vacation period (admin)",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Period updated"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown period"),
    ),
)]
pub(crate) async fn handler(
    period: PathParam<Uuid>,
    json: JsonBody<UpdatePeriodRequest>,
    depot: &mut Depot,
) -> Result<Json<PeriodResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();
    let body = json.into_inner();

    let updated = state
        .app
        .calendar
        .update_period(
            &principal,
            PeriodUuid::from_uuid(period.into_inner()),
            PeriodPatch {
                name: body.name,
                is_default: body.is_default,
                is_active: body.is_active,
            },
        )
        .await
        .map_err(into_api_error)?;

    Ok(Json(updated.into()))
}
