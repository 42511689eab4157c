//! Upsert Allocation Handler

use std::sync::Arc;

use furlough_app::domain::{
    periods::records::{AllocationUpsert, PeriodUuid},
    users::records::UserUuid,
};
use salvo::{
    oapi::{ToSchema, extract::JsonBody, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    periods::{errors::into_api_error, models::AllocationResponse},
    state::State,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct UpsertAllocationRequest {
    pub user_uuid: Uuid,
    pub total_days: f64,

    #[serde(default)]
    pub carried_over_days: f64,

    pub notes: Option<String>,
}

/// Upsert Allocation Handler
///
/// Sets totals only; `days_used` moves exclusively through request
/// transitions.
#[endpoint(
    tags("periods"),
    summary = "Set a user's allocation for a period (admin)",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Allocation stored"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown period or user"),
    ),
)]
pub(crate) async fn handler(
    period: PathParam<Uuid>,
    json: JsonBody<UpsertAllocationRequest>,
    depot: &mut Depot,
) -> Result<Json<AllocationResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();
    let body = json.into_inner();

    let allocation = state
        .app
        .calendar
        .upsert_allocation(
            &principal,
            PeriodUuid::from_uuid(period.into_inner()),
            AllocationUpsert {
                user_uuid: UserUuid::from_uuid(body.user_uuid),
                total_days: body.total_days,
                carried_over_days: body.carried_over_days,
                notes: body.notes,
            },
        )
        .await
        .map_err(into_api_error)?;

    Ok(Json(allocation.into()))
}
