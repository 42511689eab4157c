//! Get Audit Event Handler

use std::sync::Arc;

use furlough_app::domain::audit::records::AuditEventUuid;
use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    audit::{handlers::into_api_error, models::AuditEventResponse},
    errors::ApiError,
    extensions::DepotExt,
    state::State,
};

/// Get Audit Event Handler
#[endpoint(
    tags("audit"),
    summary = "Fetch one audit event (admin)",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Audit event"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown or foreign event"),
    ),
)]
pub(crate) async fn handler(
    event: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<AuditEventResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let record = state
        .app
        .audit
        .get(&principal, AuditEventUuid::from_uuid(event.into_inner()))
        .await
        .map_err(into_api_error)?;

    Ok(Json(record.into()))
}
