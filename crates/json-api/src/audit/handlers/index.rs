//! List Audit Events Handler

use std::sync::Arc;

use furlough_app::domain::{
    audit::records::{AuditAction, AuditFilter},
    users::records::UserUuid,
};
use jiff::Timestamp;
use salvo::prelude::*;
use uuid::Uuid;

use crate::{
    audit::{handlers::into_api_error, models::AuditEventResponse},
    errors::ApiError,
    extensions::DepotExt,
    state::State,
};

/// List Audit Events Handler
///
/// Admin-only; newest first, uuid breaking created_at ties.
#[endpoint(
    tags("audit"),
    summary = "Query the audit trail (admin)",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Audit events"),
        (status_code = StatusCode::FORBIDDEN, description = "Admin only"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<AuditEventResponse>>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let filter = AuditFilter {
        actor_uuid: req.query::<Uuid>("actor").map(UserUuid::from_uuid),
        action: req
            .query::<String>("action")
            .map(|raw| AuditAction::parse(&raw))
            .transpose()
            .map_err(|_error| ApiError::bad_request("invalid_input", "Unknown audit action"))?,
        entity_type: req.query::<String>("entity_type"),
        entity_uuid: req.query::<Uuid>("entity"),
        from: parse_timestamp(req.query::<String>("from"))?,
        to: parse_timestamp(req.query::<String>("to"))?,
    };

    let limit = req.query::<i64>("limit").unwrap_or(100);
    let offset = req.query::<i64>("offset").unwrap_or(0);

    let events = state
        .app
        .audit
        .query(&principal, filter, limit, offset)
        .await
        .map_err(into_api_error)?;

    Ok(Json(events.into_iter().map(Into::into).collect()))
}

fn parse_timestamp(raw: Option<String>) -> Result<Option<Timestamp>, ApiError> {
    raw.map(|value| {
        value
            .parse::<Timestamp>()
            .map_err(|_error| ApiError::bad_request("invalid_input", "Timestamps must be RFC 3339"))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use furlough_app::domain::audit::{AuditServiceError, MockAuditService};
    use salvo::test::TestClient;
    use testresult::TestResult;

    use crate::test_helpers::audit_service;

    use super::*;

    #[tokio::test]
    async fn test_non_admin_gets_403() -> TestResult {
        let mut audit = MockAuditService::new();

        audit
            .expect_query()
            .once()
            .return_once(|_, _, _, _| Err(AuditServiceError::NotAuthorized));

        let service = audit_service(audit, Router::with_path("audit-logs").get(handler));

        let res = TestClient::get("http://example.com/audit-logs")
            .send(&service)
            .await;

        assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));

        Ok(())
    }
}
