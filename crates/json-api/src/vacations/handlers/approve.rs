//! Approve Request Handler

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

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct ApproveRequestBody {
    pub comment: Option<String>,
}

/// Approve Request Handler
///
/// Managers approve within their managed teams; admins anywhere in the
/// company; nobody approves their own request. Exactly one of two racing
/// approvers wins; the other sees a conflict.
#[endpoint(
    tags("vacations"),
    summary = "Approve a pending request",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Request approved, allocation debited"),
        (status_code = StatusCode::FORBIDDEN, description = "Outside managed teams or self-approval"),
        (status_code = StatusCode::CONFLICT, description = "Not pending or allocation exceeded"),
    ),
)]
pub(crate) async fn handler(
    request: PathParam<Uuid>,
    json: JsonBody<ApproveRequestBody>,
    depot: &mut Depot,
) -> Result<Json<VacationRequestResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let record = state
        .app
        .requests
        .approve(
            &principal,
            RequestUuid::from_uuid(request.into_inner()),
            json.into_inner().comment,
        )
        .await
        .map_err(into_api_error)?;

    Ok(Json(record.into()))
}

#[cfg(test)]
mod tests {
    use furlough_app::domain::requests::{MockRequestsService, RequestsServiceError};
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;
    use uuid::Uuid;

    use crate::test_helpers::{make_request_record, requests_service};

    use super::*;

    fn make_service(requests: MockRequestsService) -> Service {
        requests_service(
            requests,
            Router::with_path("vacations/{request}/approve").post(handler),
        )
    }

    #[tokio::test]
    async fn test_approve_returns_updated_request() -> TestResult {
        let record = make_request_record("2025-07-14", "2025-07-18", "approved", 5.0);

        let mut requests = MockRequestsService::new();

        requests
            .expect_approve()
            .once()
            .return_once(move |_, _, _| Ok(record));

        let mut res = TestClient::post(format!(
            "http://example.com/vacations/{}/approve",
            Uuid::nil()
        ))
        .json(&json!({ "comment": "enjoy" }))
        .send(&make_service(requests))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: VacationRequestResponse = res.take_json().await?;
        assert_eq!(body.status, "approved");

        Ok(())
    }

    #[tokio::test]
    async fn test_losing_approver_gets_409_not_pending() -> TestResult {
        let mut requests = MockRequestsService::new();

        requests
            .expect_approve()
            .once()
            .return_once(|_, _, _| Err(RequestsServiceError::NotPending));

        let mut res = TestClient::post(format!(
            "http://example.com/vacations/{}/approve",
            Uuid::nil()
        ))
        .json(&json!({}))
        .send(&make_service(requests))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));

        let body: serde_json::Value = res.take_json().await?;
        assert_eq!(body["error"]["code"], "not_pending");

        Ok(())
    }

    #[tokio::test]
    async fn test_allocation_exceeded_returns_409() -> TestResult {
        let mut requests = MockRequestsService::new();

        requests
            .expect_approve()
            .once()
            .return_once(|_, _, _| Err(RequestsServiceError::AllocationExceeded));

        let mut res = TestClient::post(format!(
            "http://example.com/vacations/{}/approve",
            Uuid::nil()
        ))
        .json(&json!({}))
        .send(&make_service(requests))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));

        let body: serde_json::Value = res.take_json().await?;
        assert_eq!(body["error"]["code"], "allocation_exceeded");

        Ok(())
    }
}
