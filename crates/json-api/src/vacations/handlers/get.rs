//! Get Vacation Request Handler

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

/// Get Vacation Request Handler
#[endpoint(
    tags("vacations"),
    summary = "Fetch one vacation request in scope",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Request"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown, foreign, or out of scope"),
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
        .get(&principal, RequestUuid::from_uuid(request.into_inner()))
        .await
        .map_err(into_api_error)?;

    Ok(Json(record.into()))
}

#[cfg(test)]
mod tests {
    use furlough_app::domain::requests::{MockRequestsService, RequestsServiceError};
    use salvo::test::TestClient;
    use testresult::TestResult;
    use uuid::Uuid;

    use crate::test_helpers::requests_service;

    use super::*;

    #[tokio::test]
    async fn test_foreign_request_returns_404() -> TestResult {
        let mut requests = MockRequestsService::new();

        requests
            .expect_get()
            .once()
            .return_once(|_, _| Err(RequestsServiceError::NotFound));

        let service =
            requests_service(requests, Router::with_path("vacations/{request}").get(handler));

        let res = TestClient::get(format!("http://example.com/vacations/{}", Uuid::nil()))
            .send(&service)
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
