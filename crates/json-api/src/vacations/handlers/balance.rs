//! Balance Handler

use std::sync::Arc;

use furlough_app::domain::users::records::UserUuid;
use salvo::prelude::*;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    extensions::DepotExt,
    periods::errors::into_api_error,
    state::State,
    vacations::models::BalanceResponse,
};

/// Balance Handler
///
/// Projection over every allocated period for the caller (or, for
/// managers and admins, a user in scope via `?user=`). An empty list means
/// no allocations yet.
#[endpoint(
    tags("vacations"),
    summary = "Vacation balance per period",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Balance entries"),
        (status_code = StatusCode::NOT_FOUND, description = "Target user out of scope"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<BalanceResponse>>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    let target = req
        .query::<Uuid>("user")
        .map_or(principal.user_uuid, UserUuid::from_uuid);

    let entries = state
        .app
        .calendar
        .balance_for_user(&principal, target)
        .await
        .map_err(into_api_error)?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use furlough_app::domain::periods::MockCalendarService;
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use crate::test_helpers::calendar_service;

    use super::*;

    #[tokio::test]
    async fn test_balance_with_no_allocations_is_empty_list() -> TestResult {
        let mut calendar = MockCalendarService::new();

        calendar
            .expect_balance_for_user()
            .once()
            .return_once(|_, _| Ok(Vec::new()));

        let service =
            calendar_service(calendar, Router::with_path("vacations/balance").get(handler));

        let mut res = TestClient::get("http://example.com/vacations/balance")
            .send(&service)
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: Vec<BalanceResponse> = res.take_json().await?;
        assert!(body.is_empty());

        Ok(())
    }
}
