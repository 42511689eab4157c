//! Password Reset Request Handler

use std::sync::Arc;

use furlough_app::rategate::RateCategory;
use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::errors::into_api_error, errors::ApiError, extensions::DepotExt, state::State,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ResetRequestBody {
    pub email: String,
}

/// Password Reset Request Handler
///
/// Always answers 204 whether or not the email exists.
#[endpoint(
    tags("auth"),
    summary = "Request a password reset mail",
    responses(
        (status_code = StatusCode::NO_CONTENT, description = "Reset mail queued if the account exists"),
        (status_code = StatusCode::TOO_MANY_REQUESTS, description = "Rate limited"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<ResetRequestBody>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let body = json.into_inner();

    // Reset requests are limited per target email.
    let decision = state
        .app
        .rategate
        .check_and_record(RateCategory::PasswordResetRequest, &body.email);

    let _ = res.add_header("X-RateLimit-Remaining", decision.remaining.to_string(), true);

    if !decision.allowed {
        return Err(ApiError::rate_limited(decision.retry_after_secs));
    }

    state
        .app
        .sessions
        .request_password_reset(&body.email)
        .await
        .map_err(into_api_error)?;

    res.status_code(StatusCode::NO_CONTENT);

    Ok(())
}

#[cfg(test)]
mod tests {
    use furlough_app::domain::sessions::MockSessionsService;
    use salvo::test::TestClient;
    use serde_json::json;
    use testresult::TestResult;

    use crate::test_helpers::public_service;

    use super::*;

    fn make_service(sessions: MockSessionsService) -> Service {
        public_service(
            sessions,
            Router::with_path("auth/password/reset/request").post(handler),
        )
    }

    #[tokio::test]
    async fn test_unknown_email_still_returns_204() -> TestResult {
        let mut sessions = MockSessionsService::new();

        sessions
            .expect_request_password_reset()
            .once()
            .withf(|email| email == "ghost@co.example")
            .return_once(|_| Ok(()));

        let res = TestClient::post("http://example.com/auth/password/reset/request")
            .json(&json!({ "email": "ghost@co.example" }))
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));

        Ok(())
    }

    #[tokio::test]
    async fn test_fourth_request_within_hour_is_limited() -> TestResult {
        let mut sessions = MockSessionsService::new();

        sessions
            .expect_request_password_reset()
            .times(3)
            .returning(|_| Ok(()));

        let service = make_service(sessions);

        for _attempt in 0..3 {
            let res = TestClient::post("http://example.com/auth/password/reset/request")
                .json(&json!({ "email": "alice@co.example" }))
                .send(&service)
                .await;

            assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));
        }

        let res = TestClient::post("http://example.com/auth/password/reset/request")
            .json(&json!({ "email": "alice@co.example" }))
            .send(&service)
            .await;

        assert_eq!(res.status_code, Some(StatusCode::TOO_MANY_REQUESTS));

        Ok(())
    }
}
