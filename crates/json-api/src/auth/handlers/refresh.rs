//! Refresh Handler

use std::sync::Arc;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{
        errors::into_api_error,
        handlers::{REFRESH_COOKIE, clear_refresh_cookie, set_refresh_cookie},
    },
    errors::ApiError,
    extensions::{DepotExt, client_meta},
    state::State,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Refresh Handler
///
/// Rotates the refresh cookie: the presented token is revoked and a new
/// one is issued. Replaying an already-rotated token revokes every session.
#[endpoint(
    tags("auth"),
    summary = "Exchange the refresh cookie for fresh tokens",
    responses(
        (status_code = StatusCode::OK, description = "Tokens rotated"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Missing, expired, or replayed token"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<RefreshResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let Some(presented) = req.cookie(REFRESH_COOKIE).map(|cookie| cookie.value().to_string())
    else {
        return Err(ApiError::unauthenticated());
    };

    let tokens = match state.app.sessions.refresh(&presented, client_meta(req)).await {
        Ok(tokens) => tokens,
        Err(error) => {
            // Whatever went wrong, the cookie is no longer usable.
            clear_refresh_cookie(res);

            return Err(into_api_error(error));
        }
    };

    set_refresh_cookie(res, &tokens, state.app.clock.now());

    Ok(Json(RefreshResponse {
        access_token: tokens.access_token,
        token_type: "bearer".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use furlough_app::domain::sessions::{MockSessionsService, SessionsServiceError};
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use crate::test_helpers::{make_session_tokens, public_service};

    use super::*;

    fn make_service(sessions: MockSessionsService) -> Service {
        public_service(sessions, Router::with_path("auth/refresh").post(handler))
    }

    #[tokio::test]
    async fn test_refresh_without_cookie_returns_401() -> TestResult {
        let mut sessions = MockSessionsService::new();

        sessions.expect_refresh().never();

        let res = TestClient::post("http://example.com/auth/refresh")
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_rotates_cookie() -> TestResult {
        let tokens = make_session_tokens();
        let fresh_refresh = tokens.refresh_token.clone();

        let mut sessions = MockSessionsService::new();

        sessions
            .expect_refresh()
            .once()
            .withf(|presented, _meta| presented == "stale-token")
            .return_once(move |_, _| Ok(tokens));

        let mut res = TestClient::post("http://example.com/auth/refresh")
            .add_header("cookie", "furlough_refresh=stale-token", true)
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let set_cookie = res
            .headers()
            .get("set-cookie")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        assert!(set_cookie.contains(&fresh_refresh));

        let body: RefreshResponse = res.take_json().await?;
        assert!(!body.access_token.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_replayed_token_returns_401_and_clears_cookie() -> TestResult {
        let mut sessions = MockSessionsService::new();

        sessions
            .expect_refresh()
            .once()
            .return_once(|_, _| Err(SessionsServiceError::RefreshReplayDetected));

        let mut res = TestClient::post("http://example.com/auth/refresh")
            .add_header("cookie", "furlough_refresh=replayed", true)
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        let body: serde_json::Value = res.take_json().await?;
        assert_eq!(body["error"]["code"], "refresh_replay_detected");

        let set_cookie = res
            .headers()
            .get("set-cookie")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        assert!(set_cookie.contains("furlough_refresh="));
        assert!(set_cookie.contains("Max-Age=0"));

        Ok(())
    }
}
