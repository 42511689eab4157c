//! Login Handler

use std::sync::Arc;

use furlough_app::rategate::RateCategory;
use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{
        errors::into_api_error,
        handlers::set_refresh_cookie,
    },
    errors::ApiError,
    extensions::{DepotExt, client_ip, client_meta},
    state::State,
    users::models::UserResponse,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct LoginRequest {
    pub email: String,
    pub password: String,

    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

/// Login Handler
#[endpoint(
    tags("auth"),
    summary = "Log in with email and password",
    responses(
        (status_code = StatusCode::OK, description = "Session opened"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Invalid credentials"),
        (status_code = StatusCode::LOCKED, description = "Account locked"),
        (status_code = StatusCode::TOO_MANY_REQUESTS, description = "Rate limited"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<LoginRequest>,
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<LoginResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let body = json.into_inner();

    // Login is limited per client address and target email together.
    let rate_key = format!("{}:{}", client_ip(req), body.email);
    let decision = state.app.rategate.check_and_record(RateCategory::Login, &rate_key);

    let _ = res.add_header("X-RateLimit-Remaining", decision.remaining.to_string(), true);

    if !decision.allowed {
        return Err(ApiError::rate_limited(decision.retry_after_secs));
    }

    let tokens = state
        .app
        .sessions
        .login(&body.email, &body.password, client_meta(req), body.remember_me)
        .await
        .map_err(into_api_error)?;

    set_refresh_cookie(res, &tokens, state.app.clock.now());

    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
        token_type: "bearer".to_string(),
        user: tokens.user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use furlough_app::domain::sessions::SessionsServiceError;
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use furlough_app::domain::sessions::MockSessionsService;

    use crate::test_helpers::{make_session_tokens, public_service};

    use super::*;

    fn make_service(sessions: MockSessionsService) -> Service {
        public_service(sessions, Router::with_path("auth/login").post(handler))
    }

    #[tokio::test]
    async fn test_login_success_sets_refresh_cookie() -> TestResult {
        let tokens = make_session_tokens();
        let raw_refresh = tokens.refresh_token.clone();

        let mut sessions = MockSessionsService::new();

        sessions
            .expect_login()
            .once()
            .withf(|email, password, _meta, remember| {
                email == "alice@co.example" && password == "Str0ng!Passw0rd!" && !remember
            })
            .return_once(move |_, _, _, _| Ok(tokens));

        let mut res = TestClient::post("http://example.com/auth/login")
            .json(&json!({ "email": "alice@co.example", "password": "Str0ng!Passw0rd!" }))
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let set_cookie = res
            .headers()
            .get("set-cookie")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        assert!(set_cookie.contains("furlough_refresh="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Strict"));
        assert!(set_cookie.contains(&raw_refresh));

        let body: LoginResponse = res.take_json().await?;
        assert_eq!(body.token_type, "bearer");
        assert!(!body.access_token.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_login_bad_credentials_returns_401() -> TestResult {
        let mut sessions = MockSessionsService::new();

        sessions
            .expect_login()
            .once()
            .return_once(|_, _, _, _| Err(SessionsServiceError::InvalidCredential));

        let mut res = TestClient::post("http://example.com/auth/login")
            .json(&json!({ "email": "alice@co.example", "password": "nope" }))
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        let body: serde_json::Value = res.take_json().await?;
        assert_eq!(body["error"]["code"], "invalid_credential");

        Ok(())
    }

    #[tokio::test]
    async fn test_login_locked_returns_423_with_retry_after() -> TestResult {
        let mut sessions = MockSessionsService::new();

        sessions
            .expect_login()
            .once()
            .return_once(|_, _, _, _| {
                Err(SessionsServiceError::LoginLocked { retry_after_secs: 900 })
            });

        let res = TestClient::post("http://example.com/auth/login")
            .json(&json!({ "email": "mallory@co.example", "password": "anything" }))
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::LOCKED));
        assert_eq!(
            res.headers().get("retry-after").and_then(|v| v.to_str().ok()),
            Some("900"),
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_sixth_rapid_attempt_is_rate_limited() -> TestResult {
        let mut sessions = MockSessionsService::new();

        sessions
            .expect_login()
            .times(5)
            .returning(|_, _, _, _| Err(SessionsServiceError::InvalidCredential));

        let service = make_service(sessions);

        for _attempt in 0..5 {
            let res = TestClient::post("http://example.com/auth/login")
                .json(&json!({ "email": "mallory@co.example", "password": "wrong" }))
                .send(&service)
                .await;

            assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));
        }

        let res = TestClient::post("http://example.com/auth/login")
            .json(&json!({ "email": "mallory@co.example", "password": "wrong" }))
            .send(&service)
            .await;

        assert_eq!(res.status_code, Some(StatusCode::TOO_MANY_REQUESTS));
        assert!(res.headers().contains_key("retry-after"));

        Ok(())
    }
}
