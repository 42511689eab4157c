//! Accept Invite Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::errors::into_api_error, errors::ApiError, extensions::DepotExt, state::State,
    users::models::UserResponse,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AcceptInviteRequest {
    pub token: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Accept Invite Handler
///
/// Creates the invited user with the chosen password and consumes the
/// invite in one transaction.
#[endpoint(
    tags("auth"),
    summary = "Accept an invite and create the account",
    responses(
        (status_code = StatusCode::OK, description = "Account created"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid invite or weak password"),
        (status_code = StatusCode::CONFLICT, description = "Email already in use"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<AcceptInviteRequest>,
    depot: &mut Depot,
) -> Result<Json<UserResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let body = json.into_inner();

    let user = state
        .app
        .sessions
        .accept_invite(&body.token, &body.password, &body.first_name, &body.last_name)
        .await
        .map_err(into_api_error)?;

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use furlough_app::domain::sessions::{MockSessionsService, SessionsServiceError};
    use furlough_app::password::{PasswordError, PolicyRule};
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use crate::test_helpers::{make_user, public_service};

    use super::*;

    fn make_service(sessions: MockSessionsService) -> Service {
        public_service(sessions, Router::with_path("auth/invite/accept").post(handler))
    }

    #[tokio::test]
    async fn test_accept_invite_creates_user() -> TestResult {
        let user = make_user("alice@co.example");
        let email = user.email.clone();

        let mut sessions = MockSessionsService::new();

        sessions
            .expect_accept_invite()
            .once()
            .withf(|token, password, first, last| {
                token == "fi_sometoken.abc"
                    && password == "Str0ng!Passw0rd!"
                    && first == "Alice"
                    && last == "Doe"
            })
            .return_once(move |_, _, _, _| Ok(user));

        let mut res = TestClient::post("http://example.com/auth/invite/accept")
            .json(&json!({
                "token": "fi_sometoken.abc",
                "password": "Str0ng!Passw0rd!",
                "first_name": "Alice",
                "last_name": "Doe",
            }))
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: UserResponse = res.take_json().await?;
        assert_eq!(body.email, email);

        Ok(())
    }

    #[tokio::test]
    async fn test_used_invite_returns_400() -> TestResult {
        let mut sessions = MockSessionsService::new();

        sessions
            .expect_accept_invite()
            .once()
            .return_once(|_, _, _, _| Err(SessionsServiceError::InviteInvalid));

        let mut res = TestClient::post("http://example.com/auth/invite/accept")
            .json(&json!({
                "token": "fi_used.abc",
                "password": "Str0ng!Passw0rd!",
                "first_name": "Alice",
                "last_name": "Doe",
            }))
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        let body: serde_json::Value = res.take_json().await?;
        assert_eq!(body["error"]["code"], "invite_invalid");

        Ok(())
    }

    #[tokio::test]
    async fn test_weak_password_reports_first_failing_rule() -> TestResult {
        let mut sessions = MockSessionsService::new();

        sessions.expect_accept_invite().once().return_once(|_, _, _, _| {
            Err(SessionsServiceError::Password(PasswordError::WeakPassword(
                PolicyRule::TooShort,
            )))
        });

        let mut res = TestClient::post("http://example.com/auth/invite/accept")
            .json(&json!({
                "token": "fi_tok.abc",
                "password": "short",
                "first_name": "Alice",
                "last_name": "Doe",
            }))
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        let body: serde_json::Value = res.take_json().await?;
        assert_eq!(body["error"]["code"], "weak_password");

        Ok(())
    }
}
