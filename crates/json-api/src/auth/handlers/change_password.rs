//! Change Password Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::errors::into_api_error, errors::ApiError, extensions::DepotExt, state::State,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ChangePasswordBody {
    pub current_password: String,
    pub new_password: String,
}

/// Change Password Handler
///
/// Authenticated; requires the current password and revokes every open
/// session on success.
#[endpoint(
    tags("auth"),
    summary = "Change the caller's password",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::NO_CONTENT, description = "Password changed"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Current password mismatch"),
        (status_code = StatusCode::BAD_REQUEST, description = "Weak new password"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<ChangePasswordBody>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();
    let body = json.into_inner();

    state
        .app
        .sessions
        .change_password(&principal, &body.current_password, &body.new_password)
        .await
        .map_err(into_api_error)?;

    res.status_code(StatusCode::NO_CONTENT);

    Ok(())
}

#[cfg(test)]
mod tests {
    use furlough_app::domain::sessions::{MockSessionsService, SessionsServiceError};
    use salvo::test::TestClient;
    use serde_json::json;
    use testresult::TestResult;

    use crate::test_helpers::{TEST_PRINCIPAL_UUID, authed_service};

    use super::*;

    fn make_service(sessions: MockSessionsService) -> Service {
        authed_service(
            sessions,
            Router::with_path("auth/password/change").post(handler),
        )
    }

    #[tokio::test]
    async fn test_change_password_requires_current() -> TestResult {
        let mut sessions = MockSessionsService::new();

        sessions
            .expect_change_password()
            .once()
            .withf(|principal, current, new| {
                principal.user_uuid.into_uuid() == TEST_PRINCIPAL_UUID
                    && current == "Old!Passw0rd!!"
                    && new == "N3w!Passw0rd!!"
            })
            .return_once(|_, _, _| Ok(()));

        let res = TestClient::post("http://example.com/auth/password/change")
            .json(&json!({
                "current_password": "Old!Passw0rd!!",
                "new_password": "N3w!Passw0rd!!",
            }))
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));

        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_current_password_returns_401() -> TestResult {
        let mut sessions = MockSessionsService::new();

        sessions
            .expect_change_password()
            .once()
            .return_once(|_, _, _| Err(SessionsServiceError::InvalidCredential));

        let res = TestClient::post("http://example.com/auth/password/change")
            .json(&json!({
                "current_password": "wrong",
                "new_password": "N3w!Passw0rd!!",
            }))
            .send(&make_service(sessions))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }
}
