//! Update User Handler

use std::{str::FromStr, sync::Arc};

use furlough_app::domain::{
    teams::records::FunctionUuid,
    users::records::{Role, UserPatch, UserUuid},
};
use salvo::{
    oapi::{ToSchema, extract::JsonBody, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::ApiError, extensions::DepotExt, state::State, users::errors::into_api_error,
    users::models::UserResponse,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub function_uuid: Option<Uuid>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// Update User Handler
///
/// Admins change anything; everyone else is limited to their own names.
#[endpoint(
    tags("users"),
    summary = "Update a user",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Updated user"),
        (status_code = StatusCode::FORBIDDEN, description = "Field or target out of scope"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown or out of scope"),
    ),
)]
pub(crate) async fn handler(
    user: PathParam<Uuid>,
    json: JsonBody<UpdateUserRequest>,
    depot: &mut Depot,
) -> Result<Json<UserResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();
    let body = json.into_inner();

    let patch = UserPatch {
        first_name: body.first_name,
        last_name: body.last_name,
        function_uuid: body.function_uuid.map(FunctionUuid::from_uuid),
        role: body
            .role
            .map(|raw| Role::from_str(&raw))
            .transpose()
            .map_err(|_error| ApiError::bad_request("invalid_input", "Unknown role"))?,
        is_active: body.is_active,
    };

    let record = state
        .app
        .identity
        .update_user(&principal, UserUuid::from_uuid(user.into_inner()), patch)
        .await
        .map_err(into_api_error)?;

    Ok(Json(record.into()))
}

#[cfg(test)]
mod tests {
    use furlough_app::domain::users::{IdentityServiceError, MockIdentityService};
    use salvo::test::TestClient;
    use serde_json::json;
    use testresult::TestResult;
    use uuid::Uuid;

    use crate::test_helpers::identity_service;

    use super::*;

    #[tokio::test]
    async fn test_role_change_by_non_admin_returns_403() -> TestResult {
        let mut identity = MockIdentityService::new();

        identity
            .expect_update_user()
            .once()
            .return_once(|_, _, _| Err(IdentityServiceError::NotAuthorized));

        let service = identity_service(identity, Router::with_path("users/{user}").put(handler));

        let res = TestClient::put(format!("http://example.com/users/{}", Uuid::nil()))
            .json(&json!({ "role": "admin" }))
            .send(&service)
            .await;

        assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));

        Ok(())
    }
}
