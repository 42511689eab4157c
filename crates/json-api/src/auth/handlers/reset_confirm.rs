//! Password Reset Confirm Handler

use std::sync::Arc;

use furlough_app::rategate::RateCategory;
use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::errors::into_api_error,
    errors::ApiError,
    extensions::{DepotExt, client_ip},
    state::State,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ResetConfirmBody {
    pub token: String,
    pub password: String,
}

/// Password Reset Confirm Handler
#[endpoint(
    tags("auth"),
    summary = "Set a new password with a reset token",
    responses(
        (status_code = StatusCode::NO_CONTENT, description = "Password updated, sessions revoked"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid token or weak password"),
        (status_code = StatusCode::TOO_MANY_REQUESTS, description = "Rate limited"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<ResetConfirmBody>,
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let body = json.into_inner();

    let decision = state
        .app
        .rategate
        .check_and_record(RateCategory::PasswordResetConfirm, &client_ip(req));

    let _ = res.add_header("X-RateLimit-Remaining", decision.remaining.to_string(), true);

    if !decision.allowed {
        return Err(ApiError::rate_limited(decision.retry_after_secs));
    }

    state
        .app
        .sessions
        .confirm_password_reset(&body.token, &body.password)
        .await
        .map_err(into_api_error)?;

    res.status_code(StatusCode::NO_CONTENT);

    Ok(())
}
