//! Logout Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    auth::{
        errors::into_api_error,
        handlers::{REFRESH_COOKIE, clear_refresh_cookie},
    },
    errors::ApiError,
    extensions::DepotExt,
    state::State,
};

/// Logout Handler
///
/// Revokes the presented refresh token and clears the cookie. Idempotent:
/// a missing or unknown cookie still logs out successfully.
#[endpoint(
    tags("auth"),
    summary = "Log out and revoke the refresh token",
    responses(
        (status_code = StatusCode::NO_CONTENT, description = "Logged out"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    if let Some(presented) = req.cookie(REFRESH_COOKIE).map(|cookie| cookie.value().to_string()) {
        state
            .app
            .sessions
            .logout(&presented)
            .await
            .map_err(into_api_error)?;
    }

    clear_refresh_cookie(res);
    res.status_code(StatusCode::NO_CONTENT);

    Ok(())
}
