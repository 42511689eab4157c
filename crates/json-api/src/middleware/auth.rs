//! Auth middleware.
//!
//! Verifies the bearer access token and builds the request [`Principal`]
//! with the role and managed-team set re-read from storage. Routes behind
//! this hoop can rely on `depot.principal_or_401()` succeeding.

use std::sync::Arc;

use furlough_app::domain::sessions::SessionsServiceError;
use salvo::{http::header::AUTHORIZATION, prelude::*};
use tracing::error;

use crate::{errors::ApiError, extensions::DepotExt, state::State};

#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let Some(token) = extract_bearer_token(req) else {
        ApiError::unauthenticated().write(req, depot, res).await;
        ctrl.skip_rest();

        return;
    };

    let state = match depot.obtain::<Arc<State>>() {
        Ok(state) => Arc::clone(state),
        Err(_error) => {
            ApiError::internal().write(req, depot, res).await;
            ctrl.skip_rest();

            return;
        }
    };

    let principal = match state.app.sessions.authenticate_access(token).await {
        Ok(principal) => principal,
        Err(SessionsServiceError::Expired) => {
            ApiError::new(StatusCode::UNAUTHORIZED, "token_expired", "Access token expired")
                .write(req, depot, res)
                .await;
            ctrl.skip_rest();

            return;
        }
        Err(SessionsServiceError::NotAuthenticated) => {
            ApiError::unauthenticated().write(req, depot, res).await;
            ctrl.skip_rest();

            return;
        }
        Err(source) => {
            error!("failed to authenticate access token: {source}");

            ApiError::internal().write(req, depot, res).await;
            ctrl.skip_rest();

            return;
        }
    };

    depot.insert_principal(principal);

    ctrl.call_next(req, depot, res).await;
}

fn extract_bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.splitn(2, ' ');

    let scheme = parts.next()?;
    let token = parts.next()?.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }

    Some(token)
}
