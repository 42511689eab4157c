//! Revoke Invite Handler

use std::sync::Arc;

use furlough_app::domain::sessions::records::InviteTokenUuid;
use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{auth::errors::into_api_error, errors::ApiError, extensions::DepotExt, state::State};

/// Revoke Invite Handler
#[endpoint(
    tags("invites"),
    summary = "Revoke an unused invite (admin)",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::NO_CONTENT, description = "Invite revoked"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown or already used"),
    ),
)]
pub(crate) async fn handler(
    invite: PathParam<Uuid>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();

    state
        .app
        .sessions
        .revoke_invite(&principal, InviteTokenUuid::from_uuid(invite.into_inner()))
        .await
        .map_err(into_api_error)?;

    res.status_code(StatusCode::NO_CONTENT);

    Ok(())
}
