//! Create Invite Handler

use std::{str::FromStr, sync::Arc};

use furlough_app::domain::{
    sessions::records::InviteInput,
    teams::records::{FunctionUuid, TeamUuid},
    users::records::Role,
};
use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::errors::into_api_error, errors::ApiError, extensions::DepotExt,
    invites::models::InviteResponse, state::State,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CreateInviteRequest {
    pub email: String,
    pub role: String,
    pub function_uuid: Option<Uuid>,

    #[serde(default)]
    pub team_uuids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct InviteCreatedResponse {
    pub invite: InviteResponse,

    /// Raw invite token; shown exactly once.
    pub token: String,
}

/// Create Invite Handler
#[endpoint(
    tags("invites"),
    summary = "Issue an invite (admin)",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::CREATED, description = "Invite issued"),
        (status_code = StatusCode::FORBIDDEN, description = "Admin only"),
        (status_code = StatusCode::CONFLICT, description = "Email already in use"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<CreateInviteRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<InviteCreatedResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?.clone();
    let body = json.into_inner();

    let role = Role::from_str(&body.role)
        .map_err(|_error| ApiError::bad_request("invalid_input", "Unknown role"))?;

    let issued = state
        .app
        .sessions
        .issue_invite(
            &principal,
            InviteInput {
                email: body.email,
                role,
                function_uuid: body.function_uuid.map(FunctionUuid::from_uuid),
                team_uuids: body.team_uuids.into_iter().map(TeamUuid::from_uuid).collect(),
            },
        )
        .await
        .map_err(into_api_error)?;

    res.status_code(StatusCode::CREATED);

    Ok(Json(InviteCreatedResponse {
        invite: issued.invite.into(),
        token: issued.token,
    }))
}
