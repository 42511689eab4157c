//! Invite response shape.

use furlough_app::domain::sessions::records::InviteTokenRecord;
use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invite metadata; never carries token material.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct InviteResponse {
    pub uuid: Uuid,
    pub email: String,
    pub role: String,
    pub function_uuid: Option<Uuid>,
    pub team_uuids: Vec<Uuid>,
    pub expires_at: String,
    pub used_at: Option<String>,
    pub created_at: String,
}

impl From<InviteTokenRecord> for InviteResponse {
    fn from(invite: InviteTokenRecord) -> Self {
        Self {
            uuid: invite.uuid.into_uuid(),
            email: invite.email,
            role: invite.role.as_str().to_string(),
            function_uuid: invite.function_uuid.map(Into::into),
            team_uuids: invite.team_uuids.into_iter().map(Into::into).collect(),
            expires_at: invite.expires_at.to_string(),
            used_at: invite.used_at.map(|at| at.to_string()),
            created_at: invite.created_at.to_string(),
        }
    }
}
