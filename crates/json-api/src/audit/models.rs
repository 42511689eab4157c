//! Audit response shape.

use furlough_app::domain::audit::records::AuditEventRecord;
use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AuditEventResponse {
    pub uuid: Uuid,
    pub actor_uuid: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_uuid: Option<Uuid>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub ip: Option<String>,
    pub created_at: String,
}

impl From<AuditEventRecord> for AuditEventResponse {
    fn from(event: AuditEventRecord) -> Self {
        Self {
            uuid: event.uuid.into_uuid(),
            actor_uuid: event.actor_uuid.map(Into::into),
            action: event.action.as_str().to_string(),
            entity_type: event.entity_type,
            entity_uuid: event.entity_uuid,
            before: event.before,
            after: event.after,
            ip: event.ip,
            created_at: event.created_at.to_string(),
        }
    }
}
