//! Audit event records.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    domain::{companies::records::CompanyUuid, users::records::UserUuid},
    uuids::TypedUuid,
};

pub type AuditEventUuid = TypedUuid<AuditEventRecord>;

/// Stable action codes. Serialized as snake_case strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    LoginSucceeded,
    PasswordChanged,
    PasswordReset,
    RefreshReplayDetected,
    AccessDenied,
    UserInvited,
    InviteRevoked,
    UserCreated,
    UserUpdated,
    UserDeactivated,
    RoleChanged,
    CompanyUpdated,
    FunctionCreated,
    FunctionUpdated,
    FunctionDeleted,
    TeamCreated,
    TeamUpdated,
    TeamDeleted,
    MemberAdded,
    MemberRemoved,
    ManagerAssigned,
    ManagerRemoved,
    PeriodCreated,
    PeriodUpdated,
    AllocationUpserted,
    RequestSubmitted,
    RequestModified,
    RequestApproved,
    RequestRejected,
    RequestCancelled,
    RequestWithdrawn,
}

impl AuditAction {
    /// # Errors
    ///
    /// Returns the raw input when it is not a known action code.
    pub fn parse(value: &str) -> Result<Self, String> {
        serde_json::from_value(Value::String(value.to_string()))
            .map_err(|_source| value.to_string())
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoginSucceeded => "login_succeeded",
            Self::PasswordChanged => "password_changed",
            Self::PasswordReset => "password_reset",
            Self::RefreshReplayDetected => "refresh_replay_detected",
            Self::AccessDenied => "access_denied",
            Self::UserInvited => "user_invited",
            Self::InviteRevoked => "invite_revoked",
            Self::UserCreated => "user_created",
            Self::UserUpdated => "user_updated",
            Self::UserDeactivated => "user_deactivated",
            Self::RoleChanged => "role_changed",
            Self::CompanyUpdated => "company_updated",
            Self::FunctionCreated => "function_created",
            Self::FunctionUpdated => "function_updated",
            Self::FunctionDeleted => "function_deleted",
            Self::TeamCreated => "team_created",
            Self::TeamUpdated => "team_updated",
            Self::TeamDeleted => "team_deleted",
            Self::MemberAdded => "member_added",
            Self::MemberRemoved => "member_removed",
            Self::ManagerAssigned => "manager_assigned",
            Self::ManagerRemoved => "manager_removed",
            Self::PeriodCreated => "period_created",
            Self::PeriodUpdated => "period_updated",
            Self::AllocationUpserted => "allocation_upserted",
            Self::RequestSubmitted => "request_submitted",
            Self::RequestModified => "request_modified",
            Self::RequestApproved => "request_approved",
            Self::RequestRejected => "request_rejected",
            Self::RequestCancelled => "request_cancelled",
            Self::RequestWithdrawn => "request_withdrawn",
        }
    }
}

/// Immutable once written.
#[derive(Debug, Clone)]
pub struct AuditEventRecord {
    pub uuid: AuditEventUuid,
    pub company_uuid: CompanyUuid,
    pub actor_uuid: Option<UserUuid>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_uuid: Option<Uuid>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    pub company_uuid: CompanyUuid,
    pub actor_uuid: Option<UserUuid>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_uuid: Option<Uuid>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl NewAuditEvent {
    /// Minimal event: actor did action on entity, no snapshots.
    #[must_use]
    pub fn new(
        company_uuid: CompanyUuid,
        actor_uuid: Option<UserUuid>,
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_uuid: Option<Uuid>,
    ) -> Self {
        Self {
            company_uuid,
            actor_uuid,
            action,
            entity_type: entity_type.into(),
            entity_uuid,
            before: None,
            after: None,
            ip: None,
            user_agent: None,
        }
    }

    #[must_use]
    pub fn with_before(mut self, before: Value) -> Self {
        self.before = Some(before);
        self
    }

    #[must_use]
    pub fn with_after(mut self, after: Value) -> Self {
        self.after = Some(after);
        self
    }
}

/// Query filter; unset fields match everything. The company bound comes
/// from the caller's scope, never from the filter.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor_uuid: Option<UserUuid>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    pub entity_uuid: Option<Uuid>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}
