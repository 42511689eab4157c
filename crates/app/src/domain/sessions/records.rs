//! Session token records.

use jiff::Timestamp;

use crate::{
    domain::{
        companies::records::CompanyUuid,
        teams::records::{FunctionUuid, TeamUuid},
        users::records::{Role, UserRecord, UserUuid},
    },
    uuids::TypedUuid,
};

/// Refresh lifetime for ordinary sessions.
pub const REFRESH_TTL_DAYS: i64 = 7;

/// Refresh lifetime when the client asked to be remembered.
pub const REMEMBER_ME_TTL_DAYS: i64 = 30;

/// Invites stay valid for a week.
pub const INVITE_TTL_DAYS: i64 = 7;

/// Password-reset links die after an hour.
pub const RESET_TTL_SECS: i64 = 3600;

pub type RefreshTokenUuid = TypedUuid<RefreshTokenRecord>;
pub type InviteTokenUuid = TypedUuid<InviteTokenRecord>;
pub type ResetTokenUuid = TypedUuid<PasswordResetTokenRecord>;

/// One refresh token. The uuid doubles as the jti embedded in the opaque
/// token so an individual session can be revoked without touching others.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub uuid: RefreshTokenUuid,
    pub user_uuid: UserUuid,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
    pub last_used_at: Option<Timestamp>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub is_remember_me: bool,
    pub created_at: Timestamp,
}

impl RefreshTokenRecord {
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone)]
pub struct InviteTokenRecord {
    pub uuid: InviteTokenUuid,
    pub token_hash: String,
    pub company_uuid: CompanyUuid,
    pub function_uuid: Option<FunctionUuid>,
    pub team_uuids: Vec<TeamUuid>,
    pub email: String,
    pub role: Role,
    pub invited_by: Option<UserUuid>,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct PasswordResetTokenRecord {
    pub uuid: ResetTokenUuid,
    pub token_hash: String,
    pub user_uuid: UserUuid,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Request metadata recorded with session writes.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// What a successful login or refresh hands back.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,

    /// Raw opaque refresh token; shown once, only its digest is stored.
    pub refresh_token: String,

    pub refresh_expires_at: Timestamp,
    pub user: UserRecord,
}

/// Invite parameters chosen by the issuing admin.
#[derive(Debug, Clone)]
pub struct InviteInput {
    pub email: String,
    pub role: Role,
    pub function_uuid: Option<FunctionUuid>,
    pub team_uuids: Vec<TeamUuid>,
}

/// An issued invite: the record plus the raw token for the invite mail.
#[derive(Debug, Clone)]
pub struct IssuedInvite {
    pub invite: InviteTokenRecord,
    pub token: String,
}
