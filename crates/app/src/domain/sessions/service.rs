//! Sessions service: login, rotation, invites, resets.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::{Span, Timestamp};
use mockall::automock;
use serde_json::json;
use tracing::warn;

use crate::{
    authz::{self, Action, Operation, Principal, Resource},
    clock::Clock,
    database::Db,
    domain::{
        audit::{records::AuditAction, records::NewAuditEvent, repository::PgAuditRepository},
        sessions::{
            errors::SessionsServiceError,
            records::{
                ClientMeta, INVITE_TTL_DAYS, InviteInput, InviteTokenRecord, InviteTokenUuid,
                IssuedInvite, REFRESH_TTL_DAYS, REMEMBER_ME_TTL_DAYS, RESET_TTL_SECS,
                RefreshTokenUuid, ResetTokenUuid, SessionTokens,
            },
            repository::{NewRefreshToken, PgSessionsRepository},
        },
        teams::repository::PgOrgRepository,
        users::{
            records::{NewUser, UserRecord, UserUuid},
            repository::PgUsersRepository,
            service::IdentityService,
        },
    },
    mailer::Mailer,
    password::PasswordHasher,
    rategate::RateGate,
    tokens::{AccessTokenCodec, TokenFamily, issue_opaque_token, parse_opaque_token},
};

fn days(n: i64) -> Span {
    Span::new().seconds(n * 86_400)
}

#[derive(Clone)]
pub struct PgSessionsService {
    db: Db,
    sessions: PgSessionsRepository,
    users: PgUsersRepository,
    org: PgOrgRepository,
    audit: PgAuditRepository,
    identity: Arc<dyn IdentityService>,
    hasher: Arc<PasswordHasher>,
    codec: AccessTokenCodec,
    rategate: Arc<RateGate>,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn Mailer>,
}

impl PgSessionsService {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        db: Db,
        identity: Arc<dyn IdentityService>,
        hasher: Arc<PasswordHasher>,
        codec: AccessTokenCodec,
        rategate: Arc<RateGate>,
        clock: Arc<dyn Clock>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            sessions: PgSessionsRepository::new(),
            users: PgUsersRepository::new(),
            org: PgOrgRepository::new(),
            audit: PgAuditRepository::new(),
            identity,
            hasher,
            codec,
            rategate,
            clock,
            mailer,
        }
    }

    async fn hash_offloaded(&self, password: String) -> Result<String, SessionsServiceError> {
        let hasher = Arc::clone(&self.hasher);

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(SessionsServiceError::Join)?
            .map_err(SessionsServiceError::from)
    }

    async fn verify_offloaded(
        &self,
        encoded: String,
        password: String,
    ) -> Result<crate::password::Verified, SessionsServiceError> {
        let hasher = Arc::clone(&self.hasher);

        tokio::task::spawn_blocking(move || hasher.verify(&encoded, &password))
            .await
            .map_err(SessionsServiceError::Join)?
            .map_err(SessionsServiceError::from)
    }

    fn refresh_expiry(&self, remember_me: bool) -> Result<Timestamp, SessionsServiceError> {
        let ttl = if remember_me { REMEMBER_ME_TTL_DAYS } else { REFRESH_TTL_DAYS };

        self.clock
            .now()
            .checked_add(days(ttl))
            .map_err(|_overflow| SessionsServiceError::NotAuthenticated)
    }

    /// Mint the access/refresh pair and persist the refresh digest.
    async fn open_session(
        &self,
        tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
        user: &UserRecord,
        meta: &ClientMeta,
        remember_me: bool,
    ) -> Result<SessionTokens, SessionsServiceError> {
        let access_token = self
            .codec
            .sign(user.uuid, user.company_uuid, user.role, self.clock.now())
            .map_err(|_sign| SessionsServiceError::NotAuthenticated)?;

        let issued = issue_opaque_token(TokenFamily::Refresh);
        let expires_at = self.refresh_expiry(remember_me)?;

        self.sessions
            .insert_refresh_token(
                tx,
                &NewRefreshToken {
                    uuid: RefreshTokenUuid::from_uuid(issued.token_uuid),
                    user_uuid: user.uuid,
                    token_hash: &issued.token_hash,
                    expires_at,
                    user_agent: meta.user_agent.as_deref(),
                    ip: meta.ip.as_deref(),
                    is_remember_me: remember_me,
                },
            )
            .await?;

        Ok(SessionTokens {
            access_token,
            refresh_token: issued.token,
            refresh_expires_at: expires_at,
            user: user.clone(),
        })
    }
}

#[async_trait]
impl SessionsService for PgSessionsService {
    async fn authenticate_access(&self, token: &str) -> Result<Principal, SessionsServiceError> {
        let claims = self
            .codec
            .verify(token, self.clock.now())
            .map_err(|error| match error {
                crate::tokens::AccessTokenError::Expired => SessionsServiceError::Expired,
                _ => SessionsServiceError::NotAuthenticated,
            })?;

        let principal = self
            .identity
            .resolve_principal(claims.user_uuid())
            .await
            .map_err(|_error| SessionsServiceError::NotAuthenticated)?;

        // A token minted for one company never authenticates against
        // another, even if the user row moved.
        if principal.company_uuid != claims.company_uuid() {
            return Err(SessionsServiceError::NotAuthenticated);
        }

        Ok(principal)
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        meta: ClientMeta,
        remember_me: bool,
    ) -> Result<SessionTokens, SessionsServiceError> {
        if let Some(retry_after_secs) = self.rategate.login_locked(email) {
            return Err(SessionsServiceError::LoginLocked { retry_after_secs });
        }

        use crate::domain::users::IdentityServiceError;

        let user = match self.identity.authenticate(email, password).await {
            Ok(user) => user,
            Err(IdentityServiceError::InvalidCredential | IdentityServiceError::NotFound) => {
                // Only genuine credential mismatches count toward the latch.
                self.rategate.record_login_failure(email);

                return Err(SessionsServiceError::InvalidCredential);
            }
            Err(IdentityServiceError::Sql(source)) => return Err(SessionsServiceError::Sql(source)),
            Err(IdentityServiceError::Join(source)) => {
                return Err(SessionsServiceError::Join(source));
            }
            Err(IdentityServiceError::Password(source)) => {
                return Err(SessionsServiceError::Password(source));
            }
            Err(_other) => return Err(SessionsServiceError::InvalidCredential),
        };

        self.rategate.record_login_success(email);

        let mut tx = self.db.begin_company_transaction(user.company_uuid).await?;

        let tokens = self.open_session(&mut tx, &user, &meta, remember_me).await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent {
                    company_uuid: user.company_uuid,
                    actor_uuid: Some(user.uuid),
                    action: AuditAction::LoginSucceeded,
                    entity_type: "user".to_string(),
                    entity_uuid: Some(user.uuid.into_uuid()),
                    before: None,
                    after: None,
                    ip: meta.ip.clone(),
                    user_agent: meta.user_agent.clone(),
                },
            )
            .await?;

        tx.commit().await?;

        Ok(tokens)
    }

    async fn refresh(
        &self,
        presented: &str,
        meta: ClientMeta,
    ) -> Result<SessionTokens, SessionsServiceError> {
        let parsed = parse_opaque_token(presented)
            .map_err(|_parse| SessionsServiceError::NotAuthenticated)?;

        if parsed.family != TokenFamily::Refresh {
            return Err(SessionsServiceError::NotAuthenticated);
        }

        let mut tx = self.db.begin().await?;

        let record = self
            .sessions
            .find_refresh_token_by_hash(&mut tx, parsed.token_hash())
            .await?
            .ok_or(SessionsServiceError::NotAuthenticated)?;

        if record.is_revoked() {
            // Replay of a rotated token means the token leaked somewhere;
            // every session for this user dies now.
            self.sessions.revoke_all_for_user(&mut tx, record.user_uuid).await?;

            if let Some(user) = self.users.find_for_principal(&mut tx, record.user_uuid).await? {
                Db::set_company_context(&mut tx, user.company_uuid).await?;

                self.audit
                    .record(
                        &mut tx,
                        &NewAuditEvent {
                            company_uuid: user.company_uuid,
                            actor_uuid: Some(user.uuid),
                            action: AuditAction::RefreshReplayDetected,
                            entity_type: "refresh_token".to_string(),
                            entity_uuid: Some(record.uuid.into_uuid()),
                            before: None,
                            after: None,
                            ip: meta.ip.clone(),
                            user_agent: meta.user_agent.clone(),
                        },
                    )
                    .await?;
            }

            tx.commit().await?;

            return Err(SessionsServiceError::RefreshReplayDetected);
        }

        if record.is_expired(self.clock.now()) {
            return Err(SessionsServiceError::Expired);
        }

        let decision = self
            .rategate
            .check_and_record(crate::rategate::RateCategory::Refresh, &record.user_uuid.to_string());

        if !decision.allowed {
            return Err(SessionsServiceError::RateLimited {
                retry_after_secs: decision.retry_after_secs,
            });
        }

        let user = self
            .users
            .find_for_principal(&mut tx, record.user_uuid)
            .await?
            .ok_or(SessionsServiceError::NotAuthenticated)?;

        self.sessions.revoke_refresh_token(&mut tx, record.uuid).await?;

        let tokens = self
            .open_session(&mut tx, &user, &meta, record.is_remember_me)
            .await?;

        tx.commit().await?;

        Ok(tokens)
    }

    async fn logout(&self, presented: &str) -> Result<(), SessionsServiceError> {
        let Ok(parsed) = parse_opaque_token(presented) else {
            return Ok(());
        };

        if parsed.family != TokenFamily::Refresh {
            return Ok(());
        }

        let mut tx = self.db.begin().await?;

        if let Some(record) = self
            .sessions
            .find_refresh_token_by_hash(&mut tx, parsed.token_hash())
            .await?
        {
            self.sessions.revoke_refresh_token(&mut tx, record.uuid).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn issue_invite(
        &self,
        principal: &Principal,
        input: InviteInput,
    ) -> Result<IssuedInvite, SessionsServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Invite, Action::Create))?;

        let issued = issue_opaque_token(TokenFamily::Invite);
        let expires_at = self
            .clock
            .now()
            .checked_add(days(INVITE_TTL_DAYS))
            .map_err(|_overflow| SessionsServiceError::NotAuthorized)?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        // Refuse invites for emails that already have a live account.
        if self.users.find_active_by_email(&mut tx, &input.email).await?.is_some() {
            return Err(SessionsServiceError::DuplicateEmail);
        }

        let invite = self
            .sessions
            .insert_invite_token(
                &mut tx,
                InviteTokenUuid::from_uuid(issued.token_uuid),
                &issued.token_hash,
                scope.company,
                &input,
                principal.user_uuid,
                expires_at,
            )
            .await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::UserInvited,
                    "invite",
                    Some(invite.uuid.into_uuid()),
                )
                .with_after(json!({ "email": invite.email, "role": invite.role })),
            )
            .await?;

        tx.commit().await?;

        if let Err(error) = self.mailer.send_invite(&invite.email, &issued.token).await {
            // The invite exists; delivery is best-effort and retried by ops.
            warn!("invite mail delivery failed: {error}");
        }

        Ok(IssuedInvite {
            invite,
            token: issued.token,
        })
    }

    async fn list_invites(
        &self,
        principal: &Principal,
    ) -> Result<Vec<InviteTokenRecord>, SessionsServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Invite, Action::List))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;
        let invites = self.sessions.list_invite_tokens(&mut tx, scope.company).await?;
        tx.commit().await?;

        Ok(invites)
    }

    async fn revoke_invite(
        &self,
        principal: &Principal,
        invite: InviteTokenUuid,
    ) -> Result<(), SessionsServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Invite, Action::Delete))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        if self.sessions.delete_invite_token(&mut tx, scope.company, invite).await? == 0 {
            return Err(SessionsServiceError::NotFound);
        }

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::InviteRevoked,
                    "invite",
                    Some(invite.into_uuid()),
                ),
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn accept_invite(
        &self,
        token: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<UserRecord, SessionsServiceError> {
        let parsed =
            parse_opaque_token(token).map_err(|_parse| SessionsServiceError::InviteInvalid)?;

        if parsed.family != TokenFamily::Invite {
            return Err(SessionsServiceError::InviteInvalid);
        }

        PasswordHasher::check_policy(password)?;

        // Hash before opening the transaction; this burns hundreds of
        // milliseconds and must not hold row locks while it does.
        let password_hash = self.hash_offloaded(password.to_string()).await?;

        let mut tx = self.db.begin().await?;

        let invite = self
            .sessions
            .find_invite_token_by_hash(&mut tx, parsed.token_hash())
            .await?
            .ok_or(SessionsServiceError::InviteInvalid)?;

        if invite.used_at.is_some() || invite.expires_at <= self.clock.now() {
            return Err(SessionsServiceError::InviteInvalid);
        }

        Db::set_company_context(&mut tx, invite.company_uuid).await?;

        let user = self
            .users
            .insert_user(
                &mut tx,
                &NewUser {
                    uuid: UserUuid::new(),
                    company_uuid: invite.company_uuid,
                    function_uuid: invite.function_uuid,
                    email: invite.email.clone(),
                    password_hash: Some(password_hash),
                    first_name: first_name.to_string(),
                    last_name: last_name.to_string(),
                    role: invite.role,
                    is_active: true,
                    email_verified: true,
                },
            )
            .await?;

        for (index, team) in invite.team_uuids.iter().enumerate() {
            self.org
                .insert_membership(&mut tx, user.uuid, *team, index == 0)
                .await?;
        }

        self.sessions.mark_invite_used(&mut tx, invite.uuid).await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    invite.company_uuid,
                    invite.invited_by,
                    AuditAction::UserCreated,
                    "user",
                    Some(user.uuid.into_uuid()),
                )
                .with_after(json!({ "email": user.email, "role": user.role })),
            )
            .await?;

        tx.commit().await?;

        Ok(user)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), SessionsServiceError> {
        let mut tx = self.db.begin().await?;

        // Unknown emails return success too; existence must not leak here.
        let Some(user) = self.users.find_active_by_email(&mut tx, email).await? else {
            tx.commit().await?;
            return Ok(());
        };

        let issued = issue_opaque_token(TokenFamily::PasswordReset);
        let expires_at = self
            .clock
            .now()
            .checked_add(Span::new().seconds(RESET_TTL_SECS))
            .map_err(|_overflow| SessionsServiceError::NotAuthenticated)?;

        self.sessions
            .insert_reset_token(
                &mut tx,
                ResetTokenUuid::from_uuid(issued.token_uuid),
                &issued.token_hash,
                user.uuid,
                expires_at,
            )
            .await?;

        tx.commit().await?;

        if let Err(error) = self.mailer.send_password_reset(&user.email, &issued.token).await {
            warn!("password reset mail delivery failed: {error}");
        }

        Ok(())
    }

    async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), SessionsServiceError> {
        let parsed =
            parse_opaque_token(token).map_err(|_parse| SessionsServiceError::ResetTokenInvalid)?;

        if parsed.family != TokenFamily::PasswordReset {
            return Err(SessionsServiceError::ResetTokenInvalid);
        }

        PasswordHasher::check_policy(new_password)?;

        let password_hash = self.hash_offloaded(new_password.to_string()).await?;

        let mut tx = self.db.begin().await?;

        let reset = self
            .sessions
            .find_reset_token_by_hash(&mut tx, parsed.token_hash())
            .await?
            .ok_or(SessionsServiceError::ResetTokenInvalid)?;

        if reset.used_at.is_some() || reset.expires_at <= self.clock.now() {
            return Err(SessionsServiceError::ResetTokenInvalid);
        }

        let user = self
            .users
            .find_for_principal(&mut tx, reset.user_uuid)
            .await?
            .ok_or(SessionsServiceError::ResetTokenInvalid)?;

        Db::set_company_context(&mut tx, user.company_uuid).await?;

        self.users.set_password_hash(&mut tx, user.uuid, &password_hash).await?;
        self.sessions.mark_reset_token_used(&mut tx, reset.uuid).await?;
        self.sessions.revoke_all_for_user(&mut tx, user.uuid).await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    user.company_uuid,
                    Some(user.uuid),
                    AuditAction::PasswordReset,
                    "user",
                    Some(user.uuid.into_uuid()),
                ),
            )
            .await?;

        tx.commit().await?;

        // A completed reset releases the lockout latch.
        self.rategate.clear_lockout(&user.email);

        Ok(())
    }

    async fn change_password(
        &self,
        principal: &Principal,
        current: &str,
        new_password: &str,
    ) -> Result<(), SessionsServiceError> {
        PasswordHasher::check_policy(new_password)?;

        let mut tx = self.db.begin_company_transaction(principal.company_uuid).await?;

        let user = self
            .users
            .find_for_principal(&mut tx, principal.user_uuid)
            .await?
            .ok_or(SessionsServiceError::NotAuthenticated)?;

        let stored = user
            .password_hash
            .clone()
            .ok_or(SessionsServiceError::InvalidCredential)?;

        self.verify_offloaded(stored, current.to_string()).await?;

        let password_hash = self.hash_offloaded(new_password.to_string()).await?;

        self.users.set_password_hash(&mut tx, user.uuid, &password_hash).await?;

        // A password change invalidates every open session.
        self.sessions.revoke_all_for_user(&mut tx, user.uuid).await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    user.company_uuid,
                    Some(user.uuid),
                    AuditAction::PasswordChanged,
                    "user",
                    Some(user.uuid.into_uuid()),
                ),
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn purge_expired_tokens(&self) -> Result<i64, SessionsServiceError> {
        let mut tx = self.db.begin().await?;
        let purged = self.sessions.delete_expired_tokens(&mut tx).await?;
        tx.commit().await?;

        Ok(purged)
    }
}

#[automock]
#[async_trait]
pub trait SessionsService: Send + Sync {
    /// Verify an access token and build the per-request principal. The
    /// role in the token is a hint only; the principal carries the role
    /// re-read from storage.
    async fn authenticate_access(&self, token: &str) -> Result<Principal, SessionsServiceError>;

    /// Verify credentials and open a session. The lockout latch is checked
    /// before credentials, so a locked account fails the same way for right
    /// and wrong passwords.
    async fn login(
        &self,
        email: &str,
        password: &str,
        meta: ClientMeta,
        remember_me: bool,
    ) -> Result<SessionTokens, SessionsServiceError>;

    /// Rotate a refresh token: revoke the presented one, issue a fresh
    /// pair. Replay of an already-revoked token revokes every session the
    /// user holds.
    async fn refresh(
        &self,
        presented: &str,
        meta: ClientMeta,
    ) -> Result<SessionTokens, SessionsServiceError>;

    /// Revoke the presented refresh token. Unknown or malformed tokens are
    /// ignored; logout is idempotent.
    async fn logout(&self, presented: &str) -> Result<(), SessionsServiceError>;

    /// Admin-only: mint an invite carrying company, role, and team
    /// placement. The raw token is returned once and mailed out.
    async fn issue_invite(
        &self,
        principal: &Principal,
        input: InviteInput,
    ) -> Result<IssuedInvite, SessionsServiceError>;

    async fn list_invites(
        &self,
        principal: &Principal,
    ) -> Result<Vec<InviteTokenRecord>, SessionsServiceError>;

    async fn revoke_invite(
        &self,
        principal: &Principal,
        invite: InviteTokenUuid,
    ) -> Result<(), SessionsServiceError>;

    /// Create the invited user, place them in their teams, and consume the
    /// invite, all in one transaction.
    async fn accept_invite(
        &self,
        token: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<UserRecord, SessionsServiceError>;

    /// Always succeeds from the caller's point of view; whether a mail was
    /// sent must not reveal account existence.
    async fn request_password_reset(&self, email: &str) -> Result<(), SessionsServiceError>;

    /// Consume a reset token, set the new password, revoke all sessions,
    /// and release the lockout latch.
    async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), SessionsServiceError>;

    /// Requires the current password; revokes every refresh token.
    async fn change_password(
        &self,
        principal: &Principal,
        current: &str,
        new_password: &str,
    ) -> Result<(), SessionsServiceError>;

    /// Hygiene pass for the expiry ticker; on-read checks already treat
    /// expired rows as dead.
    async fn purge_expired_tokens(&self) -> Result<i64, SessionsServiceError>;
}
