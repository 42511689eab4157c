//! Identity service.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use serde_json::json;

use crate::{
    authz::{self, Action, Operation, Principal, Resource},
    database::Db,
    domain::{
        audit::{records::AuditAction, records::NewAuditEvent, repository::PgAuditRepository},
        sessions::repository::PgSessionsRepository,
        users::{
            errors::IdentityServiceError,
            records::{Role, UserFilter, UserPatch, UserRecord, UserUuid},
            repository::PgUsersRepository,
        },
    },
    password::PasswordHasher,
};

const MAX_PAGE_SIZE: i64 = 200;

#[derive(Clone)]
pub struct PgIdentityService {
    db: Db,
    users: PgUsersRepository,
    sessions: PgSessionsRepository,
    audit: PgAuditRepository,
    hasher: Arc<PasswordHasher>,
}

impl PgIdentityService {
    #[must_use]
    pub fn new(db: Db, hasher: Arc<PasswordHasher>) -> Self {
        Self {
            db,
            users: PgUsersRepository::new(),
            sessions: PgSessionsRepository::new(),
            audit: PgAuditRepository::new(),
            hasher,
        }
    }

    async fn verify_offloaded(
        &self,
        encoded: String,
        password: String,
    ) -> Result<crate::password::Verified, IdentityServiceError> {
        let hasher = Arc::clone(&self.hasher);

        tokio::task::spawn_blocking(move || hasher.verify(&encoded, &password))
            .await
            .map_err(IdentityServiceError::Join)?
            .map_err(IdentityServiceError::from)
    }

    async fn hash_offloaded(&self, password: String) -> Result<String, IdentityServiceError> {
        let hasher = Arc::clone(&self.hasher);

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(IdentityServiceError::Join)?
            .map_err(IdentityServiceError::from)
    }

    /// Burn hashing time so unknown emails are not cheaper than wrong
    /// passwords.
    async fn dummy_verify_offloaded(&self, password: String) {
        let hasher = Arc::clone(&self.hasher);

        let _result = tokio::task::spawn_blocking(move || hasher.dummy_verify(&password)).await;
    }
}

#[async_trait]
impl IdentityService for PgIdentityService {
    async fn resolve_principal(&self, user: UserUuid) -> Result<Principal, IdentityServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self
            .users
            .find_for_principal(&mut tx, user)
            .await?
            .ok_or(IdentityServiceError::NotAuthenticated)?;

        let managed_teams = if record.role == Role::Manager {
            self.users
                .list_managed_team_uuids(&mut tx, record.uuid)
                .await?
                .into_iter()
                .collect()
        } else {
            std::collections::HashSet::new()
        };

        tx.commit().await?;

        Ok(Principal {
            user_uuid: record.uuid,
            company_uuid: record.company_uuid,
            role: record.role,
            managed_teams,
        })
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, IdentityServiceError> {
        let mut tx = self.db.begin().await?;

        let Some(user) = self.users.find_active_by_email(&mut tx, email).await? else {
            self.dummy_verify_offloaded(password.to_string()).await;
            return Err(IdentityServiceError::InvalidCredential);
        };

        let Some(stored_hash) = user.password_hash.clone() else {
            self.dummy_verify_offloaded(password.to_string()).await;
            return Err(IdentityServiceError::InvalidCredential);
        };

        let verified = self
            .verify_offloaded(stored_hash, password.to_string())
            .await?;

        if verified.needs_rehash {
            let fresh = self.hash_offloaded(password.to_string()).await?;
            self.users.set_password_hash(&mut tx, user.uuid, &fresh).await?;
        }

        self.users.touch_last_login(&mut tx, user.uuid).await?;

        tx.commit().await?;

        Ok(user)
    }

    async fn get_user(
        &self,
        principal: &Principal,
        user: UserUuid,
    ) -> Result<UserRecord, IdentityServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::User, Action::Read))?;
        let binds = scope.user_predicate_binds();

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let record = self
            .users
            .find_by_uuid(&mut tx, scope.company, user, &binds)
            .await?
            .ok_or(IdentityServiceError::NotFound)?;

        tx.commit().await?;

        Ok(record)
    }

    async fn list_users(
        &self,
        principal: &Principal,
        filter: UserFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserRecord>, IdentityServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::User, Action::List))?;
        let binds = scope.user_predicate_binds();

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let users = self
            .users
            .list(
                &mut tx,
                scope.company,
                &binds,
                &filter,
                limit.clamp(1, MAX_PAGE_SIZE),
                offset.max(0),
            )
            .await?;

        tx.commit().await?;

        Ok(users)
    }

    async fn update_user(
        &self,
        principal: &Principal,
        user: UserUuid,
        patch: UserPatch,
    ) -> Result<UserRecord, IdentityServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::User, Action::Update))?;

        if !principal.is_admin() {
            if user != principal.user_uuid {
                return Err(IdentityServiceError::NotAuthorized);
            }

            // Self-service covers names only; role, activation, and
            // function moves stay with admins.
            if patch.role.is_some() || patch.is_active.is_some() || patch.function_uuid.is_some() {
                return Err(IdentityServiceError::NotAuthorized);
            }
        }

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let before = self
            .users
            .find_by_uuid(&mut tx, scope.company, user, &scope.user_predicate_binds())
            .await?
            .ok_or(IdentityServiceError::NotFound)?;

        let after = self
            .users
            .update_user(&mut tx, scope.company, user, &patch)
            .await?
            .ok_or(IdentityServiceError::NotFound)?;

        let action = if patch.role.is_some() && before.role != after.role {
            AuditAction::RoleChanged
        } else {
            AuditAction::UserUpdated
        };

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    action,
                    "user",
                    Some(user.into_uuid()),
                )
                .with_before(json!({
                    "role": before.role,
                    "is_active": before.is_active,
                    "first_name": before.first_name,
                    "last_name": before.last_name,
                }))
                .with_after(json!({
                    "role": after.role,
                    "is_active": after.is_active,
                    "first_name": after.first_name,
                    "last_name": after.last_name,
                })),
            )
            .await?;

        tx.commit().await?;

        Ok(after)
    }

    async fn soft_delete_user(
        &self,
        principal: &Principal,
        user: UserUuid,
    ) -> Result<(), IdentityServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::User, Action::Delete))?;

        if user == principal.user_uuid {
            // Admins cannot delete themselves out of the tenant.
            return Err(IdentityServiceError::NotAuthorized);
        }

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let deleted = self
            .users
            .soft_delete(&mut tx, scope.company, user)
            .await?
            .ok_or(IdentityServiceError::NotFound)?;

        self.sessions.revoke_all_for_user(&mut tx, user).await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::UserDeactivated,
                    "user",
                    Some(user.into_uuid()),
                )
                .with_before(json!({ "is_active": true, "email": deleted.email }))
                .with_after(json!({ "is_active": false, "deleted": true })),
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Build the per-request principal: current role and managed-team set,
    /// read fresh from storage. Token claims are never trusted for this.
    async fn resolve_principal(&self, user: UserUuid) -> Result<Principal, IdentityServiceError>;

    /// Verify credentials for an active, non-deleted user. Performs a dummy
    /// hash verification when the email is unknown so response timing does
    /// not reveal account existence. Persists a re-hash when the stored
    /// parameters are weaker than current policy.
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, IdentityServiceError>;

    async fn get_user(
        &self,
        principal: &Principal,
        user: UserUuid,
    ) -> Result<UserRecord, IdentityServiceError>;

    async fn list_users(
        &self,
        principal: &Principal,
        filter: UserFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserRecord>, IdentityServiceError>;

    /// Admins update anyone in the company; everyone else updates their own
    /// names only.
    async fn update_user(
        &self,
        principal: &Principal,
        user: UserUuid,
        patch: UserPatch,
    ) -> Result<UserRecord, IdentityServiceError>;

    /// Admin-only. Sets the deletion timestamp, deactivates the account,
    /// and revokes every refresh token. Historical rows keep referring to
    /// the user.
    async fn soft_delete_user(
        &self,
        principal: &Principal,
        user: UserUuid,
    ) -> Result<(), IdentityServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test::TestContext;

    use super::*;

    #[tokio::test]
    async fn authenticate_rejects_wrong_password_and_unknown_email() {
        let ctx = TestContext::new().await;
        ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;

        let wrong = ctx.app.identity.authenticate("alice@co.example", "WrongPassword1!").await;
        assert!(matches!(wrong, Err(IdentityServiceError::InvalidCredential)), "{wrong:?}");

        let unknown = ctx.app.identity.authenticate("ghost@co.example", "Str0ng!Passw0rd!").await;
        assert!(matches!(unknown, Err(IdentityServiceError::InvalidCredential)), "{unknown:?}");
    }

    #[tokio::test]
    async fn authenticate_touches_last_login() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        assert!(user.last_login_at.is_none());

        ctx.app.identity.authenticate("alice@co.example", "Str0ng!Passw0rd!").await?;

        let principal = ctx.principal(&user, &[]);
        let fresh = ctx.app.identity.get_user(&principal, user.uuid).await?;

        assert!(fresh.last_login_at.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn soft_deleted_users_cannot_resolve_a_principal() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let target = ctx.create_user("bob@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let admin_principal = ctx.principal(&admin, &[]);

        assert!(ctx.app.identity.resolve_principal(target.uuid).await.is_ok());

        ctx.app.identity.soft_delete_user(&admin_principal, target.uuid).await?;

        let resolved = ctx.app.identity.resolve_principal(target.uuid).await;
        assert!(matches!(resolved, Err(IdentityServiceError::NotAuthenticated)), "{resolved:?}");

        // The login path is closed too.
        let login = ctx.app.identity.authenticate("bob@co.example", "Str0ng!Passw0rd!").await;
        assert!(matches!(login, Err(IdentityServiceError::InvalidCredential)), "{login:?}");

        Ok(())
    }

    #[tokio::test]
    async fn deleting_a_user_frees_the_email_for_reuse() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let target = ctx.create_user("bob@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let admin_principal = ctx.principal(&admin, &[]);

        ctx.app.identity.soft_delete_user(&admin_principal, target.uuid).await?;

        // Email uniqueness holds among live rows only.
        let replacement = ctx.create_user("bob@co.example", Role::User, "Str0ng!Passw0rd!").await;

        assert_ne!(replacement.uuid, target.uuid);

        Ok(())
    }

    #[tokio::test]
    async fn managers_list_their_team_members_plus_themselves() -> TestResult {
        let ctx = TestContext::new().await;
        let team = ctx.create_team("core").await;

        let manager = ctx.create_user("m1@co.example", Role::Manager, "Str0ng!Passw0rd!").await;
        let member = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let outsider = ctx.create_user("eve@co.example", Role::User, "Str0ng!Passw0rd!").await;

        ctx.add_member(team, member.uuid).await;

        let principal = ctx.principal(&manager, &[team]);

        let visible = ctx
            .app
            .identity
            .list_users(&principal, UserFilter::default(), 50, 0)
            .await?;

        let uuids: Vec<_> = visible.iter().map(|user| user.uuid).collect();

        assert!(uuids.contains(&member.uuid));
        assert!(uuids.contains(&manager.uuid), "managers see themselves");
        assert!(!uuids.contains(&outsider.uuid));

        Ok(())
    }

    #[tokio::test]
    async fn plain_users_list_only_themselves() -> TestResult {
        let ctx = TestContext::new().await;
        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        ctx.create_user("bob@co.example", Role::User, "Str0ng!Passw0rd!").await;

        let principal = ctx.principal(&alice, &[]);

        let visible = ctx
            .app
            .identity
            .list_users(&principal, UserFilter::default(), 50, 0)
            .await?;

        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].uuid, alice.uuid);

        Ok(())
    }

    #[tokio::test]
    async fn admins_cannot_delete_themselves() {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&admin, &[]);

        let result = ctx.app.identity.soft_delete_user(&principal, admin.uuid).await;

        assert!(matches!(result, Err(IdentityServiceError::NotAuthorized)), "{result:?}");
    }
}
