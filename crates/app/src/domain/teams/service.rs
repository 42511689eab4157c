//! Org service.

use async_trait::async_trait;
use mockall::automock;
use serde_json::json;

use crate::{
    authz::{self, Action, Operation, Principal, Resource, UserScope},
    database::Db,
    domain::{
        audit::{records::AuditAction, records::NewAuditEvent, repository::PgAuditRepository},
        teams::{
            errors::OrgServiceError,
            records::{
                FunctionRecord, FunctionUuid, ManagerAssignmentRecord, NewFunction, NewTeam,
                TeamMembershipRecord, TeamRecord, TeamUuid,
            },
            repository::PgOrgRepository,
        },
        users::{records::Role, repository::PgUsersRepository},
    },
};

use crate::domain::users::records::UserUuid;

/// A team with its active members and assigned managers.
#[derive(Debug, Clone)]
pub struct TeamDetail {
    pub team: TeamRecord,
    pub members: Vec<TeamMembershipRecord>,
    pub managers: Vec<ManagerAssignmentRecord>,
}

#[derive(Clone)]
pub struct PgOrgService {
    db: Db,
    org: PgOrgRepository,
    users: PgUsersRepository,
    audit: PgAuditRepository,
}

impl PgOrgService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            org: PgOrgRepository::new(),
            users: PgUsersRepository::new(),
            audit: PgAuditRepository::new(),
        }
    }

    /// Membership writes are open to admins and to managers of the target
    /// team; the kernel's scope encodes which.
    fn ensure_team_in_scope(
        scope_users: &UserScope,
        team: TeamUuid,
    ) -> Result<(), OrgServiceError> {
        match scope_users {
            UserScope::Any => Ok(()),
            UserScope::ManagedTeams(teams) | UserScope::OwnOrManagedTeams(teams)
                if teams.contains(&team) =>
            {
                Ok(())
            }
            _ => Err(OrgServiceError::NotAuthorized),
        }
    }
}

#[async_trait]
impl OrgService for PgOrgService {
    async fn list_functions(
        &self,
        principal: &Principal,
    ) -> Result<Vec<FunctionRecord>, OrgServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Function, Action::List))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;
        let functions = self.org.list_functions(&mut tx, scope.company).await?;
        tx.commit().await?;

        Ok(functions)
    }

    async fn create_function(
        &self,
        principal: &Principal,
        name: String,
        code: String,
    ) -> Result<FunctionRecord, OrgServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::Function, Action::Create))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let function = self
            .org
            .insert_function(
                &mut tx,
                &NewFunction {
                    uuid: FunctionUuid::new(),
                    company_uuid: scope.company,
                    name,
                    code,
                },
            )
            .await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::FunctionCreated,
                    "function",
                    Some(function.uuid.into_uuid()),
                )
                .with_after(json!({ "name": function.name, "code": function.code })),
            )
            .await?;

        tx.commit().await?;

        Ok(function)
    }

    async fn delete_function(
        &self,
        principal: &Principal,
        function: FunctionUuid,
    ) -> Result<(), OrgServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::Function, Action::Delete))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let deleted = self
            .org
            .soft_delete_function(&mut tx, scope.company, function)
            .await?
            .ok_or(OrgServiceError::NotFound)?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::FunctionDeleted,
                    "function",
                    Some(function.into_uuid()),
                )
                .with_before(json!({ "name": deleted.name, "code": deleted.code })),
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn list_teams(
        &self,
        principal: &Principal,
        function: Option<FunctionUuid>,
    ) -> Result<Vec<TeamRecord>, OrgServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Team, Action::List))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;
        let teams = self.org.list_teams(&mut tx, scope.company, function).await?;
        tx.commit().await?;

        Ok(teams)
    }

    async fn get_team(
        &self,
        principal: &Principal,
        team: TeamUuid,
    ) -> Result<TeamDetail, OrgServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Team, Action::Read))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let record = self
            .org
            .find_team_by_uuid(&mut tx, scope.company, team)
            .await?
            .ok_or(OrgServiceError::NotFound)?;

        let members = self.org.list_team_memberships(&mut tx, team).await?;
        let managers = self.org.list_team_managers(&mut tx, team).await?;

        tx.commit().await?;

        Ok(TeamDetail {
            team: record,
            members,
            managers,
        })
    }

    async fn create_team(
        &self,
        principal: &Principal,
        function: FunctionUuid,
        name: String,
        code: String,
    ) -> Result<TeamRecord, OrgServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Team, Action::Create))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        // The function must exist in this company before a team hangs off it.
        self.org
            .find_function_by_uuid(&mut tx, scope.company, function)
            .await?
            .ok_or(OrgServiceError::InvalidReference)?;

        let team = self
            .org
            .insert_team(
                &mut tx,
                &NewTeam {
                    uuid: TeamUuid::new(),
                    company_uuid: scope.company,
                    function_uuid: function,
                    name,
                    code,
                },
            )
            .await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::TeamCreated,
                    "team",
                    Some(team.uuid.into_uuid()),
                )
                .with_after(json!({ "name": team.name, "code": team.code })),
            )
            .await?;

        tx.commit().await?;

        Ok(team)
    }

    async fn delete_team(
        &self,
        principal: &Principal,
        team: TeamUuid,
    ) -> Result<(), OrgServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Team, Action::Delete))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let deleted = self
            .org
            .soft_delete_team(&mut tx, scope.company, team)
            .await?
            .ok_or(OrgServiceError::NotFound)?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::TeamDeleted,
                    "team",
                    Some(team.into_uuid()),
                )
                .with_before(json!({ "name": deleted.name, "code": deleted.code })),
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn add_member(
        &self,
        principal: &Principal,
        team: TeamUuid,
        user: UserUuid,
        is_primary: bool,
    ) -> Result<TeamMembershipRecord, OrgServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Team, Action::Update))?;
        Self::ensure_team_in_scope(&scope.users, team)?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        self.org
            .find_team_by_uuid(&mut tx, scope.company, team)
            .await?
            .ok_or(OrgServiceError::NotFound)?;

        // Target user must live in the same company.
        self.users
            .find_by_uuid(
                &mut tx,
                scope.company,
                user,
                &authz::Scope::company_wide(principal).user_predicate_binds(),
            )
            .await?
            .ok_or(OrgServiceError::NotFound)?;

        let membership = self
            .org
            .insert_membership(&mut tx, user, team, is_primary)
            .await
            .map_err(|error| match OrgServiceError::from(error) {
                OrgServiceError::DuplicateCode => OrgServiceError::AlreadyMember,
                other => other,
            })?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::MemberAdded,
                    "team",
                    Some(team.into_uuid()),
                )
                .with_after(json!({ "user_uuid": user, "is_primary": is_primary })),
            )
            .await?;

        tx.commit().await?;

        Ok(membership)
    }

    async fn remove_member(
        &self,
        principal: &Principal,
        team: TeamUuid,
        user: UserUuid,
    ) -> Result<(), OrgServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::Team, Action::Update))?;
        Self::ensure_team_in_scope(&scope.users, team)?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        self.org
            .find_team_by_uuid(&mut tx, scope.company, team)
            .await?
            .ok_or(OrgServiceError::NotFound)?;

        self.org
            .end_membership(&mut tx, user, team)
            .await?
            .ok_or(OrgServiceError::NotFound)?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::MemberRemoved,
                    "team",
                    Some(team.into_uuid()),
                )
                .with_before(json!({ "user_uuid": user })),
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn assign_manager(
        &self,
        principal: &Principal,
        team: TeamUuid,
        manager: UserUuid,
    ) -> Result<ManagerAssignmentRecord, OrgServiceError> {
        // Manager assignment changes who can approve; admin only.
        if !principal.is_admin() {
            return Err(OrgServiceError::NotAuthorized);
        }

        let scope = authz::authorize(principal, Operation::new(Resource::Team, Action::Update))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        self.org
            .find_team_by_uuid(&mut tx, scope.company, team)
            .await?
            .ok_or(OrgServiceError::NotFound)?;

        let manager_record = self
            .users
            .find_by_uuid(
                &mut tx,
                scope.company,
                manager,
                &authz::Scope::company_wide(principal).user_predicate_binds(),
            )
            .await?
            .ok_or(OrgServiceError::NotFound)?;

        if manager_record.role == Role::User {
            return Err(OrgServiceError::NotAuthorized);
        }

        let assignment = self
            .org
            .insert_manager_assignment(&mut tx, manager, team, principal.user_uuid)
            .await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::ManagerAssigned,
                    "team",
                    Some(team.into_uuid()),
                )
                .with_after(json!({ "manager_uuid": manager })),
            )
            .await?;

        tx.commit().await?;

        Ok(assignment)
    }

    async fn remove_manager(
        &self,
        principal: &Principal,
        team: TeamUuid,
        manager: UserUuid,
    ) -> Result<(), OrgServiceError> {
        if !principal.is_admin() {
            return Err(OrgServiceError::NotAuthorized);
        }

        let scope = authz::authorize(principal, Operation::new(Resource::Team, Action::Update))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        self.org
            .find_team_by_uuid(&mut tx, scope.company, team)
            .await?
            .ok_or(OrgServiceError::NotFound)?;

        if self.org.delete_manager_assignment(&mut tx, manager, team).await? == 0 {
            return Err(OrgServiceError::NotFound);
        }

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::ManagerRemoved,
                    "team",
                    Some(team.into_uuid()),
                )
                .with_before(json!({ "manager_uuid": manager })),
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait OrgService: Send + Sync {
    async fn list_functions(
        &self,
        principal: &Principal,
    ) -> Result<Vec<FunctionRecord>, OrgServiceError>;

    async fn create_function(
        &self,
        principal: &Principal,
        name: String,
        code: String,
    ) -> Result<FunctionRecord, OrgServiceError>;

    async fn delete_function(
        &self,
        principal: &Principal,
        function: FunctionUuid,
    ) -> Result<(), OrgServiceError>;

    async fn list_teams(
        &self,
        principal: &Principal,
        function: Option<FunctionUuid>,
    ) -> Result<Vec<TeamRecord>, OrgServiceError>;

    async fn get_team(
        &self,
        principal: &Principal,
        team: TeamUuid,
    ) -> Result<TeamDetail, OrgServiceError>;

    async fn create_team(
        &self,
        principal: &Principal,
        function: FunctionUuid,
        name: String,
        code: String,
    ) -> Result<TeamRecord, OrgServiceError>;

    async fn delete_team(
        &self,
        principal: &Principal,
        team: TeamUuid,
    ) -> Result<(), OrgServiceError>;

    /// Admins add members anywhere; managers only on teams they manage.
    async fn add_member(
        &self,
        principal: &Principal,
        team: TeamUuid,
        user: UserUuid,
        is_primary: bool,
    ) -> Result<TeamMembershipRecord, OrgServiceError>;

    async fn remove_member(
        &self,
        principal: &Principal,
        team: TeamUuid,
        user: UserUuid,
    ) -> Result<(), OrgServiceError>;

    /// Admin-only: grants approval authority over the team.
    async fn assign_manager(
        &self,
        principal: &Principal,
        team: TeamUuid,
        manager: UserUuid,
    ) -> Result<ManagerAssignmentRecord, OrgServiceError>;

    async fn remove_manager(
        &self,
        principal: &Principal,
        team: TeamUuid,
        manager: UserUuid,
    ) -> Result<(), OrgServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        domain::companies::{records::CompanyUuid, records::NewCompany, repository::PgCompaniesRepository},
        test::TestContext,
    };

    use super::*;

    #[tokio::test]
    async fn admin_builds_org_structure() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&admin, &[]);

        let function = ctx
            .app
            .org
            .create_function(&principal, "Engineering".to_string(), "eng".to_string())
            .await?;

        let team = ctx
            .app
            .org
            .create_team(&principal, function.uuid, "Platform".to_string(), "plat".to_string())
            .await?;

        let detail = ctx.app.org.get_team(&principal, team.uuid).await?;

        assert_eq!(detail.team.code, "plat");
        assert!(detail.members.is_empty());
        assert!(detail.managers.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_team_code_within_function_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&admin, &[]);

        let function = ctx
            .app
            .org
            .create_function(&principal, "Engineering".to_string(), "eng".to_string())
            .await?;

        ctx.app
            .org
            .create_team(&principal, function.uuid, "Platform".to_string(), "plat".to_string())
            .await?;

        let duplicate = ctx
            .app
            .org
            .create_team(&principal, function.uuid, "Platform 2".to_string(), "plat".to_string())
            .await;

        assert!(matches!(duplicate, Err(OrgServiceError::DuplicateCode)), "{duplicate:?}");

        Ok(())
    }

    #[tokio::test]
    async fn manager_adds_members_only_on_managed_teams() -> TestResult {
        let ctx = TestContext::new().await;
        let managed = ctx.create_team("core").await;
        let unmanaged = ctx.create_team("other").await;

        let manager = ctx.create_user("m1@co.example", Role::Manager, "Str0ng!Passw0rd!").await;
        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;

        let principal = ctx.principal(&manager, &[managed]);

        ctx.app.org.add_member(&principal, managed, alice.uuid, true).await?;

        let denied = ctx.app.org.add_member(&principal, unmanaged, alice.uuid, false).await;
        assert!(matches!(denied, Err(OrgServiceError::NotAuthorized)), "{denied:?}");

        Ok(())
    }

    #[tokio::test]
    async fn removing_a_member_keeps_the_history_row() -> TestResult {
        let ctx = TestContext::new().await;
        let team = ctx.create_team("core").await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;

        let principal = ctx.principal(&admin, &[]);

        ctx.app.org.add_member(&principal, team, alice.uuid, true).await?;
        ctx.app.org.remove_member(&principal, team, alice.uuid).await?;

        let detail = ctx.app.org.get_team(&principal, team).await?;
        assert!(detail.members.is_empty(), "no active membership remains");

        // Rejoining works because only the active pair is unique.
        ctx.app.org.add_member(&principal, team, alice.uuid, true).await?;

        Ok(())
    }

    #[tokio::test]
    async fn foreign_company_teams_are_invisible() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&admin, &[]);

        // Build a second tenant directly in storage.
        let companies = PgCompaniesRepository::new();
        let mut tx = ctx.db.pool().begin().await?;
        let other = companies
            .create_company(
                &mut tx,
                &NewCompany {
                    uuid: CompanyUuid::new(),
                    name: "Other Co".to_string(),
                    slug: "other-co".to_string(),
                    domain: None,
                },
            )
            .await?;
        tx.commit().await?;

        let repo = PgOrgRepository::new();
        let mut tx = ctx.db.pool().begin().await?;
        let foreign_function = repo
            .insert_function(
                &mut tx,
                &crate::domain::teams::records::NewFunction {
                    uuid: FunctionUuid::new(),
                    company_uuid: other.uuid,
                    name: "Foreign".to_string(),
                    code: "fx".to_string(),
                },
            )
            .await?;
        let foreign_team = repo
            .insert_team(
                &mut tx,
                &crate::domain::teams::records::NewTeam {
                    uuid: TeamUuid::new(),
                    company_uuid: other.uuid,
                    function_uuid: foreign_function.uuid,
                    name: "Foreign Team".to_string(),
                    code: "ft".to_string(),
                },
            )
            .await?;
        tx.commit().await?;

        // The admin of company A gets not-found, not forbidden.
        let result = ctx.app.org.get_team(&principal, foreign_team.uuid).await;
        assert!(matches!(result, Err(OrgServiceError::NotFound)), "{result:?}");

        let listed = ctx.app.org.list_teams(&principal, None).await?;
        assert!(listed.iter().all(|team| team.company_uuid == ctx.company.uuid));

        Ok(())
    }
}
