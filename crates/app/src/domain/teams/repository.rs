//! Org repository.

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::{
    companies::records::CompanyUuid,
    teams::records::{
        FunctionRecord, FunctionUuid, ManagerAssignmentRecord, MembershipUuid, NewFunction,
        NewTeam, TeamMembershipRecord, TeamRecord, TeamUuid,
    },
    users::records::UserUuid,
};

const INSERT_FUNCTION_SQL: &str = include_str!("sql/insert_function.sql");
const LIST_FUNCTIONS_SQL: &str = include_str!("sql/list_functions.sql");
const FIND_FUNCTION_BY_UUID_SQL: &str = include_str!("sql/find_function_by_uuid.sql");
const SOFT_DELETE_FUNCTION_SQL: &str = include_str!("sql/soft_delete_function.sql");
const INSERT_TEAM_SQL: &str = include_str!("sql/insert_team.sql");
const LIST_TEAMS_SQL: &str = include_str!("sql/list_teams.sql");
const FIND_TEAM_BY_UUID_SQL: &str = include_str!("sql/find_team_by_uuid.sql");
const SOFT_DELETE_TEAM_SQL: &str = include_str!("sql/soft_delete_team.sql");
const INSERT_MEMBERSHIP_SQL: &str = include_str!("sql/insert_membership.sql");
const END_MEMBERSHIP_SQL: &str = include_str!("sql/end_membership.sql");
const LIST_TEAM_MEMBERSHIPS_SQL: &str = include_str!("sql/list_team_memberships.sql");
const INSERT_MANAGER_ASSIGNMENT_SQL: &str = include_str!("sql/insert_manager_assignment.sql");
const DELETE_MANAGER_ASSIGNMENT_SQL: &str = include_str!("sql/delete_manager_assignment.sql");
const LIST_TEAM_MANAGERS_SQL: &str = include_str!("sql/list_team_managers.sql");

#[derive(Debug, Clone, Default)]
pub struct PgOrgRepository;

impl PgOrgRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub(crate) async fn insert_function(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        function: &NewFunction,
    ) -> Result<FunctionRecord, sqlx::Error> {
        query_as::<Postgres, FunctionRecord>(INSERT_FUNCTION_SQL)
            .bind(function.uuid.into_uuid())
            .bind(function.company_uuid.into_uuid())
            .bind(&function.name)
            .bind(&function.code)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_functions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
    ) -> Result<Vec<FunctionRecord>, sqlx::Error> {
        query_as::<Postgres, FunctionRecord>(LIST_FUNCTIONS_SQL)
            .bind(company.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn find_function_by_uuid(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        function: FunctionUuid,
    ) -> Result<Option<FunctionRecord>, sqlx::Error> {
        query_as::<Postgres, FunctionRecord>(FIND_FUNCTION_BY_UUID_SQL)
            .bind(company.into_uuid())
            .bind(function.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn soft_delete_function(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        function: FunctionUuid,
    ) -> Result<Option<FunctionRecord>, sqlx::Error> {
        query_as::<Postgres, FunctionRecord>(SOFT_DELETE_FUNCTION_SQL)
            .bind(company.into_uuid())
            .bind(function.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn insert_team(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        team: &NewTeam,
    ) -> Result<TeamRecord, sqlx::Error> {
        query_as::<Postgres, TeamRecord>(INSERT_TEAM_SQL)
            .bind(team.uuid.into_uuid())
            .bind(team.company_uuid.into_uuid())
            .bind(team.function_uuid.into_uuid())
            .bind(&team.name)
            .bind(&team.code)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_teams(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        function: Option<FunctionUuid>,
    ) -> Result<Vec<TeamRecord>, sqlx::Error> {
        query_as::<Postgres, TeamRecord>(LIST_TEAMS_SQL)
            .bind(company.into_uuid())
            .bind(function.map(FunctionUuid::into_uuid))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn find_team_by_uuid(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        team: TeamUuid,
    ) -> Result<Option<TeamRecord>, sqlx::Error> {
        query_as::<Postgres, TeamRecord>(FIND_TEAM_BY_UUID_SQL)
            .bind(company.into_uuid())
            .bind(team.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn soft_delete_team(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        team: TeamUuid,
    ) -> Result<Option<TeamRecord>, sqlx::Error> {
        query_as::<Postgres, TeamRecord>(SOFT_DELETE_TEAM_SQL)
            .bind(company.into_uuid())
            .bind(team.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn insert_membership(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        team: TeamUuid,
        is_primary: bool,
    ) -> Result<TeamMembershipRecord, sqlx::Error> {
        query_as::<Postgres, TeamMembershipRecord>(INSERT_MEMBERSHIP_SQL)
            .bind(MembershipUuid::new().into_uuid())
            .bind(user.into_uuid())
            .bind(team.into_uuid())
            .bind(is_primary)
            .fetch_one(&mut **tx)
            .await
    }

    /// Close the active membership, keeping the row for history.
    pub(crate) async fn end_membership(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        team: TeamUuid,
    ) -> Result<Option<TeamMembershipRecord>, sqlx::Error> {
        query_as::<Postgres, TeamMembershipRecord>(END_MEMBERSHIP_SQL)
            .bind(user.into_uuid())
            .bind(team.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_team_memberships(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        team: TeamUuid,
    ) -> Result<Vec<TeamMembershipRecord>, sqlx::Error> {
        query_as::<Postgres, TeamMembershipRecord>(LIST_TEAM_MEMBERSHIPS_SQL)
            .bind(team.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn insert_manager_assignment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        manager: UserUuid,
        team: TeamUuid,
        assigned_by: UserUuid,
    ) -> Result<ManagerAssignmentRecord, sqlx::Error> {
        query_as::<Postgres, ManagerAssignmentRecord>(INSERT_MANAGER_ASSIGNMENT_SQL)
            .bind(Uuid::now_v7())
            .bind(manager.into_uuid())
            .bind(team.into_uuid())
            .bind(assigned_by.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_manager_assignment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        manager: UserUuid,
        team: TeamUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_MANAGER_ASSIGNMENT_SQL)
            .bind(manager.into_uuid())
            .bind(team.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn list_team_managers(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        team: TeamUuid,
    ) -> Result<Vec<ManagerAssignmentRecord>, sqlx::Error> {
        query_as::<Postgres, ManagerAssignmentRecord>(LIST_TEAM_MANAGERS_SQL)
            .bind(team.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for FunctionRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: FunctionUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            company_uuid: CompanyUuid::from_uuid(row.try_get::<Uuid, _>("company_uuid")?),
            name: row.try_get("name")?,
            code: row.try_get("code")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for TeamRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: TeamUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            company_uuid: CompanyUuid::from_uuid(row.try_get::<Uuid, _>("company_uuid")?),
            function_uuid: FunctionUuid::from_uuid(row.try_get::<Uuid, _>("function_uuid")?),
            name: row.try_get("name")?,
            code: row.try_get("code")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for TeamMembershipRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: MembershipUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get::<Uuid, _>("user_uuid")?),
            team_uuid: TeamUuid::from_uuid(row.try_get::<Uuid, _>("team_uuid")?),
            is_primary: row.try_get("is_primary")?,
            joined_at: row.try_get::<SqlxTimestamp, _>("joined_at")?.to_jiff(),
            left_at: row
                .try_get::<Option<SqlxTimestamp>, _>("left_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ManagerAssignmentRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            manager_uuid: UserUuid::from_uuid(row.try_get::<Uuid, _>("manager_uuid")?),
            team_uuid: TeamUuid::from_uuid(row.try_get::<Uuid, _>("team_uuid")?),
            assigned_by: row
                .try_get::<Option<Uuid>, _>("assigned_by")?
                .map(UserUuid::from_uuid),
            assigned_at: row.try_get::<SqlxTimestamp, _>("assigned_at")?.to_jiff(),
        })
    }
}
