//! Users repository.

use std::str::FromStr;

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use uuid::Uuid;

use crate::{
    authz::ScopeBinds,
    domain::{
        companies::records::CompanyUuid,
        teams::records::{FunctionUuid, TeamUuid},
        users::records::{NewUser, Role, UserFilter, UserPatch, UserRecord, UserUuid},
    },
};

const INSERT_USER_SQL: &str = include_str!("sql/insert_user.sql");
const FIND_USER_BY_UUID_SQL: &str = include_str!("sql/find_user_by_uuid.sql");
const LIST_USERS_SQL: &str = include_str!("sql/list_users.sql");
const FIND_ACTIVE_USER_BY_EMAIL_SQL: &str = include_str!("sql/find_active_user_by_email.sql");
const FIND_USER_FOR_PRINCIPAL_SQL: &str = include_str!("sql/find_user_for_principal.sql");
const UPDATE_USER_SQL: &str = include_str!("sql/update_user.sql");
const SET_PASSWORD_HASH_SQL: &str = include_str!("sql/set_password_hash.sql");
const TOUCH_LAST_LOGIN_SQL: &str = include_str!("sql/touch_last_login.sql");
const SOFT_DELETE_USER_SQL: &str = include_str!("sql/soft_delete_user.sql");
const LIST_MANAGED_TEAM_UUIDS_SQL: &str = include_str!("sql/list_managed_team_uuids.sql");

#[derive(Debug, Clone, Default)]
pub struct PgUsersRepository;

impl PgUsersRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub async fn insert_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: &NewUser,
    ) -> Result<UserRecord, sqlx::Error> {
        query_as::<Postgres, UserRecord>(INSERT_USER_SQL)
            .bind(user.uuid.into_uuid())
            .bind(user.company_uuid.into_uuid())
            .bind(user.function_uuid.map(FunctionUuid::into_uuid))
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(user.email_verified)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_uuid(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        user: UserUuid,
        scope: &ScopeBinds,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        query_as::<Postgres, UserRecord>(FIND_USER_BY_UUID_SQL)
            .bind(company.into_uuid())
            .bind(user.into_uuid())
            .bind(scope.any_user)
            .bind(scope.own_user.map(UserUuid::into_uuid))
            .bind(team_uuid_vec(&scope.team_uuids))
            .fetch_optional(&mut **tx)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn list(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        scope: &ScopeBinds,
        filter: &UserFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserRecord>, sqlx::Error> {
        query_as::<Postgres, UserRecord>(LIST_USERS_SQL)
            .bind(company.into_uuid())
            .bind(scope.any_user)
            .bind(scope.own_user.map(UserUuid::into_uuid))
            .bind(team_uuid_vec(&scope.team_uuids))
            .bind(filter.role.map(Role::as_str))
            .bind(filter.function_uuid.map(FunctionUuid::into_uuid))
            .bind(filter.is_active)
            .bind(&filter.search)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn find_active_by_email(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        email: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        query_as::<Postgres, UserRecord>(FIND_ACTIVE_USER_BY_EMAIL_SQL)
            .bind(email)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Active, non-deleted user row for principal resolution. Unscoped:
    /// the principal's company is read from this row.
    pub(crate) async fn find_for_principal(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        query_as::<Postgres, UserRecord>(FIND_USER_FOR_PRINCIPAL_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn update_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        user: UserUuid,
        patch: &UserPatch,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        query_as::<Postgres, UserRecord>(UPDATE_USER_SQL)
            .bind(company.into_uuid())
            .bind(user.into_uuid())
            .bind(&patch.first_name)
            .bind(&patch.last_name)
            .bind(patch.function_uuid.map(FunctionUuid::into_uuid))
            .bind(patch.role.map(Role::as_str))
            .bind(patch.is_active)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn set_password_hash(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        query(SET_PASSWORD_HASH_SQL)
            .bind(user.into_uuid())
            .bind(password_hash)
            .execute(&mut **tx)
            .await
            .map(|_result| ())
    }

    pub(crate) async fn touch_last_login(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<(), sqlx::Error> {
        query(TOUCH_LAST_LOGIN_SQL)
            .bind(user.into_uuid())
            .execute(&mut **tx)
            .await
            .map(|_result| ())
    }

    pub(crate) async fn soft_delete(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        user: UserUuid,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        query_as::<Postgres, UserRecord>(SOFT_DELETE_USER_SQL)
            .bind(company.into_uuid())
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_managed_team_uuids(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        manager: UserUuid,
    ) -> Result<Vec<TeamUuid>, sqlx::Error> {
        let uuids = query_scalar::<Postgres, Uuid>(LIST_MANAGED_TEAM_UUIDS_SQL)
            .bind(manager.into_uuid())
            .fetch_all(&mut **tx)
            .await?;

        Ok(uuids.into_iter().map(TeamUuid::from_uuid).collect())
    }
}

pub(crate) fn team_uuid_vec(teams: &[TeamUuid]) -> Vec<Uuid> {
    teams.iter().copied().map(TeamUuid::into_uuid).collect()
}

impl<'r> FromRow<'r, PgRow> for UserRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let role_raw: String = row.try_get("role")?;
        let role = Role::from_str(&role_raw).map_err(|message| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: message.into(),
        })?;

        Ok(Self {
            uuid: UserUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            company_uuid: CompanyUuid::from_uuid(row.try_get::<Uuid, _>("company_uuid")?),
            function_uuid: row
                .try_get::<Option<Uuid>, _>("function_uuid")?
                .map(FunctionUuid::from_uuid),
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            role,
            is_active: row.try_get("is_active")?,
            email_verified: row.try_get("email_verified")?,
            last_login_at: row
                .try_get::<Option<SqlxTimestamp>, _>("last_login_at")?
                .map(SqlxTimestamp::to_jiff),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}
