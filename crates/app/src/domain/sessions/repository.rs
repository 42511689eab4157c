//! Sessions repository.
//!
//! Token lookups are by digest and take `FOR UPDATE` so concurrent
//! presentations of the same token serialize on the row.

use std::str::FromStr;

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use uuid::Uuid;

use crate::domain::{
    companies::records::CompanyUuid,
    sessions::records::{
        InviteInput, InviteTokenRecord, InviteTokenUuid, PasswordResetTokenRecord,
        RefreshTokenRecord, RefreshTokenUuid, ResetTokenUuid,
    },
    teams::records::{FunctionUuid, TeamUuid},
    users::records::{Role, UserUuid},
};

const INSERT_REFRESH_TOKEN_SQL: &str = include_str!("sql/insert_refresh_token.sql");
const FIND_REFRESH_TOKEN_BY_HASH_SQL: &str = include_str!("sql/find_refresh_token_by_hash.sql");
const REVOKE_REFRESH_TOKEN_SQL: &str = include_str!("sql/revoke_refresh_token.sql");
const REVOKE_ALL_REFRESH_TOKENS_FOR_USER_SQL: &str =
    include_str!("sql/revoke_all_refresh_tokens_for_user.sql");
const INSERT_INVITE_TOKEN_SQL: &str = include_str!("sql/insert_invite_token.sql");
const FIND_INVITE_TOKEN_BY_HASH_SQL: &str = include_str!("sql/find_invite_token_by_hash.sql");
const MARK_INVITE_USED_SQL: &str = include_str!("sql/mark_invite_used.sql");
const LIST_INVITE_TOKENS_SQL: &str = include_str!("sql/list_invite_tokens.sql");
const DELETE_INVITE_TOKEN_SQL: &str = include_str!("sql/delete_invite_token.sql");
const INSERT_RESET_TOKEN_SQL: &str = include_str!("sql/insert_reset_token.sql");
const FIND_RESET_TOKEN_BY_HASH_SQL: &str = include_str!("sql/find_reset_token_by_hash.sql");
const MARK_RESET_TOKEN_USED_SQL: &str = include_str!("sql/mark_reset_token_used.sql");
const DELETE_EXPIRED_TOKENS_SQL: &str = include_str!("sql/delete_expired_tokens.sql");

pub(crate) struct NewRefreshToken<'a> {
    pub uuid: RefreshTokenUuid,
    pub user_uuid: UserUuid,
    pub token_hash: &'a str,
    pub expires_at: Timestamp,
    pub user_agent: Option<&'a str>,
    pub ip: Option<&'a str>,
    pub is_remember_me: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PgSessionsRepository;

impl PgSessionsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub(crate) async fn insert_refresh_token(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token: &NewRefreshToken<'_>,
    ) -> Result<RefreshTokenRecord, sqlx::Error> {
        query_as::<Postgres, RefreshTokenRecord>(INSERT_REFRESH_TOKEN_SQL)
            .bind(token.uuid.into_uuid())
            .bind(token.user_uuid.into_uuid())
            .bind(token.token_hash)
            .bind(SqlxTimestamp::from(token.expires_at))
            .bind(token.user_agent)
            .bind(token.ip)
            .bind(token.is_remember_me)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_refresh_token_by_hash(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        query_as::<Postgres, RefreshTokenRecord>(FIND_REFRESH_TOKEN_BY_HASH_SQL)
            .bind(token_hash)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn revoke_refresh_token(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token: RefreshTokenUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(REVOKE_REFRESH_TOKEN_SQL)
            .bind(token.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn revoke_all_for_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(REVOKE_ALL_REFRESH_TOKENS_FOR_USER_SQL)
            .bind(user.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn insert_invite_token(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        uuid: InviteTokenUuid,
        token_hash: &str,
        company: CompanyUuid,
        input: &InviteInput,
        invited_by: UserUuid,
        expires_at: Timestamp,
    ) -> Result<InviteTokenRecord, sqlx::Error> {
        let team_uuids: Vec<Uuid> = input.team_uuids.iter().copied().map(TeamUuid::into_uuid).collect();

        query_as::<Postgres, InviteTokenRecord>(INSERT_INVITE_TOKEN_SQL)
            .bind(uuid.into_uuid())
            .bind(token_hash)
            .bind(company.into_uuid())
            .bind(input.function_uuid.map(FunctionUuid::into_uuid))
            .bind(team_uuids)
            .bind(&input.email)
            .bind(input.role.as_str())
            .bind(invited_by.into_uuid())
            .bind(SqlxTimestamp::from(expires_at))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_invite_token_by_hash(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token_hash: &str,
    ) -> Result<Option<InviteTokenRecord>, sqlx::Error> {
        query_as::<Postgres, InviteTokenRecord>(FIND_INVITE_TOKEN_BY_HASH_SQL)
            .bind(token_hash)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn mark_invite_used(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        invite: InviteTokenUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(MARK_INVITE_USED_SQL)
            .bind(invite.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn list_invite_tokens(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
    ) -> Result<Vec<InviteTokenRecord>, sqlx::Error> {
        query_as::<Postgres, InviteTokenRecord>(LIST_INVITE_TOKENS_SQL)
            .bind(company.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn delete_invite_token(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        invite: InviteTokenUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_INVITE_TOKEN_SQL)
            .bind(company.into_uuid())
            .bind(invite.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn insert_reset_token(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        uuid: ResetTokenUuid,
        token_hash: &str,
        user: UserUuid,
        expires_at: Timestamp,
    ) -> Result<PasswordResetTokenRecord, sqlx::Error> {
        query_as::<Postgres, PasswordResetTokenRecord>(INSERT_RESET_TOKEN_SQL)
            .bind(uuid.into_uuid())
            .bind(token_hash)
            .bind(user.into_uuid())
            .bind(SqlxTimestamp::from(expires_at))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_reset_token_by_hash(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token_hash: &str,
    ) -> Result<Option<PasswordResetTokenRecord>, sqlx::Error> {
        query_as::<Postgres, PasswordResetTokenRecord>(FIND_RESET_TOKEN_BY_HASH_SQL)
            .bind(token_hash)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn mark_reset_token_used(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reset: ResetTokenUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(MARK_RESET_TOKEN_USED_SQL)
            .bind(reset.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Drop long-expired token rows. Idempotent; on-read expiry checks make
    /// this purely a hygiene pass.
    pub(crate) async fn delete_expired_tokens(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<i64, sqlx::Error> {
        query_scalar::<Postgres, i64>(DELETE_EXPIRED_TOKENS_SQL)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for RefreshTokenRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: RefreshTokenUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get::<Uuid, _>("user_uuid")?),
            token_hash: row.try_get("token_hash")?,
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            revoked_at: row
                .try_get::<Option<SqlxTimestamp>, _>("revoked_at")?
                .map(SqlxTimestamp::to_jiff),
            last_used_at: row
                .try_get::<Option<SqlxTimestamp>, _>("last_used_at")?
                .map(SqlxTimestamp::to_jiff),
            user_agent: row.try_get("user_agent")?,
            ip: row.try_get("ip")?,
            is_remember_me: row.try_get("is_remember_me")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for InviteTokenRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let role_raw: String = row.try_get("role")?;
        let role = Role::from_str(&role_raw).map_err(|message| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: message.into(),
        })?;

        Ok(Self {
            uuid: InviteTokenUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            token_hash: row.try_get("token_hash")?,
            company_uuid: CompanyUuid::from_uuid(row.try_get::<Uuid, _>("company_uuid")?),
            function_uuid: row
                .try_get::<Option<Uuid>, _>("function_uuid")?
                .map(FunctionUuid::from_uuid),
            team_uuids: row
                .try_get::<Vec<Uuid>, _>("team_uuids")?
                .into_iter()
                .map(TeamUuid::from_uuid)
                .collect(),
            email: row.try_get("email")?,
            role,
            invited_by: row
                .try_get::<Option<Uuid>, _>("invited_by")?
                .map(UserUuid::from_uuid),
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            used_at: row
                .try_get::<Option<SqlxTimestamp>, _>("used_at")?
                .map(SqlxTimestamp::to_jiff),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for PasswordResetTokenRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ResetTokenUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            token_hash: row.try_get("token_hash")?,
            user_uuid: UserUuid::from_uuid(row.try_get::<Uuid, _>("user_uuid")?),
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            used_at: row
                .try_get::<Option<SqlxTimestamp>, _>("used_at")?
                .map(SqlxTimestamp::to_jiff),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
