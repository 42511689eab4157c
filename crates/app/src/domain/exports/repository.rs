//! Exports repository.

use jiff_sqlx::{Date as SqlxDate, Timestamp as SqlxTimestamp};
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::{
    authz::ScopeBinds,
    domain::{
        companies::records::CompanyUuid,
        exports::records::ExportRow,
        requests::records::{RequestFilter, RequestStatus},
        teams::records::TeamUuid,
        users::{records::UserUuid, repository::team_uuid_vec},
    },
};

const EXPORT_VACATIONS_SQL: &str = include_str!("sql/export_vacations.sql");

#[derive(Debug, Clone, Default)]
pub struct PgExportsRepository;

impl PgExportsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn fetch_rows(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        scope: &ScopeBinds,
        filter: &RequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ExportRow>, sqlx::Error> {
        query_as::<Postgres, ExportRow>(EXPORT_VACATIONS_SQL)
            .bind(company.into_uuid())
            .bind(scope.any_user)
            .bind(scope.own_user.map(UserUuid::into_uuid))
            .bind(team_uuid_vec(&scope.team_uuids))
            .bind(filter.status.map(RequestStatus::as_str))
            .bind(filter.user_uuid.map(UserUuid::into_uuid))
            .bind(filter.team_uuid.map(TeamUuid::into_uuid))
            .bind(filter.from.map(SqlxDate::from))
            .bind(filter.to.map(SqlxDate::from))
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for ExportRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            request_uuid: row.try_get("request_uuid")?,
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            team_code: row.try_get("team_code")?,
            start_date: row.try_get::<SqlxDate, _>("start_date")?.to_jiff(),
            end_date: row.try_get::<SqlxDate, _>("end_date")?.to_jiff(),
            kind: row.try_get("kind")?,
            status: row.try_get("status")?,
            days_count: row.try_get("days_count")?,
            approver_email: row.try_get("approver_email")?,
            approved_at: row
                .try_get::<Option<SqlxTimestamp>, _>("approved_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}
