//! Requests repository.

use std::str::FromStr;

use jiff::civil::Date;
use jiff_sqlx::{Date as SqlxDate, Timestamp as SqlxTimestamp};
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as, query_scalar};
use uuid::Uuid;

use crate::{
    authz::ScopeBinds,
    domain::{
        companies::records::CompanyUuid,
        periods::records::PeriodUuid,
        requests::records::{
            RequestFilter, RequestStatus, RequestUuid, VacationKind, VacationRequestRecord,
        },
        teams::records::TeamUuid,
        users::{records::UserUuid, repository::team_uuid_vec},
    },
};

const INSERT_REQUEST_SQL: &str = include_str!("sql/insert_request.sql");
const FIND_REQUEST_FOR_UPDATE_SQL: &str = include_str!("sql/find_request_for_update.sql");
const FIND_REQUEST_BY_UUID_SQL: &str = include_str!("sql/find_request_by_uuid.sql");
const LIST_REQUESTS_SQL: &str = include_str!("sql/list_requests.sql");
const COUNT_OVERLAPPING_SQL: &str = include_str!("sql/count_overlapping.sql");
const SUBMIT_REQUEST_SQL: &str = include_str!("sql/submit_request.sql");
const APPROVE_REQUEST_SQL: &str = include_str!("sql/approve_request.sql");
const REJECT_REQUEST_SQL: &str = include_str!("sql/reject_request.sql");
const CLOSE_REQUEST_SQL: &str = include_str!("sql/close_request.sql");
const UPDATE_DRAFT_REQUEST_SQL: &str = include_str!("sql/update_draft_request.sql");
const USER_IN_TEAMS_SQL: &str = include_str!("sql/user_in_teams.sql");
const FIND_PRIMARY_TEAM_FOR_USER_SQL: &str = include_str!("sql/find_primary_team_for_user.sql");

pub(crate) struct NewRequestRow<'a> {
    pub uuid: RequestUuid,
    pub company_uuid: CompanyUuid,
    pub user_uuid: UserUuid,
    pub team_uuid: Option<TeamUuid>,
    pub period_uuid: Option<PeriodUuid>,
    pub start_date: Date,
    pub end_date: Date,
    pub kind: VacationKind,
    pub status: RequestStatus,
    pub reason: Option<&'a str>,
    pub days_count: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PgRequestsRepository;

impl PgRequestsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub(crate) async fn insert_request(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        row: &NewRequestRow<'_>,
    ) -> Result<VacationRequestRecord, sqlx::Error> {
        query_as::<Postgres, VacationRequestRecord>(INSERT_REQUEST_SQL)
            .bind(row.uuid.into_uuid())
            .bind(row.company_uuid.into_uuid())
            .bind(row.user_uuid.into_uuid())
            .bind(row.team_uuid.map(TeamUuid::into_uuid))
            .bind(row.period_uuid.map(PeriodUuid::into_uuid))
            .bind(SqlxDate::from(row.start_date))
            .bind(SqlxDate::from(row.end_date))
            .bind(row.kind.as_str())
            .bind(row.status.as_str())
            .bind(row.reason)
            .bind(row.days_count)
            .fetch_one(&mut **tx)
            .await
    }

    /// Lock the request row for a state transition. The lock is held until
    /// the surrounding transaction commits, so the companion allocation
    /// update is covered too.
    pub(crate) async fn find_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        request: RequestUuid,
    ) -> Result<Option<VacationRequestRecord>, sqlx::Error> {
        query_as::<Postgres, VacationRequestRecord>(FIND_REQUEST_FOR_UPDATE_SQL)
            .bind(company.into_uuid())
            .bind(request.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_uuid(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        request: RequestUuid,
        scope: &ScopeBinds,
    ) -> Result<Option<VacationRequestRecord>, sqlx::Error> {
        query_as::<Postgres, VacationRequestRecord>(FIND_REQUEST_BY_UUID_SQL)
            .bind(company.into_uuid())
            .bind(request.into_uuid())
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
        filter: &RequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VacationRequestRecord>, sqlx::Error> {
        query_as::<Postgres, VacationRequestRecord>(LIST_REQUESTS_SQL)
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

    /// Count pending/approved requests of `user` intersecting the range.
    pub(crate) async fn count_overlapping(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        start_date: Date,
        end_date: Date,
        exclude: Option<RequestUuid>,
    ) -> Result<i64, sqlx::Error> {
        query_scalar::<Postgres, i64>(COUNT_OVERLAPPING_SQL)
            .bind(user.into_uuid())
            .bind(SqlxDate::from(start_date))
            .bind(SqlxDate::from(end_date))
            .bind(exclude.map(RequestUuid::into_uuid))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn submit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        request: RequestUuid,
        period: PeriodUuid,
        days_count: f64,
    ) -> Result<VacationRequestRecord, sqlx::Error> {
        query_as::<Postgres, VacationRequestRecord>(SUBMIT_REQUEST_SQL)
            .bind(company.into_uuid())
            .bind(request.into_uuid())
            .bind(period.into_uuid())
            .bind(days_count)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn approve(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        request: RequestUuid,
        approver: UserUuid,
    ) -> Result<VacationRequestRecord, sqlx::Error> {
        query_as::<Postgres, VacationRequestRecord>(APPROVE_REQUEST_SQL)
            .bind(company.into_uuid())
            .bind(request.into_uuid())
            .bind(approver.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn reject(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        request: RequestUuid,
        approver: UserUuid,
        reason: &str,
    ) -> Result<VacationRequestRecord, sqlx::Error> {
        query_as::<Postgres, VacationRequestRecord>(REJECT_REQUEST_SQL)
            .bind(company.into_uuid())
            .bind(request.into_uuid())
            .bind(approver.into_uuid())
            .bind(reason)
            .fetch_one(&mut **tx)
            .await
    }

    /// Cancel or withdraw.
    pub(crate) async fn close(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        request: RequestUuid,
        status: RequestStatus,
    ) -> Result<VacationRequestRecord, sqlx::Error> {
        query_as::<Postgres, VacationRequestRecord>(CLOSE_REQUEST_SQL)
            .bind(company.into_uuid())
            .bind(request.into_uuid())
            .bind(status.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn update_draft(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        request: RequestUuid,
        start_date: Date,
        end_date: Date,
        kind: VacationKind,
        reason: Option<&str>,
        team: Option<TeamUuid>,
        period: Option<PeriodUuid>,
        days_count: f64,
    ) -> Result<VacationRequestRecord, sqlx::Error> {
        query_as::<Postgres, VacationRequestRecord>(UPDATE_DRAFT_REQUEST_SQL)
            .bind(company.into_uuid())
            .bind(request.into_uuid())
            .bind(SqlxDate::from(start_date))
            .bind(SqlxDate::from(end_date))
            .bind(kind.as_str())
            .bind(reason)
            .bind(team.map(TeamUuid::into_uuid))
            .bind(period.map(PeriodUuid::into_uuid))
            .bind(days_count)
            .fetch_one(&mut **tx)
            .await
    }

    /// The owner's primary active team, falling back to the oldest
    /// membership.
    pub(crate) async fn find_primary_team(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Option<TeamUuid>, sqlx::Error> {
        let team = query_scalar::<Postgres, Uuid>(FIND_PRIMARY_TEAM_FOR_USER_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        Ok(team.map(TeamUuid::from_uuid))
    }

    pub(crate) async fn user_in_teams(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        teams: &[TeamUuid],
    ) -> Result<bool, sqlx::Error> {
        query_scalar::<Postgres, bool>(USER_IN_TEAMS_SQL)
            .bind(user.into_uuid())
            .bind(team_uuid_vec(teams))
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for VacationRequestRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind_raw: String = row.try_get("kind")?;
        let kind = VacationKind::from_str(&kind_raw).map_err(|message| sqlx::Error::ColumnDecode {
            index: "kind".to_string(),
            source: message.into(),
        })?;

        let status_raw: String = row.try_get("status")?;
        let status =
            RequestStatus::from_str(&status_raw).map_err(|message| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: message.into(),
            })?;

        Ok(Self {
            uuid: RequestUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            company_uuid: CompanyUuid::from_uuid(row.try_get::<Uuid, _>("company_uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get::<Uuid, _>("user_uuid")?),
            team_uuid: row
                .try_get::<Option<Uuid>, _>("team_uuid")?
                .map(TeamUuid::from_uuid),
            period_uuid: row
                .try_get::<Option<Uuid>, _>("period_uuid")?
                .map(PeriodUuid::from_uuid),
            start_date: row.try_get::<SqlxDate, _>("start_date")?.to_jiff(),
            end_date: row.try_get::<SqlxDate, _>("end_date")?.to_jiff(),
            kind,
            status,
            reason: row.try_get("reason")?,
            approver_uuid: row
                .try_get::<Option<Uuid>, _>("approver_uuid")?
                .map(UserUuid::from_uuid),
            approved_at: row
                .try_get::<Option<SqlxTimestamp>, _>("approved_at")?
                .map(SqlxTimestamp::to_jiff),
            rejected_reason: row.try_get("rejected_reason")?,
            days_count: row.try_get("days_count")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
