//! Calendar repository.

use jiff::civil::Date;
use jiff_sqlx::{Date as SqlxDate, Timestamp as SqlxTimestamp};
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use uuid::Uuid;

use crate::{
    calendar,
    domain::{
        companies::records::CompanyUuid,
        periods::records::{
            AllocationUpsert, AllocationUuid, NewVacationPeriod, PeriodPatch, PeriodUuid,
            VacationAllocationRecord, VacationPeriodRecord,
        },
        users::records::UserUuid,
    },
};

const INSERT_PERIOD_SQL: &str = include_str!("sql/insert_period.sql");
const LIST_PERIODS_SQL: &str = include_str!("sql/list_periods.sql");
const FIND_PERIOD_BY_UUID_SQL: &str = include_str!("sql/find_period_by_uuid.sql");
const FIND_PERIOD_FOR_DATE_SQL: &str = include_str!("sql/find_period_for_date.sql");
const UPDATE_PERIOD_SQL: &str = include_str!("sql/update_period.sql");
const CLEAR_DEFAULT_PERIOD_SQL: &str = include_str!("sql/clear_default_period.sql");
const HAS_DEFAULT_PERIOD_SQL: &str = include_str!("sql/has_default_period.sql");
const UPSERT_ALLOCATION_SQL: &str = include_str!("sql/upsert_allocation.sql");
const ENSURE_ALLOCATION_SQL: &str = include_str!("sql/ensure_allocation.sql");
const FIND_ALLOCATION_FOR_UPDATE_SQL: &str = include_str!("sql/find_allocation_for_update.sql");
const ADJUST_ALLOCATION_DAYS_USED_SQL: &str = include_str!("sql/adjust_allocation_days_used.sql");
const LIST_ALLOCATIONS_FOR_USER_SQL: &str = include_str!("sql/list_allocations_for_user.sql");
const SUM_PENDING_DAYS_SQL: &str = include_str!("sql/sum_pending_days.sql");

#[derive(Debug, Clone, Default)]
pub struct PgCalendarRepository;

impl PgCalendarRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub(crate) async fn insert_period(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        period: &NewVacationPeriod,
    ) -> Result<VacationPeriodRecord, sqlx::Error> {
        query_as::<Postgres, VacationPeriodRecord>(INSERT_PERIOD_SQL)
            .bind(PeriodUuid::new().into_uuid())
            .bind(company.into_uuid())
            .bind(&period.name)
            .bind(SqlxDate::from(period.start_date))
            .bind(SqlxDate::from(period.end_date))
            .bind(period.is_default)
            .bind(period.is_active)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_periods(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
    ) -> Result<Vec<VacationPeriodRecord>, sqlx::Error> {
        query_as::<Postgres, VacationPeriodRecord>(LIST_PERIODS_SQL)
            .bind(company.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn find_period_by_uuid(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        period: PeriodUuid,
    ) -> Result<Option<VacationPeriodRecord>, sqlx::Error> {
        query_as::<Postgres, VacationPeriodRecord>(FIND_PERIOD_BY_UUID_SQL)
            .bind(company.into_uuid())
            .bind(period.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn update_period(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        period: PeriodUuid,
        patch: &PeriodPatch,
    ) -> Result<Option<VacationPeriodRecord>, sqlx::Error> {
        query_as::<Postgres, VacationPeriodRecord>(UPDATE_PERIOD_SQL)
            .bind(company.into_uuid())
            .bind(period.into_uuid())
            .bind(&patch.name)
            .bind(patch.is_default)
            .bind(patch.is_active)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn clear_default(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
    ) -> Result<(), sqlx::Error> {
        query(CLEAR_DEFAULT_PERIOD_SQL)
            .bind(company.into_uuid())
            .execute(&mut **tx)
            .await
            .map(|_result| ())
    }

    pub(crate) async fn has_default(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
    ) -> Result<bool, sqlx::Error> {
        query_scalar::<Postgres, bool>(HAS_DEFAULT_PERIOD_SQL)
            .bind(company.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Resolve the period covering `day`, materializing the April-to-March
    /// default year when the company has nothing configured for that date.
    ///
    /// Overlapping periods resolve deterministically: default first, then
    /// earliest start date, then smallest name.
    pub(crate) async fn resolve_period_for_date(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        day: Date,
    ) -> Result<VacationPeriodRecord, sqlx::Error> {
        let found = query_as::<Postgres, VacationPeriodRecord>(FIND_PERIOD_FOR_DATE_SQL)
            .bind(company.into_uuid())
            .bind(SqlxDate::from(day))
            .fetch_optional(&mut **tx)
            .await?;

        if let Some(period) = found {
            return Ok(period);
        }

        let (start_date, end_date) = calendar::default_vacation_year(day);
        let is_default = !self.has_default(tx, company).await?;

        self.insert_period(
            tx,
            company,
            &NewVacationPeriod {
                name: format!("{}-{}", start_date.year(), end_date.year()),
                start_date,
                end_date,
                is_default,
                is_active: true,
            },
        )
        .await
    }

    pub(crate) async fn upsert_allocation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        period: PeriodUuid,
        upsert: &AllocationUpsert,
    ) -> Result<VacationAllocationRecord, sqlx::Error> {
        query_as::<Postgres, VacationAllocationRecord>(UPSERT_ALLOCATION_SQL)
            .bind(AllocationUuid::new().into_uuid())
            .bind(upsert.user_uuid.into_uuid())
            .bind(period.into_uuid())
            .bind(upsert.total_days)
            .bind(upsert.carried_over_days)
            .bind(&upsert.notes)
            .fetch_one(&mut **tx)
            .await
    }

    /// Create a zero allocation when none exists, then lock and return it.
    pub(crate) async fn lock_allocation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        period: PeriodUuid,
    ) -> Result<VacationAllocationRecord, sqlx::Error> {
        query(ENSURE_ALLOCATION_SQL)
            .bind(AllocationUuid::new().into_uuid())
            .bind(user.into_uuid())
            .bind(period.into_uuid())
            .execute(&mut **tx)
            .await?;

        query_as::<Postgres, VacationAllocationRecord>(FIND_ALLOCATION_FOR_UPDATE_SQL)
            .bind(user.into_uuid())
            .bind(period.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn adjust_days_used(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        period: PeriodUuid,
        delta: f64,
    ) -> Result<VacationAllocationRecord, sqlx::Error> {
        query_as::<Postgres, VacationAllocationRecord>(ADJUST_ALLOCATION_DAYS_USED_SQL)
            .bind(user.into_uuid())
            .bind(period.into_uuid())
            .bind(delta)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_allocations_for_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        user: UserUuid,
    ) -> Result<Vec<VacationAllocationRecord>, sqlx::Error> {
        query_as::<Postgres, VacationAllocationRecord>(LIST_ALLOCATIONS_FOR_USER_SQL)
            .bind(user.into_uuid())
            .bind(company.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn sum_pending_days(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        period: PeriodUuid,
    ) -> Result<f64, sqlx::Error> {
        query_scalar::<Postgres, f64>(SUM_PENDING_DAYS_SQL)
            .bind(user.into_uuid())
            .bind(period.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for VacationPeriodRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: PeriodUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            company_uuid: CompanyUuid::from_uuid(row.try_get::<Uuid, _>("company_uuid")?),
            name: row.try_get("name")?,
            start_date: row.try_get::<SqlxDate, _>("start_date")?.to_jiff(),
            end_date: row.try_get::<SqlxDate, _>("end_date")?.to_jiff(),
            is_default: row.try_get("is_default")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for VacationAllocationRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: AllocationUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get::<Uuid, _>("user_uuid")?),
            period_uuid: PeriodUuid::from_uuid(row.try_get::<Uuid, _>("period_uuid")?),
            total_days: row.try_get("total_days")?,
            carried_over_days: row.try_get("carried_over_days")?,
            days_used: row.try_get("days_used")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
