//! Companies repository.

use jiff_sqlx::Timestamp as SqlxTimestamp;
use serde_json::Value;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};
use uuid::Uuid;

use crate::domain::companies::records::{
    CompanyPatch, CompanyRecord, CompanySettings, CompanyUuid, NewCompany,
};

const CREATE_COMPANY_SQL: &str = include_str!("sql/create_company.sql");
const FIND_COMPANY_BY_UUID_SQL: &str = include_str!("sql/find_company_by_uuid.sql");
const FIND_COMPANY_BY_SLUG_SQL: &str = include_str!("sql/find_company_by_slug.sql");
const UPDATE_COMPANY_SQL: &str = include_str!("sql/update_company.sql");

#[derive(Debug, Clone, Default)]
pub struct PgCompaniesRepository;

impl PgCompaniesRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub async fn create_company(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: &NewCompany,
    ) -> Result<CompanyRecord, sqlx::Error> {
        query_as::<Postgres, CompanyRecord>(CREATE_COMPANY_SQL)
            .bind(company.uuid.into_uuid())
            .bind(&company.name)
            .bind(&company.slug)
            .bind(&company.domain)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_uuid(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
    ) -> Result<Option<CompanyRecord>, sqlx::Error> {
        query_as::<Postgres, CompanyRecord>(FIND_COMPANY_BY_UUID_SQL)
            .bind(company.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn find_by_slug(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        slug: &str,
    ) -> Result<Option<CompanyRecord>, sqlx::Error> {
        query_as::<Postgres, CompanyRecord>(FIND_COMPANY_BY_SLUG_SQL)
            .bind(slug)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn update_company(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        patch: &CompanyPatch,
    ) -> Result<Option<CompanyRecord>, sqlx::Error> {
        let settings = patch
            .settings
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|source| sqlx::Error::Encode(Box::new(source)))?;

        query_as::<Postgres, CompanyRecord>(UPDATE_COMPANY_SQL)
            .bind(company.into_uuid())
            .bind(&patch.name)
            .bind(&patch.domain)
            .bind(settings)
            .fetch_optional(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for CompanyRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let settings: CompanySettings = serde_json::from_value(row.try_get::<Value, _>("settings")?)
            .map_err(|source| sqlx::Error::ColumnDecode {
                index: "settings".to_string(),
                source: Box::new(source),
            })?;

        Ok(Self {
            uuid: CompanyUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            domain: row.try_get("domain")?,
            settings,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}
