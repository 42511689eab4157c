//! Audit repository.
//!
//! `record` takes the caller's transaction so the event commits or aborts
//! with the operation it describes; an audit row describing an operation
//! that never happened must not be possible.

use jiff_sqlx::Timestamp as SqlxTimestamp;
use serde_json::Value;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};
use uuid::Uuid;

use crate::domain::{
    audit::records::{AuditAction, AuditEventRecord, AuditEventUuid, AuditFilter, NewAuditEvent},
    companies::records::CompanyUuid,
    users::records::UserUuid,
};

const INSERT_AUDIT_EVENT_SQL: &str = include_str!("sql/insert_audit_event.sql");
const LIST_AUDIT_EVENTS_SQL: &str = include_str!("sql/list_audit_events.sql");
const FIND_AUDIT_EVENT_BY_UUID_SQL: &str = include_str!("sql/find_audit_event_by_uuid.sql");

#[derive(Debug, Clone, Default)]
pub struct PgAuditRepository;

impl PgAuditRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub(crate) async fn record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event: &NewAuditEvent,
    ) -> Result<AuditEventRecord, sqlx::Error> {
        query_as::<Postgres, AuditEventRecord>(INSERT_AUDIT_EVENT_SQL)
            .bind(AuditEventUuid::new().into_uuid())
            .bind(event.company_uuid.into_uuid())
            .bind(event.actor_uuid.map(UserUuid::into_uuid))
            .bind(event.action.as_str())
            .bind(&event.entity_type)
            .bind(event.entity_uuid)
            .bind(&event.before)
            .bind(&event.after)
            .bind(&event.ip)
            .bind(&event.user_agent)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        filter: &AuditFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEventRecord>, sqlx::Error> {
        query_as::<Postgres, AuditEventRecord>(LIST_AUDIT_EVENTS_SQL)
            .bind(company.into_uuid())
            .bind(filter.actor_uuid.map(UserUuid::into_uuid))
            .bind(filter.action.map(AuditAction::as_str))
            .bind(&filter.entity_type)
            .bind(filter.entity_uuid)
            .bind(filter.from.map(SqlxTimestamp::from))
            .bind(filter.to.map(SqlxTimestamp::from))
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_uuid(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company: CompanyUuid,
        event: AuditEventUuid,
    ) -> Result<Option<AuditEventRecord>, sqlx::Error> {
        query_as::<Postgres, AuditEventRecord>(FIND_AUDIT_EVENT_BY_UUID_SQL)
            .bind(company.into_uuid())
            .bind(event.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for AuditEventRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let action_raw: String = row.try_get("action")?;
        let action = AuditAction::parse(&action_raw).map_err(|raw| sqlx::Error::ColumnDecode {
            index: "action".to_string(),
            source: format!("unknown audit action '{raw}'").into(),
        })?;

        Ok(Self {
            uuid: AuditEventUuid::from_uuid(row.try_get::<Uuid, _>("uuid")?),
            company_uuid: CompanyUuid::from_uuid(row.try_get::<Uuid, _>("company_uuid")?),
            actor_uuid: row
                .try_get::<Option<Uuid>, _>("actor_uuid")?
                .map(UserUuid::from_uuid),
            action,
            entity_type: row.try_get("entity_type")?,
            entity_uuid: row.try_get("entity_uuid")?,
            before: row.try_get::<Option<Value>, _>("before")?,
            after: row.try_get::<Option<Value>, _>("after")?,
            ip: row.try_get("ip")?,
            user_agent: row.try_get("user_agent")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
