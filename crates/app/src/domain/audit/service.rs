//! Audit service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    authz::{self, Action, Operation, Principal, Resource},
    database::Db,
    domain::audit::{
        errors::AuditServiceError,
        records::{AuditEventRecord, AuditEventUuid, AuditFilter, NewAuditEvent},
        repository::PgAuditRepository,
    },
};

/// Hard cap on a single audit page.
const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Clone)]
pub struct PgAuditService {
    db: Db,
    repository: PgAuditRepository,
}

impl PgAuditService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgAuditRepository::new(),
        }
    }
}

#[async_trait]
impl AuditService for PgAuditService {
    async fn record(&self, event: NewAuditEvent) -> Result<(), AuditServiceError> {
        let mut tx = self.db.begin_company_transaction(event.company_uuid).await?;

        self.repository.record(&mut tx, &event).await?;

        tx.commit().await?;

        Ok(())
    }

    async fn query(
        &self,
        principal: &Principal,
        filter: AuditFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEventRecord>, AuditServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::AuditEvent, Action::List))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let events = self
            .repository
            .list(&mut tx, scope.company, &filter, limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
            .await?;

        tx.commit().await?;

        Ok(events)
    }

    async fn get(
        &self,
        principal: &Principal,
        event: AuditEventUuid,
    ) -> Result<AuditEventRecord, AuditServiceError> {
        let scope = authz::authorize(principal, Operation::new(Resource::AuditEvent, Action::Read))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let record = self
            .repository
            .find_by_uuid(&mut tx, scope.company, event)
            .await?
            .ok_or(AuditServiceError::NotFound)?;

        tx.commit().await?;

        Ok(record)
    }
}

#[automock]
#[async_trait]
pub trait AuditService: Send + Sync {
    /// Record a standalone event in its own transaction.
    ///
    /// State-changing operations do not go through here; their services
    /// write audit rows inside the same transaction as the change. This
    /// entry point exists for events with no accompanying write: login
    /// successes, authorization denials, replay detections.
    async fn record(&self, event: NewAuditEvent) -> Result<(), AuditServiceError>;

    /// Filtered page of events, newest first (uuid breaks created_at ties).
    async fn query(
        &self,
        principal: &Principal,
        filter: AuditFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEventRecord>, AuditServiceError>;

    async fn get(
        &self,
        principal: &Principal,
        event: AuditEventUuid,
    ) -> Result<AuditEventRecord, AuditServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        domain::{audit::records::AuditAction, users::records::Role},
        test::TestContext,
    };

    use super::*;

    #[tokio::test]
    async fn recorded_events_query_newest_first() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&admin, &[]);

        for action in [AuditAction::LoginSucceeded, AuditAction::PasswordChanged] {
            ctx.app
                .audit
                .record(NewAuditEvent::new(
                    ctx.company.uuid,
                    Some(admin.uuid),
                    action,
                    "user",
                    Some(admin.uuid.into_uuid()),
                ))
                .await?;
        }

        let events = ctx
            .app
            .audit
            .query(&principal, AuditFilter::default(), 50, 0)
            .await?;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, AuditAction::PasswordChanged, "newest first");
        assert!(events[0].created_at >= events[1].created_at);

        Ok(())
    }

    #[tokio::test]
    async fn query_filters_by_action_and_entity() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&admin, &[]);

        ctx.app
            .audit
            .record(NewAuditEvent::new(
                ctx.company.uuid,
                Some(admin.uuid),
                AuditAction::LoginSucceeded,
                "user",
                Some(admin.uuid.into_uuid()),
            ))
            .await?;

        ctx.app
            .audit
            .record(NewAuditEvent::new(
                ctx.company.uuid,
                Some(admin.uuid),
                AuditAction::TeamCreated,
                "team",
                None,
            ))
            .await?;

        let filtered = ctx
            .app
            .audit
            .query(
                &principal,
                AuditFilter {
                    action: Some(AuditAction::TeamCreated),
                    ..Default::default()
                },
                50,
                0,
            )
            .await?;

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].entity_type, "team");

        let by_entity = ctx
            .app
            .audit
            .query(
                &principal,
                AuditFilter {
                    entity_type: Some("user".to_string()),
                    ..Default::default()
                },
                50,
                0,
            )
            .await?;

        assert_eq!(by_entity.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn non_admin_cannot_read_the_trail() {
        let ctx = TestContext::new().await;
        let manager = ctx.create_user("m1@co.example", Role::Manager, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&manager, &[]);

        let result = ctx
            .app
            .audit
            .query(&principal, AuditFilter::default(), 50, 0)
            .await;

        assert!(matches!(result, Err(AuditServiceError::NotAuthorized)), "{result:?}");
    }

    #[tokio::test]
    async fn audit_rows_cannot_be_updated_or_deleted() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;

        ctx.app
            .audit
            .record(NewAuditEvent::new(
                ctx.company.uuid,
                Some(admin.uuid),
                AuditAction::LoginSucceeded,
                "user",
                None,
            ))
            .await?;

        // Even the superuser connection trips the append-only trigger.
        let update = sqlx::query("UPDATE audit_events SET action = 'tampered'")
            .execute(ctx.db.pool())
            .await;

        assert!(update.is_err(), "update must be rejected");

        let delete = sqlx::query("DELETE FROM audit_events")
            .execute(ctx.db.pool())
            .await;

        assert!(delete.is_err(), "delete must be rejected");

        Ok(())
    }

    #[tokio::test]
    async fn operations_that_roll_back_leave_no_audit_row() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let admin_principal = ctx.principal(&admin, &[]);
        let alice_principal = ctx.principal(&alice, &[]);

        // A failed approval (no allocation, zero balance) aborts its
        // transaction; the approval audit row must not appear.
        let request = ctx
            .app
            .requests
            .create(
                &alice_principal,
                crate::domain::requests::records::RequestPayload {
                    start_date: jiff::civil::date(2025, 7, 14),
                    end_date: jiff::civil::date(2025, 7, 18),
                    kind: crate::domain::requests::records::VacationKind::Annual,
                    reason: None,
                    team_uuid: None,
                },
                true,
            )
            .await?;

        let denied = ctx.app.requests.approve(&admin_principal, request.uuid, None).await;
        assert!(denied.is_err());

        let approvals = ctx
            .app
            .audit
            .query(
                &admin_principal,
                AuditFilter {
                    action: Some(AuditAction::RequestApproved),
                    ..Default::default()
                },
                50,
                0,
            )
            .await?;

        assert!(approvals.is_empty(), "no phantom audit rows");

        Ok(())
    }
}
