//! Calendar service.

use async_trait::async_trait;
use mockall::automock;
use serde_json::json;

use crate::{
    authz::{self, Action, Operation, Principal, Resource},
    database::Db,
    domain::{
        audit::{records::AuditAction, records::NewAuditEvent, repository::PgAuditRepository},
        periods::{
            errors::CalendarServiceError,
            records::{
                AllocationUpsert, BalanceEntry, NewVacationPeriod, PeriodPatch, PeriodUuid,
                VacationAllocationRecord, VacationPeriodRecord,
            },
            repository::PgCalendarRepository,
        },
        users::{records::UserUuid, repository::PgUsersRepository},
    },
};

#[derive(Clone)]
pub struct PgCalendarService {
    db: Db,
    calendar: PgCalendarRepository,
    users: PgUsersRepository,
    audit: PgAuditRepository,
}

impl PgCalendarService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            calendar: PgCalendarRepository::new(),
            users: PgUsersRepository::new(),
            audit: PgAuditRepository::new(),
        }
    }
}

#[async_trait]
impl CalendarService for PgCalendarService {
    async fn list_periods(
        &self,
        principal: &Principal,
    ) -> Result<Vec<VacationPeriodRecord>, CalendarServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::VacationPeriod, Action::List))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;
        let periods = self.calendar.list_periods(&mut tx, scope.company).await?;
        tx.commit().await?;

        Ok(periods)
    }

    async fn create_period(
        &self,
        principal: &Principal,
        period: NewVacationPeriod,
    ) -> Result<VacationPeriodRecord, CalendarServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::VacationPeriod, Action::Create))?;

        if period.start_date >= period.end_date {
            return Err(CalendarServiceError::InvalidDates);
        }

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        // Only one default period may exist per company.
        if period.is_default {
            self.calendar.clear_default(&mut tx, scope.company).await?;
        }

        let created = self.calendar.insert_period(&mut tx, scope.company, &period).await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::PeriodCreated,
                    "vacation_period",
                    Some(created.uuid.into_uuid()),
                )
                .with_after(json!({
                    "name": created.name,
                    "start_date": created.start_date.to_string(),
                    "end_date": created.end_date.to_string(),
                    "is_default": created.is_default,
                })),
            )
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update_period(
        &self,
        principal: &Principal,
        period: PeriodUuid,
        patch: PeriodPatch,
    ) -> Result<VacationPeriodRecord, CalendarServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::VacationPeriod, Action::Update))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let before = self
            .calendar
            .find_period_by_uuid(&mut tx, scope.company, period)
            .await?
            .ok_or(CalendarServiceError::NotFound)?;

        if patch.is_default == Some(true) && !before.is_default {
            self.calendar.clear_default(&mut tx, scope.company).await?;
        }

        let after = self
            .calendar
            .update_period(&mut tx, scope.company, period, &patch)
            .await?
            .ok_or(CalendarServiceError::NotFound)?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::PeriodUpdated,
                    "vacation_period",
                    Some(period.into_uuid()),
                )
                .with_before(json!({
                    "name": before.name,
                    "is_default": before.is_default,
                    "is_active": before.is_active,
                }))
                .with_after(json!({
                    "name": after.name,
                    "is_default": after.is_default,
                    "is_active": after.is_active,
                })),
            )
            .await?;

        tx.commit().await?;

        Ok(after)
    }

    async fn upsert_allocation(
        &self,
        principal: &Principal,
        period: PeriodUuid,
        upsert: AllocationUpsert,
    ) -> Result<VacationAllocationRecord, CalendarServiceError> {
        let scope = authz::authorize(
            principal,
            Operation::new(Resource::VacationAllocation, Action::Update),
        )?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        self.calendar
            .find_period_by_uuid(&mut tx, scope.company, period)
            .await?
            .ok_or(CalendarServiceError::NotFound)?;

        // The target user must exist in this company.
        self.users
            .find_by_uuid(
                &mut tx,
                scope.company,
                upsert.user_uuid,
                &authz::Scope::company_wide(principal).user_predicate_binds(),
            )
            .await?
            .ok_or(CalendarServiceError::NotFound)?;

        let allocation = self.calendar.upsert_allocation(&mut tx, period, &upsert).await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::AllocationUpserted,
                    "vacation_allocation",
                    Some(allocation.uuid.into_uuid()),
                )
                .with_after(json!({
                    "user_uuid": allocation.user_uuid,
                    "total_days": allocation.total_days,
                    "carried_over_days": allocation.carried_over_days,
                })),
            )
            .await?;

        tx.commit().await?;

        Ok(allocation)
    }

    async fn balance_for_user(
        &self,
        principal: &Principal,
        user: UserUuid,
    ) -> Result<Vec<BalanceEntry>, CalendarServiceError> {
        let scope = authz::authorize(
            principal,
            Operation::new(Resource::VacationAllocation, Action::Read),
        )?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        // Scope check: the target user must be visible to this principal.
        self.users
            .find_by_uuid(&mut tx, scope.company, user, &scope.user_predicate_binds())
            .await?
            .ok_or(CalendarServiceError::NotFound)?;

        let allocations = self
            .calendar
            .list_allocations_for_user(&mut tx, scope.company, user)
            .await?;

        let mut entries = Vec::with_capacity(allocations.len());

        for allocation in allocations {
            let period = self
                .calendar
                .find_period_by_uuid(&mut tx, scope.company, allocation.period_uuid)
                .await?
                .ok_or(CalendarServiceError::NotFound)?;

            let pending_days = self
                .calendar
                .sum_pending_days(&mut tx, user, allocation.period_uuid)
                .await?;

            entries.push(BalanceEntry {
                period,
                allocation,
                pending_days,
            });
        }

        tx.commit().await?;

        Ok(entries)
    }
}

#[automock]
#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn list_periods(
        &self,
        principal: &Principal,
    ) -> Result<Vec<VacationPeriodRecord>, CalendarServiceError>;

    /// Admin-only. Marking the new period default demotes the previous one.
    async fn create_period(
        &self,
        principal: &Principal,
        period: NewVacationPeriod,
    ) -> Result<VacationPeriodRecord, CalendarServiceError>;

    async fn update_period(
        &self,
        principal: &Principal,
        period: PeriodUuid,
        patch: PeriodPatch,
    ) -> Result<VacationPeriodRecord, CalendarServiceError>;

    /// Admin-only allocation figures for a user in a period. `days_used`
    /// is never set here; only request transitions move it.
    async fn upsert_allocation(
        &self,
        principal: &Principal,
        period: PeriodUuid,
        upsert: AllocationUpsert,
    ) -> Result<VacationAllocationRecord, CalendarServiceError>;

    /// Balance projection over every allocated period. Read-only.
    async fn balance_for_user(
        &self,
        principal: &Principal,
        user: UserUuid,
    ) -> Result<Vec<BalanceEntry>, CalendarServiceError>;
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use testresult::TestResult;

    use crate::{
        database::Db,
        domain::{periods::repository::PgCalendarRepository, users::records::Role},
        test::TestContext,
    };

    use super::*;

    fn period(name: &str, start: jiff::civil::Date, end: jiff::civil::Date) -> NewVacationPeriod {
        NewVacationPeriod {
            name: name.to_string(),
            start_date: start,
            end_date: end,
            is_default: false,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn only_one_default_period_per_company() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&admin, &[]);

        let mut first = period("2024-2025", date(2024, 4, 1), date(2025, 3, 31));
        first.is_default = true;
        let first = ctx.app.calendar.create_period(&principal, first).await?;

        let mut second = period("2025-2026", date(2025, 4, 1), date(2026, 3, 31));
        second.is_default = true;
        let second = ctx.app.calendar.create_period(&principal, second).await?;

        assert!(second.is_default);

        let periods = ctx.app.calendar.list_periods(&principal).await?;
        let defaults: Vec<_> = periods.iter().filter(|p| p.is_default).collect();

        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].uuid, second.uuid);
        assert_ne!(first.uuid, second.uuid);

        Ok(())
    }

    #[tokio::test]
    async fn period_resolution_prefers_default_then_earliest_start_then_name() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&admin, &[]);

        // Three overlapping periods all covering 2025-07-01.
        ctx.app
            .calendar
            .create_period(&principal, period("b-late", date(2025, 6, 1), date(2025, 12, 31)))
            .await?;
        ctx.app
            .calendar
            .create_period(&principal, period("a-early", date(2025, 1, 1), date(2025, 12, 31)))
            .await?;
        let mut preferred = period("z-default", date(2025, 7, 1), date(2025, 7, 31));
        preferred.is_default = true;
        let preferred = ctx.app.calendar.create_period(&principal, preferred).await?;

        let repo = PgCalendarRepository::new();
        let db = Db::new(ctx.db.pool().clone());

        let mut tx = db.begin_company_transaction(ctx.company.uuid).await?;
        let resolved = repo
            .resolve_period_for_date(&mut tx, ctx.company.uuid, date(2025, 7, 1))
            .await?;
        tx.commit().await?;

        assert_eq!(resolved.uuid, preferred.uuid, "default wins");

        // Demote the default; the earliest start date wins next.
        ctx.app
            .calendar
            .update_period(
                &principal,
                preferred.uuid,
                PeriodPatch { is_default: Some(false), ..Default::default() },
            )
            .await?;

        let mut tx = db.begin_company_transaction(ctx.company.uuid).await?;
        let resolved = repo
            .resolve_period_for_date(&mut tx, ctx.company.uuid, date(2025, 7, 1))
            .await?;
        tx.commit().await?;

        assert_eq!(resolved.name, "a-early");

        Ok(())
    }

    #[tokio::test]
    async fn resolution_materializes_the_april_year_when_nothing_matches() -> TestResult {
        let ctx = TestContext::new().await;

        let repo = PgCalendarRepository::new();
        let db = Db::new(ctx.db.pool().clone());

        let mut tx = db.begin_company_transaction(ctx.company.uuid).await?;
        let resolved = repo
            .resolve_period_for_date(&mut tx, ctx.company.uuid, date(2025, 7, 14))
            .await?;
        tx.commit().await?;

        assert_eq!(resolved.start_date, date(2025, 4, 1));
        assert_eq!(resolved.end_date, date(2026, 3, 31));
        assert!(resolved.is_default, "first period becomes the default");
        assert!(resolved.is_active);

        Ok(())
    }

    #[tokio::test]
    async fn period_resolves_by_start_date_at_the_boundary() -> TestResult {
        // A request straddling two period boundaries belongs to the period
        // containing its start date.
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&admin, &[]);
        let alice_principal = ctx.principal(&alice, &[]);

        let p1 = ctx
            .app
            .calendar
            .create_period(&principal, period("2024-2025", date(2024, 4, 1), date(2025, 3, 31)))
            .await?;
        ctx.app
            .calendar
            .create_period(&principal, period("2025-2026", date(2025, 4, 1), date(2026, 3, 31)))
            .await?;

        let request = ctx
            .app
            .requests
            .create(
                &alice_principal,
                crate::domain::requests::records::RequestPayload {
                    start_date: date(2025, 3, 31),
                    end_date: date(2025, 4, 2),
                    kind: crate::domain::requests::records::VacationKind::Annual,
                    reason: None,
                    team_uuid: None,
                },
                true,
            )
            .await?;

        assert_eq!(request.period_uuid, Some(p1.uuid), "assigned by start date");

        Ok(())
    }

    #[tokio::test]
    async fn balance_includes_pending_days() -> TestResult {
        let ctx = TestContext::new().await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;
        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let admin_principal = ctx.principal(&admin, &[]);
        let alice_principal = ctx.principal(&alice, &[]);

        let request = ctx
            .app
            .requests
            .create(
                &alice_principal,
                crate::domain::requests::records::RequestPayload {
                    start_date: date(2025, 7, 14),
                    end_date: date(2025, 7, 18),
                    kind: crate::domain::requests::records::VacationKind::Annual,
                    reason: None,
                    team_uuid: None,
                },
                true,
            )
            .await?;

        ctx.app
            .calendar
            .upsert_allocation(
                &admin_principal,
                request.period_uuid.expect("period resolved"),
                AllocationUpsert {
                    user_uuid: alice.uuid,
                    total_days: 25.0,
                    carried_over_days: 2.5,
                    notes: None,
                },
            )
            .await?;

        let balance = ctx.app.calendar.balance_for_user(&alice_principal, alice.uuid).await?;

        assert_eq!(balance.len(), 1);
        assert!((balance[0].allocation.total_available() - 27.5).abs() < f64::EPSILON);
        assert!((balance[0].remaining() - 27.5).abs() < f64::EPSILON, "nothing approved yet");
        assert!((balance[0].pending_days - 5.0).abs() < f64::EPSILON);

        Ok(())
    }

    #[tokio::test]
    async fn balance_with_no_allocations_is_empty() -> TestResult {
        let ctx = TestContext::new().await;
        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&alice, &[]);

        let balance = ctx.app.calendar.balance_for_user(&principal, alice.uuid).await?;

        assert!(balance.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn non_admin_cannot_create_periods() {
        let ctx = TestContext::new().await;
        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&alice, &[]);

        let result = ctx
            .app
            .calendar
            .create_period(&principal, period("rogue", date(2025, 1, 1), date(2025, 12, 31)))
            .await;

        assert!(matches!(result, Err(CalendarServiceError::NotAuthorized)), "{result:?}");
    }
}
