//! Request engine.
//!
//! Every state transition locks the request row, validates the pre-state,
//! and writes the post-state together with the allocation and audit rows in
//! one transaction. A losing concurrent approver observes a non-pending
//! status and fails with `NotPending`.

use async_trait::async_trait;
use jiff::civil::Date;
use mockall::automock;
use serde_json::json;

use crate::{
    authz::{self, Action, Operation, Principal, Resource, Scope, UserScope},
    clock::Clock,
    database::Db,
    domain::{
        audit::{records::AuditAction, records::NewAuditEvent, repository::PgAuditRepository},
        companies::repository::PgCompaniesRepository,
        periods::{records::VacationPeriodRecord, repository::PgCalendarRepository},
        requests::{
            errors::RequestsServiceError,
            records::{
                RequestFilter, RequestPayload, RequestStatus, RequestUuid, VacationRequestRecord,
            },
            repository::{NewRequestRow, PgRequestsRepository},
        },
        users::records::UserUuid,
    },
};

use std::sync::Arc;

use crate::calendar::business_days;

const MAX_PAGE_SIZE: i64 = 200;

type Tx = sqlx::Transaction<'static, sqlx::Postgres>;

#[derive(Clone)]
pub struct PgRequestsService {
    db: Db,
    requests: PgRequestsRepository,
    calendar: PgCalendarRepository,
    companies: PgCompaniesRepository,
    audit: PgAuditRepository,
    clock: Arc<dyn Clock>,
}

impl PgRequestsService {
    #[must_use]
    pub fn new(db: Db, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            requests: PgRequestsRepository::new(),
            calendar: PgCalendarRepository::new(),
            companies: PgCompaniesRepository::new(),
            audit: PgAuditRepository::new(),
            clock,
        }
    }

    fn validate_dates(&self, start: Date, end: Date) -> Result<(), RequestsServiceError> {
        if end < start {
            return Err(RequestsServiceError::InvalidDates);
        }

        if start < self.clock.today() {
            return Err(RequestsServiceError::DateInPast);
        }

        Ok(())
    }

    async fn check_overlap(
        &self,
        tx: &mut Tx,
        user: UserUuid,
        start: Date,
        end: Date,
        exclude: Option<RequestUuid>,
    ) -> Result<(), RequestsServiceError> {
        let overlapping = self
            .requests
            .count_overlapping(tx, user, start, end, exclude)
            .await?;

        if overlapping > 0 {
            return Err(RequestsServiceError::OverlappingRequest);
        }

        Ok(())
    }

    async fn resolve_period(
        &self,
        tx: &mut Tx,
        scope: &Scope,
        start: Date,
    ) -> Result<VacationPeriodRecord, RequestsServiceError> {
        self.calendar
            .resolve_period_for_date(tx, scope.company, start)
            .await
            .map_err(|error| match RequestsServiceError::from(error) {
                RequestsServiceError::Sql(source) => RequestsServiceError::Sql(source),
                _other => RequestsServiceError::NoActivePeriod,
            })
    }

    /// Approvers act on their managed teams only; the admin scope is
    /// unbounded. The owner check runs against active memberships.
    async fn ensure_owner_in_scope(
        &self,
        tx: &mut Tx,
        scope: &Scope,
        owner: UserUuid,
    ) -> Result<(), RequestsServiceError> {
        match &scope.users {
            UserScope::Any => Ok(()),
            UserScope::ManagedTeams(teams) | UserScope::OwnOrManagedTeams(teams) => {
                if self.requests.user_in_teams(tx, owner, teams).await? {
                    Ok(())
                } else {
                    Err(RequestsServiceError::NotAuthorized)
                }
            }
            UserScope::Own => {
                if owner == scope.principal_uuid {
                    Ok(())
                } else {
                    Err(RequestsServiceError::NotAuthorized)
                }
            }
        }
    }

    /// Debit (positive delta) or credit the owner's allocation for the
    /// request's period, enforcing the overdraft policy on debits.
    async fn move_allocation_days(
        &self,
        tx: &mut Tx,
        scope: &Scope,
        request: &VacationRequestRecord,
        delta: f64,
    ) -> Result<(), RequestsServiceError> {
        let Some(period) = request.period_uuid else {
            return Err(RequestsServiceError::NoActivePeriod);
        };

        let allocation = self
            .calendar
            .lock_allocation(tx, request.user_uuid, period)
            .await?;

        if delta > 0.0 && allocation.remaining() - delta < 0.0 {
            let company = self
                .companies
                .find_by_uuid(tx, scope.company)
                .await?
                .ok_or(RequestsServiceError::NotFound)?;

            if !company.settings.allow_overdraft {
                return Err(RequestsServiceError::AllocationExceeded);
            }
        }

        // Credits below zero cannot happen: days_used was debited by the
        // same request's approval and the row has been locked since.
        self.calendar
            .adjust_days_used(tx, request.user_uuid, period, delta)
            .await?;

        Ok(())
    }

    fn request_snapshot(request: &VacationRequestRecord) -> serde_json::Value {
        json!({
            "status": request.status,
            "start_date": request.start_date.to_string(),
            "end_date": request.end_date.to_string(),
            "days_count": request.days_count,
        })
    }
}

#[async_trait]
impl RequestsService for PgRequestsService {
    async fn create(
        &self,
        principal: &Principal,
        payload: RequestPayload,
        submit: bool,
    ) -> Result<VacationRequestRecord, RequestsServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::VacationRequest, Action::Create))?;

        self.validate_dates(payload.start_date, payload.end_date)?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let team_uuid = match payload.team_uuid {
            Some(team) => {
                if !self.requests.user_in_teams(&mut tx, principal.user_uuid, &[team]).await? {
                    return Err(RequestsServiceError::NotTeamMember);
                }

                Some(team)
            }
            None => self.requests.find_primary_team(&mut tx, principal.user_uuid).await?,
        };

        let status = if submit { RequestStatus::Pending } else { RequestStatus::Draft };

        if submit {
            self.check_overlap(&mut tx, principal.user_uuid, payload.start_date, payload.end_date, None)
                .await?;
        }

        let period = self.resolve_period(&mut tx, &scope, payload.start_date).await?;
        let days_count = f64::from(business_days(payload.start_date, payload.end_date));

        let request = self
            .requests
            .insert_request(
                &mut tx,
                &NewRequestRow {
                    uuid: RequestUuid::new(),
                    company_uuid: scope.company,
                    user_uuid: principal.user_uuid,
                    team_uuid,
                    period_uuid: Some(period.uuid),
                    start_date: payload.start_date,
                    end_date: payload.end_date,
                    kind: payload.kind,
                    status,
                    reason: payload.reason.as_deref(),
                    days_count,
                },
            )
            .await?;

        if submit {
            self.audit
                .record(
                    &mut tx,
                    &NewAuditEvent::new(
                        scope.company,
                        Some(principal.user_uuid),
                        AuditAction::RequestSubmitted,
                        "vacation_request",
                        Some(request.uuid.into_uuid()),
                    )
                    .with_after(Self::request_snapshot(&request)),
                )
                .await?;
        }

        tx.commit().await?;

        Ok(request)
    }

    async fn submit(
        &self,
        principal: &Principal,
        request: RequestUuid,
    ) -> Result<VacationRequestRecord, RequestsServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::VacationRequest, Action::Update))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let row = self
            .requests
            .find_for_update(&mut tx, scope.company, request)
            .await?
            .ok_or(RequestsServiceError::NotFound)?;

        if row.user_uuid != principal.user_uuid {
            return Err(RequestsServiceError::NotAuthorized);
        }

        if row.status != RequestStatus::Draft {
            return Err(RequestsServiceError::NotPending);
        }

        self.validate_dates(row.start_date, row.end_date)?;
        self.check_overlap(&mut tx, row.user_uuid, row.start_date, row.end_date, Some(row.uuid))
            .await?;

        let period = self.resolve_period(&mut tx, &scope, row.start_date).await?;
        let days_count = f64::from(business_days(row.start_date, row.end_date));

        let submitted = self
            .requests
            .submit(&mut tx, scope.company, request, period.uuid, days_count)
            .await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::RequestSubmitted,
                    "vacation_request",
                    Some(request.into_uuid()),
                )
                .with_before(Self::request_snapshot(&row))
                .with_after(Self::request_snapshot(&submitted)),
            )
            .await?;

        tx.commit().await?;

        Ok(submitted)
    }

    async fn approve(
        &self,
        principal: &Principal,
        request: RequestUuid,
        comment: Option<String>,
    ) -> Result<VacationRequestRecord, RequestsServiceError> {
        let scope = authz::authorize(
            principal,
            Operation::new(Resource::VacationRequest, Action::Approve),
        )?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let row = self
            .requests
            .find_for_update(&mut tx, scope.company, request)
            .await?
            .ok_or(RequestsServiceError::NotFound)?;

        self.ensure_owner_in_scope(&mut tx, &scope, row.user_uuid).await?;

        // Nobody approves their own request, admins included.
        if row.user_uuid == principal.user_uuid {
            return Err(RequestsServiceError::NotAuthorized);
        }

        if row.status != RequestStatus::Pending {
            return Err(RequestsServiceError::NotPending);
        }

        self.move_allocation_days(&mut tx, &scope, &row, row.days_count).await?;

        let approved = self
            .requests
            .approve(&mut tx, scope.company, request, principal.user_uuid)
            .await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::RequestApproved,
                    "vacation_request",
                    Some(request.into_uuid()),
                )
                .with_before(Self::request_snapshot(&row))
                .with_after(json!({
                    "status": approved.status,
                    "days_count": approved.days_count,
                    "comment": comment,
                })),
            )
            .await?;

        tx.commit().await?;

        Ok(approved)
    }

    async fn reject(
        &self,
        principal: &Principal,
        request: RequestUuid,
        reason: String,
    ) -> Result<VacationRequestRecord, RequestsServiceError> {
        let scope = authz::authorize(
            principal,
            Operation::new(Resource::VacationRequest, Action::Reject),
        )?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let row = self
            .requests
            .find_for_update(&mut tx, scope.company, request)
            .await?
            .ok_or(RequestsServiceError::NotFound)?;

        self.ensure_owner_in_scope(&mut tx, &scope, row.user_uuid).await?;

        if row.user_uuid == principal.user_uuid {
            return Err(RequestsServiceError::NotAuthorized);
        }

        if row.status != RequestStatus::Pending {
            return Err(RequestsServiceError::NotPending);
        }

        let rejected = self
            .requests
            .reject(&mut tx, scope.company, request, principal.user_uuid, &reason)
            .await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::RequestRejected,
                    "vacation_request",
                    Some(request.into_uuid()),
                )
                .with_before(Self::request_snapshot(&row))
                .with_after(json!({ "status": rejected.status, "reason": reason })),
            )
            .await?;

        tx.commit().await?;

        Ok(rejected)
    }

    async fn cancel(
        &self,
        principal: &Principal,
        request: RequestUuid,
    ) -> Result<VacationRequestRecord, RequestsServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::VacationRequest, Action::Cancel))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let row = self
            .requests
            .find_for_update(&mut tx, scope.company, request)
            .await?
            .ok_or(RequestsServiceError::NotFound)?;

        let is_owner = row.user_uuid == principal.user_uuid;
        let manages_owner = !principal.managed_teams.is_empty()
            && self
                .requests
                .user_in_teams(
                    &mut tx,
                    row.user_uuid,
                    &principal.managed_teams.iter().copied().collect::<Vec<_>>(),
                )
                .await?;

        if !is_owner && !principal.is_admin() && !manages_owner {
            return Err(RequestsServiceError::NotAuthorized);
        }

        let was_approved = row.status == RequestStatus::Approved;

        // Approved is terminal for everything except cancellation.
        if row.status.is_terminal() && !was_approved {
            return Err(RequestsServiceError::NotPending);
        }

        if was_approved {
            self.move_allocation_days(&mut tx, &scope, &row, -row.days_count).await?;
        }

        let cancelled = self
            .requests
            .close(&mut tx, scope.company, request, RequestStatus::Cancelled)
            .await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::RequestCancelled,
                    "vacation_request",
                    Some(request.into_uuid()),
                )
                .with_before(Self::request_snapshot(&row))
                .with_after(Self::request_snapshot(&cancelled)),
            )
            .await?;

        tx.commit().await?;

        Ok(cancelled)
    }

    async fn withdraw(
        &self,
        principal: &Principal,
        request: RequestUuid,
    ) -> Result<VacationRequestRecord, RequestsServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::VacationRequest, Action::Cancel))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let row = self
            .requests
            .find_for_update(&mut tx, scope.company, request)
            .await?
            .ok_or(RequestsServiceError::NotFound)?;

        if row.user_uuid != principal.user_uuid {
            return Err(RequestsServiceError::NotAuthorized);
        }

        if row.status != RequestStatus::Approved {
            return Err(RequestsServiceError::NotPending);
        }

        if self.clock.today() >= row.start_date {
            return Err(RequestsServiceError::WithdrawTooLate);
        }

        self.move_allocation_days(&mut tx, &scope, &row, -row.days_count).await?;

        let withdrawn = self
            .requests
            .close(&mut tx, scope.company, request, RequestStatus::Withdrawn)
            .await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::RequestWithdrawn,
                    "vacation_request",
                    Some(request.into_uuid()),
                )
                .with_before(Self::request_snapshot(&row))
                .with_after(Self::request_snapshot(&withdrawn)),
            )
            .await?;

        tx.commit().await?;

        Ok(withdrawn)
    }

    async fn modify(
        &self,
        principal: &Principal,
        request: RequestUuid,
        payload: RequestPayload,
    ) -> Result<VacationRequestRecord, RequestsServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::VacationRequest, Action::Update))?;

        self.validate_dates(payload.start_date, payload.end_date)?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let row = self
            .requests
            .find_for_update(&mut tx, scope.company, request)
            .await?
            .ok_or(RequestsServiceError::NotFound)?;

        if row.user_uuid != principal.user_uuid {
            return Err(RequestsServiceError::NotAuthorized);
        }

        if row.status != RequestStatus::Draft {
            return Err(RequestsServiceError::NotDraft);
        }

        if let Some(team) = payload.team_uuid
            && !self.requests.user_in_teams(&mut tx, principal.user_uuid, &[team]).await?
        {
            return Err(RequestsServiceError::NotTeamMember);
        }

        let period = self.resolve_period(&mut tx, &scope, payload.start_date).await?;
        let days_count = f64::from(business_days(payload.start_date, payload.end_date));

        let updated = self
            .requests
            .update_draft(
                &mut tx,
                scope.company,
                request,
                payload.start_date,
                payload.end_date,
                payload.kind,
                payload.reason.as_deref(),
                payload.team_uuid.or(row.team_uuid),
                Some(period.uuid),
                days_count,
            )
            .await?;

        self.audit
            .record(
                &mut tx,
                &NewAuditEvent::new(
                    scope.company,
                    Some(principal.user_uuid),
                    AuditAction::RequestModified,
                    "vacation_request",
                    Some(request.into_uuid()),
                )
                .with_before(Self::request_snapshot(&row))
                .with_after(Self::request_snapshot(&updated)),
            )
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn get(
        &self,
        principal: &Principal,
        request: RequestUuid,
    ) -> Result<VacationRequestRecord, RequestsServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::VacationRequest, Action::Read))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let found = self
            .requests
            .find_by_uuid(&mut tx, scope.company, request, &scope.user_predicate_binds())
            .await?;

        let Some(record) = found else {
            // A miss on an explicit id is indistinguishable from a foreign
            // tenant's row by construction; record the denial either way
            // before answering not-found.
            self.audit
                .record(
                    &mut tx,
                    &NewAuditEvent::new(
                        scope.company,
                        Some(principal.user_uuid),
                        AuditAction::AccessDenied,
                        "vacation_request",
                        Some(request.into_uuid()),
                    )
                    .with_after(json!({ "code": "CrossTenantAccess" })),
                )
                .await?;

            tx.commit().await?;

            return Err(RequestsServiceError::NotFound);
        };

        tx.commit().await?;

        Ok(record)
    }

    async fn list(
        &self,
        principal: &Principal,
        filter: RequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VacationRequestRecord>, RequestsServiceError> {
        let scope =
            authz::authorize(principal, Operation::new(Resource::VacationRequest, Action::List))?;

        let mut tx = self.db.begin_company_transaction(scope.company).await?;

        let requests = self
            .requests
            .list(
                &mut tx,
                scope.company,
                &scope.user_predicate_binds(),
                &filter,
                limit.clamp(1, MAX_PAGE_SIZE),
                offset.max(0),
            )
            .await?;

        tx.commit().await?;

        Ok(requests)
    }
}

#[automock]
#[async_trait]
pub trait RequestsService: Send + Sync {
    /// Create a request for the principal. With `submit` the request lands
    /// in `pending` directly; otherwise it stays a draft, invisible to
    /// overlap checks until submitted. Start must be today or later.
    async fn create(
        &self,
        principal: &Principal,
        payload: RequestPayload,
        submit: bool,
    ) -> Result<VacationRequestRecord, RequestsServiceError>;

    /// Move a draft to pending, resolving the period and day count at
    /// submission time.
    async fn submit(
        &self,
        principal: &Principal,
        request: RequestUuid,
    ) -> Result<VacationRequestRecord, RequestsServiceError>;

    /// Approve a pending request and debit the owner's allocation. Race
    /// safe: the second of two concurrent approvers fails `NotPending`.
    async fn approve(
        &self,
        principal: &Principal,
        request: RequestUuid,
        comment: Option<String>,
    ) -> Result<VacationRequestRecord, RequestsServiceError>;

    async fn reject(
        &self,
        principal: &Principal,
        request: RequestUuid,
        reason: String,
    ) -> Result<VacationRequestRecord, RequestsServiceError>;

    /// Owner, admin, or a manager of the owner's team. Cancelling an
    /// approved request credits the days back.
    async fn cancel(
        &self,
        principal: &Principal,
        request: RequestUuid,
    ) -> Result<VacationRequestRecord, RequestsServiceError>;

    /// Owner-only cancellation of an approved request, strictly before its
    /// start date. Audited separately from cancel.
    async fn withdraw(
        &self,
        principal: &Principal,
        request: RequestUuid,
    ) -> Result<VacationRequestRecord, RequestsServiceError>;

    /// Draft-only edit with full re-validation.
    async fn modify(
        &self,
        principal: &Principal,
        request: RequestUuid,
        payload: RequestPayload,
    ) -> Result<VacationRequestRecord, RequestsServiceError>;

    async fn get(
        &self,
        principal: &Principal,
        request: RequestUuid,
    ) -> Result<VacationRequestRecord, RequestsServiceError>;

    async fn list(
        &self,
        principal: &Principal,
        filter: RequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VacationRequestRecord>, RequestsServiceError>;
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use testresult::TestResult;

    use crate::{
        domain::{
            periods::records::AllocationUpsert,
            requests::records::VacationKind,
            users::records::Role,
        },
        test::TestContext,
    };

    use super::*;

    fn payload(start: Date, end: Date) -> RequestPayload {
        RequestPayload {
            start_date: start,
            end_date: end,
            kind: VacationKind::Annual,
            reason: None,
            team_uuid: None,
        }
    }

    /// Full scenario wiring: Alice on team T with a 25-day allocation for
    /// the 2025 vacation year, and a manager of T.
    async fn scenario(ctx: &TestContext) -> (Principal, Principal) {
        let team = ctx.create_team("core").await;

        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let manager = ctx.create_user("m1@co.example", Role::Manager, "Str0ng!Passw0rd!").await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;

        ctx.add_member(team, alice.uuid).await;
        ctx.assign_manager(team, manager.uuid, admin.uuid).await;

        let alice_principal = ctx.principal(&alice, &[]);
        let manager_principal = ctx.principal(&manager, &[team]);

        // Allocate 25 days against the period the request will resolve to.
        let admin_principal = ctx.principal(&admin, &[]);
        let request = ctx
            .app
            .requests
            .create(&alice_principal, payload(date(2025, 7, 14), date(2025, 7, 18)), true)
            .await
            .expect("create request");

        ctx.app
            .calendar
            .upsert_allocation(
                &admin_principal,
                request.period_uuid.expect("period resolved at submission"),
                AllocationUpsert {
                    user_uuid: alice_principal.user_uuid,
                    total_days: 25.0,
                    carried_over_days: 0.0,
                    notes: None,
                },
            )
            .await
            .expect("allocate");

        (alice_principal, manager_principal)
    }

    #[tokio::test]
    async fn create_computes_days_and_resolves_period() -> TestResult {
        let ctx = TestContext::new().await;
        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&alice, &[]);

        let request = ctx
            .app
            .requests
            .create(&principal, payload(date(2025, 7, 14), date(2025, 7, 18)), true)
            .await?;

        assert_eq!(request.status, RequestStatus::Pending);
        assert!((request.days_count - 5.0).abs() < f64::EPSILON);
        assert!(request.period_uuid.is_some(), "period materialized on demand");

        Ok(())
    }

    #[tokio::test]
    async fn create_rejects_past_start_date() {
        let ctx = TestContext::new().await;
        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&alice, &[]);

        // Test clock is pinned to 2025-01-06.
        let result = ctx
            .app
            .requests
            .create(&principal, payload(date(2025, 1, 3), date(2025, 1, 10)), true)
            .await;

        assert!(matches!(result, Err(RequestsServiceError::DateInPast)), "{result:?}");
    }

    #[tokio::test]
    async fn overlapping_request_is_rejected_and_not_persisted() -> TestResult {
        let ctx = TestContext::new().await;
        let (alice, _manager) = scenario(&ctx).await;

        let result = ctx
            .app
            .requests
            .create(&alice, payload(date(2025, 7, 16), date(2025, 7, 20)), true)
            .await;

        assert!(matches!(result, Err(RequestsServiceError::OverlappingRequest)), "{result:?}");

        let mine = ctx
            .app
            .requests
            .list(&alice, RequestFilter::default(), 50, 0)
            .await?;

        assert_eq!(mine.len(), 1, "no second row persists");

        Ok(())
    }

    #[tokio::test]
    async fn draft_does_not_block_overlap_until_submitted() -> TestResult {
        let ctx = TestContext::new().await;
        let alice = ctx.create_user("alice@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let principal = ctx.principal(&alice, &[]);

        ctx.app
            .requests
            .create(&principal, payload(date(2025, 8, 4), date(2025, 8, 8)), false)
            .await?;

        // Same dates go through because the draft occupies nothing yet.
        let submitted = ctx
            .app
            .requests
            .create(&principal, payload(date(2025, 8, 4), date(2025, 8, 8)), true)
            .await?;

        assert_eq!(submitted.status, RequestStatus::Pending);

        Ok(())
    }

    #[tokio::test]
    async fn approve_debits_allocation_and_sets_approver() -> TestResult {
        let ctx = TestContext::new().await;
        let (alice, manager) = scenario(&ctx).await;

        let pending = ctx
            .app
            .requests
            .list(&alice, RequestFilter::default(), 50, 0)
            .await?
            .remove(0);

        let approved = ctx.app.requests.approve(&manager, pending.uuid, None).await?;

        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.approver_uuid, Some(manager.user_uuid));
        assert!(approved.approved_at.is_some());

        let balance = ctx.app.calendar.balance_for_user(&alice, alice.user_uuid).await?;

        assert_eq!(balance.len(), 1);
        assert!((balance[0].allocation.days_used - 5.0).abs() < f64::EPSILON);
        assert!((balance[0].remaining() - 20.0).abs() < f64::EPSILON);

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_approvals_settle_exactly_one_winner() -> TestResult {
        let ctx = TestContext::new().await;
        let (alice, m1) = scenario(&ctx).await;

        let m2_user = ctx.create_user("m2@co.example", Role::Manager, "Str0ng!Passw0rd!").await;
        let team = *m1.managed_teams.iter().next().expect("managed team");
        ctx.assign_manager(team, m2_user.uuid, m1.user_uuid).await;
        let m2 = ctx.principal(&m2_user, &[team]);

        let pending = ctx
            .app
            .requests
            .list(&alice, RequestFilter::default(), 50, 0)
            .await?
            .remove(0);

        let (first, second) = tokio::join!(
            ctx.app.requests.approve(&m1, pending.uuid, None),
            ctx.app.requests.approve(&m2, pending.uuid, None),
        );

        let winners = [first.is_ok(), second.is_ok()];
        assert_eq!(winners.iter().filter(|ok| **ok).count(), 1, "exactly one approval wins");

        let loser = if first.is_err() { first } else { second };
        assert!(matches!(loser, Err(RequestsServiceError::NotPending)), "{loser:?}");

        let balance = ctx.app.calendar.balance_for_user(&alice, alice.user_uuid).await?;
        assert!((balance[0].allocation.days_used - 5.0).abs() < f64::EPSILON, "debited once");

        Ok(())
    }

    #[tokio::test]
    async fn approver_cannot_approve_own_request() -> TestResult {
        let ctx = TestContext::new().await;
        let team = ctx.create_team("core").await;
        let manager = ctx.create_user("m1@co.example", Role::Manager, "Str0ng!Passw0rd!").await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;

        ctx.add_member(team, manager.uuid).await;
        ctx.assign_manager(team, manager.uuid, admin.uuid).await;

        let principal = ctx.principal(&manager, &[team]);

        let own = ctx
            .app
            .requests
            .create(&principal, payload(date(2025, 9, 1), date(2025, 9, 5)), true)
            .await?;

        let result = ctx.app.requests.approve(&principal, own.uuid, None).await;

        assert!(matches!(result, Err(RequestsServiceError::NotAuthorized)), "{result:?}");

        Ok(())
    }

    #[tokio::test]
    async fn manager_outside_team_cannot_approve() -> TestResult {
        let ctx = TestContext::new().await;
        let (alice, _manager) = scenario(&ctx).await;

        let other_team = ctx.create_team("other").await;
        let outsider = ctx.create_user("m3@co.example", Role::Manager, "Str0ng!Passw0rd!").await;
        let outsider_principal = ctx.principal(&outsider, &[other_team]);

        let pending = ctx
            .app
            .requests
            .list(&alice, RequestFilter::default(), 50, 0)
            .await?
            .remove(0);

        let result = ctx.app.requests.approve(&outsider_principal, pending.uuid, None).await;

        assert!(matches!(result, Err(RequestsServiceError::NotAuthorized)), "{result:?}");

        Ok(())
    }

    #[tokio::test]
    async fn cancelling_an_approved_request_credits_days_back() -> TestResult {
        let ctx = TestContext::new().await;
        let (alice, manager) = scenario(&ctx).await;

        let pending = ctx
            .app
            .requests
            .list(&alice, RequestFilter::default(), 50, 0)
            .await?
            .remove(0);

        ctx.app.requests.approve(&manager, pending.uuid, None).await?;

        let cancelled = ctx.app.requests.cancel(&alice, pending.uuid).await?;
        assert_eq!(cancelled.status, RequestStatus::Cancelled);

        let balance = ctx.app.calendar.balance_for_user(&alice, alice.user_uuid).await?;
        assert!((balance[0].allocation.days_used).abs() < f64::EPSILON, "allocation restored");

        Ok(())
    }

    #[tokio::test]
    async fn withdraw_only_before_start_date() -> TestResult {
        let ctx = TestContext::new().await;
        let (alice, manager) = scenario(&ctx).await;

        let pending = ctx
            .app
            .requests
            .list(&alice, RequestFilter::default(), 50, 0)
            .await?
            .remove(0);

        ctx.app.requests.approve(&manager, pending.uuid, None).await?;

        let withdrawn = ctx.app.requests.withdraw(&alice, pending.uuid).await?;
        assert_eq!(withdrawn.status, RequestStatus::Withdrawn);

        let balance = ctx.app.calendar.balance_for_user(&alice, alice.user_uuid).await?;
        assert!((balance[0].allocation.days_used).abs() < f64::EPSILON);

        Ok(())
    }

    #[tokio::test]
    async fn withdraw_after_start_is_too_late() -> TestResult {
        let ctx = TestContext::new().await;
        let (alice, manager) = scenario(&ctx).await;

        let pending = ctx
            .app
            .requests
            .list(&alice, RequestFilter::default(), 50, 0)
            .await?
            .remove(0);

        ctx.app.requests.approve(&manager, pending.uuid, None).await?;

        // Move the clock past the vacation start.
        ctx.clock.advance_secs(200 * 24 * 3600);

        let result = ctx.app.requests.withdraw(&alice, pending.uuid).await;

        assert!(matches!(result, Err(RequestsServiceError::WithdrawTooLate)), "{result:?}");

        Ok(())
    }

    #[tokio::test]
    async fn approval_without_allocation_is_denied_by_default() -> TestResult {
        let ctx = TestContext::new().await;
        let team = ctx.create_team("core").await;
        let bob = ctx.create_user("bob@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let manager = ctx.create_user("m1@co.example", Role::Manager, "Str0ng!Passw0rd!").await;
        let admin = ctx.create_user("admin@co.example", Role::Admin, "Str0ng!Passw0rd!").await;

        ctx.add_member(team, bob.uuid).await;
        ctx.assign_manager(team, manager.uuid, admin.uuid).await;

        let bob_principal = ctx.principal(&bob, &[]);
        let manager_principal = ctx.principal(&manager, &[team]);

        let request = ctx
            .app
            .requests
            .create(&bob_principal, payload(date(2025, 7, 14), date(2025, 7, 18)), true)
            .await?;

        // No allocation was ever set; the zero-balance debit is denied.
        let result = ctx.app.requests.approve(&manager_principal, request.uuid, None).await;

        assert!(matches!(result, Err(RequestsServiceError::AllocationExceeded)), "{result:?}");

        Ok(())
    }

    #[tokio::test]
    async fn user_cannot_read_anothers_request() -> TestResult {
        let ctx = TestContext::new().await;
        let (alice, _manager) = scenario(&ctx).await;

        let eve = ctx.create_user("eve@co.example", Role::User, "Str0ng!Passw0rd!").await;
        let eve_principal = ctx.principal(&eve, &[]);

        let pending = ctx
            .app
            .requests
            .list(&alice, RequestFilter::default(), 50, 0)
            .await?
            .remove(0);

        let result = ctx.app.requests.get(&eve_principal, pending.uuid).await;

        assert!(matches!(result, Err(RequestsServiceError::NotFound)), "{result:?}");

        Ok(())
    }
}
