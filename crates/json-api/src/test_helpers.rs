//! Test helpers.

use std::{collections::HashSet, sync::Arc};

use jiff::Timestamp;
use salvo::{affix_state::inject, prelude::*};
use uuid::Uuid;

use furlough_app::{
    authz::Principal,
    clock::SystemClock,
    context::AppContext,
    domain::{
        audit::MockAuditService,
        companies::{MockCompaniesService, records::CompanyUuid},
        exports::{MockExportsService, records::ExportRow},
        periods::MockCalendarService,
        requests::{
            MockRequestsService,
            records::{RequestStatus, RequestUuid, VacationKind, VacationRequestRecord},
        },
        sessions::{
            MockSessionsService,
            records::{
                InviteTokenRecord, InviteTokenUuid, IssuedInvite, SessionTokens,
            },
        },
        teams::MockOrgService,
        users::{
            MockIdentityService,
            records::{Role, UserRecord, UserUuid},
        },
    },
    rategate::{RateGate, RateTable},
};

use crate::{extensions::DepotExt, state::State};

pub(crate) const TEST_PRINCIPAL_UUID: Uuid = Uuid::nil();

pub(crate) fn test_principal() -> Principal {
    Principal {
        user_uuid: UserUuid::from_uuid(TEST_PRINCIPAL_UUID),
        company_uuid: CompanyUuid::from_uuid(Uuid::nil()),
        role: Role::Admin,
        managed_teams: HashSet::new(),
    }
}

#[salvo::handler]
pub(crate) async fn inject_principal(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    depot.insert_principal(test_principal());
    ctrl.call_next(req, depot, res).await;
}

/// Every service mocked with no expectations: any call fails the test.
fn base_context() -> AppContext {
    AppContext {
        companies: Arc::new(MockCompaniesService::new()),
        identity: Arc::new(MockIdentityService::new()),
        org: Arc::new(MockOrgService::new()),
        sessions: Arc::new(MockSessionsService::new()),
        calendar: Arc::new(MockCalendarService::new()),
        requests: Arc::new(MockRequestsService::new()),
        exports: Arc::new(MockExportsService::new()),
        audit: Arc::new(MockAuditService::new()),
        rategate: Arc::new(RateGate::new(Arc::new(SystemClock), RateTable::default())),
        clock: Arc::new(SystemClock),
    }
}

pub(crate) fn state_with_sessions(sessions: MockSessionsService) -> Arc<State> {
    let mut app = base_context();
    app.sessions = Arc::new(sessions);

    State::from_app_context(app)
}

/// Unauthenticated routes: state only, no principal.
pub(crate) fn public_service(sessions: MockSessionsService, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(state_with_sessions(sessions)))
            .push(route),
    )
}

/// Authenticated routes with the sessions service mocked.
pub(crate) fn authed_service(sessions: MockSessionsService, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(state_with_sessions(sessions)))
            .hoop(inject_principal)
            .push(route),
    )
}

pub(crate) fn identity_service(identity: MockIdentityService, route: Router) -> Service {
    let mut app = base_context();
    app.identity = Arc::new(identity);

    Service::new(
        Router::new()
            .hoop(inject(State::from_app_context(app)))
            .hoop(inject_principal)
            .push(route),
    )
}

pub(crate) fn companies_service(companies: MockCompaniesService, route: Router) -> Service {
    let mut app = base_context();
    app.companies = Arc::new(companies);

    Service::new(
        Router::new()
            .hoop(inject(State::from_app_context(app)))
            .hoop(inject_principal)
            .push(route),
    )
}

pub(crate) fn requests_service(requests: MockRequestsService, route: Router) -> Service {
    let mut app = base_context();
    app.requests = Arc::new(requests);

    Service::new(
        Router::new()
            .hoop(inject(State::from_app_context(app)))
            .hoop(inject_principal)
            .push(route),
    )
}

pub(crate) fn calendar_service(calendar: MockCalendarService, route: Router) -> Service {
    let mut app = base_context();
    app.calendar = Arc::new(calendar);

    Service::new(
        Router::new()
            .hoop(inject(State::from_app_context(app)))
            .hoop(inject_principal)
            .push(route),
    )
}

pub(crate) fn audit_service(audit: MockAuditService, route: Router) -> Service {
    let mut app = base_context();
    app.audit = Arc::new(audit);

    Service::new(
        Router::new()
            .hoop(inject(State::from_app_context(app)))
            .hoop(inject_principal)
            .push(route),
    )
}

pub(crate) fn exports_service(exports: MockExportsService, route: Router) -> Service {
    let mut app = base_context();
    app.exports = Arc::new(exports);

    Service::new(
        Router::new()
            .hoop(inject(State::from_app_context(app)))
            .hoop(inject_principal)
            .push(route),
    )
}

/// Whole router over strict mocks; route-registration tests only ever see
/// 400/401 responses, never a mock call.
pub(crate) fn full_mock_service(route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(State::from_app_context(base_context())))
            .push(route),
    )
}

pub(crate) fn make_user(email: &str) -> UserRecord {
    UserRecord {
        uuid: UserUuid::new(),
        company_uuid: CompanyUuid::from_uuid(Uuid::nil()),
        function_uuid: None,
        email: email.to_string(),
        password_hash: None,
        first_name: "Alice".to_string(),
        last_name: "Doe".to_string(),
        role: Role::User,
        is_active: true,
        email_verified: true,
        last_login_at: None,
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
        deleted_at: None,
    }
}

pub(crate) fn make_session_tokens() -> SessionTokens {
    SessionTokens {
        access_token: "test-access-token".to_string(),
        refresh_token: format!("fr_{}.{}", Uuid::now_v7().simple(), "ab".repeat(32)),
        refresh_expires_at: Timestamp::UNIX_EPOCH,
        user: make_user("alice@co.example"),
    }
}

pub(crate) fn make_issued_invite(email: &str) -> IssuedInvite {
    IssuedInvite {
        invite: InviteTokenRecord {
            uuid: InviteTokenUuid::new(),
            token_hash: "digest".to_string(),
            company_uuid: CompanyUuid::from_uuid(Uuid::nil()),
            function_uuid: None,
            team_uuids: Vec::new(),
            email: email.to_string(),
            role: Role::User,
            invited_by: Some(UserUuid::from_uuid(TEST_PRINCIPAL_UUID)),
            expires_at: Timestamp::UNIX_EPOCH,
            used_at: None,
            created_at: Timestamp::UNIX_EPOCH,
        },
        token: format!("fi_{}.{}", Uuid::now_v7().simple(), "cd".repeat(32)),
    }
}

pub(crate) fn make_request_record(
    start: &str,
    end: &str,
    status: &str,
    days_count: f64,
) -> VacationRequestRecord {
    VacationRequestRecord {
        uuid: RequestUuid::new(),
        company_uuid: CompanyUuid::from_uuid(Uuid::nil()),
        user_uuid: UserUuid::from_uuid(TEST_PRINCIPAL_UUID),
        team_uuid: None,
        period_uuid: None,
        start_date: start.parse().expect("valid start date"),
        end_date: end.parse().expect("valid end date"),
        kind: VacationKind::Annual,
        status: status.parse::<RequestStatus>().expect("valid status"),
        reason: None,
        approver_uuid: None,
        approved_at: None,
        rejected_reason: None,
        days_count,
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}

pub(crate) fn make_export_row(email: &str) -> ExportRow {
    ExportRow {
        request_uuid: Uuid::nil(),
        email: email.to_string(),
        first_name: "Alice".to_string(),
        last_name: "Doe".to_string(),
        team_code: Some("core".to_string()),
        start_date: "2025-07-14".parse().expect("valid date"),
        end_date: "2025-07-18".parse().expect("valid date"),
        kind: "annual".to_string(),
        status: "approved".to_string(),
        days_count: 5.0,
        approver_email: None,
        approved_at: None,
    }
}
