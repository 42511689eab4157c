//! App Router

use furlough_app::rategate::RateCategory;
use salvo::Router;

use crate::{
    audit, auth, exports, invites, middleware, org, periods, users, vacations,
};

/// Everything under `/api/v1`. Auth endpoints are public (they carry their
/// own rate keys); the rest sits behind the bearer-token middleware.
pub(crate) fn app_router() -> Router {
    Router::with_path("api/v1")
        .push(auth_router())
        .push(protected_router())
}

fn auth_router() -> Router {
    Router::with_path("auth")
        .push(Router::with_path("login").post(auth::handlers::login::handler))
        .push(Router::with_path("logout").post(auth::handlers::logout::handler))
        .push(Router::with_path("refresh").post(auth::handlers::refresh::handler))
        .push(Router::with_path("invite/accept").post(auth::handlers::accept_invite::handler))
        .push(
            Router::with_path("password")
                .push(
                    Router::with_path("reset/request")
                        .post(auth::handlers::reset_request::handler),
                )
                .push(
                    Router::with_path("reset/confirm")
                        .post(auth::handlers::reset_confirm::handler),
                )
                .push(
                    Router::with_path("change")
                        .hoop(middleware::auth::handler)
                        .post(auth::handlers::change_password::handler),
                ),
        )
}

fn protected_router() -> Router {
    Router::new()
        .hoop(middleware::auth::handler)
        .push(
            Router::new()
                .hoop(middleware::ratelimit::RateLimit(RateCategory::ApiDefault))
                .push(Router::with_path("me").get(users::handlers::me::handler))
                .push(
                    Router::with_path("users")
                        .get(users::handlers::index::handler)
                        .push(
                            Router::with_path("{user}")
                                .get(users::handlers::get::handler)
                                .put(users::handlers::update::handler)
                                .delete(users::handlers::delete::handler),
                        ),
                )
                .push(
                    Router::with_path("admin/invites")
                        .get(invites::handlers::index::handler)
                        .post(invites::handlers::create::handler)
                        .push(
                            Router::with_path("{invite}")
                                .delete(invites::handlers::delete::handler),
                        ),
                )
                .push(
                    Router::with_path("companies/{company}")
                        .get(org::handlers::get_company::handler)
                        .push(
                            Router::with_path("functions")
                                .get(org::handlers::list_functions::handler),
                        )
                        .push(Router::with_path("teams").get(org::handlers::list_teams::handler)),
                )
                .push(Router::with_path("teams/{team}").get(org::handlers::get_team::handler))
                .push(
                    Router::with_path("periods")
                        .get(periods::handlers::index::handler)
                        .post(periods::handlers::create::handler)
                        .push(
                            Router::with_path("{period}")
                                .put(periods::handlers::update::handler)
                                .push(
                                    Router::with_path("allocations")
                                        .post(periods::handlers::upsert_allocation::handler),
                                ),
                        ),
                )
                .push(
                    Router::with_path("audit-logs")
                        .get(audit::handlers::index::handler)
                        .push(Router::with_path("{event}").get(audit::handlers::get::handler)),
                ),
        )
        .push(vacations_router())
        .push(
            Router::with_path("exports/vacations")
                .hoop(middleware::ratelimit::RateLimit(RateCategory::Export))
                .get(exports::handlers::vacations::handler),
        )
}

fn vacations_router() -> Router {
    // Reads and writes carry different budgets, so the path splits into two
    // sibling routers; salvo tries them in order.
    let reads = Router::with_path("vacations")
        .hoop(middleware::ratelimit::RateLimit(RateCategory::VacationRead))
        .get(vacations::handlers::index::handler)
        .push(Router::with_path("balance").get(vacations::handlers::balance::handler))
        .push(Router::with_path("{request}").get(vacations::handlers::get::handler));

    let writes = Router::with_path("vacations")
        .hoop(middleware::ratelimit::RateLimit(RateCategory::VacationWrite))
        .post(vacations::handlers::create::handler)
        .push(
            Router::with_path("{request}")
                .put(vacations::handlers::update::handler)
                .push(Router::with_path("submit").post(vacations::handlers::submit::handler))
                .push(Router::with_path("approve").post(vacations::handlers::approve::handler))
                .push(Router::with_path("reject").post(vacations::handlers::reject::handler))
                .push(Router::with_path("cancel").post(vacations::handlers::cancel::handler))
                .push(Router::with_path("withdraw").post(vacations::handlers::withdraw::handler)),
        );

    Router::new().push(reads).push(writes)
}

#[cfg(test)]
mod tests {
    use salvo::{
        prelude::*,
        test::TestClient,
    };
    use uuid::Uuid;

    use crate::test_helpers::full_mock_service;

    use super::app_router;

    async fn status_of(method: &str, path: &str) -> Option<StatusCode> {
        let service = full_mock_service(app_router());
        let url = format!("http://example.com{path}");

        let res = match method {
            "GET" => TestClient::get(url).send(&service).await,
            "POST" => TestClient::post(url).send(&service).await,
            "PUT" => TestClient::put(url).send(&service).await,
            "DELETE" => TestClient::delete(url).send(&service).await,
            other => panic!("unsupported method {other}"),
        };

        res.status_code
    }

    #[tokio::test]
    async fn test_auth_routes_are_registered() {
        for path in [
            "/api/v1/auth/login",
            "/api/v1/auth/logout",
            "/api/v1/auth/refresh",
            "/api/v1/auth/invite/accept",
            "/api/v1/auth/password/reset/request",
            "/api/v1/auth/password/reset/confirm",
            "/api/v1/auth/password/change",
        ] {
            let status = status_of("POST", path).await;

            assert_ne!(status, Some(StatusCode::NOT_FOUND), "POST {path} should be registered");
        }
    }

    #[tokio::test]
    async fn test_vacation_routes_are_registered() {
        let id = Uuid::nil();

        assert_ne!(status_of("GET", "/api/v1/vacations").await, Some(StatusCode::NOT_FOUND));
        assert_ne!(status_of("POST", "/api/v1/vacations").await, Some(StatusCode::NOT_FOUND));
        assert_ne!(
            status_of("GET", "/api/v1/vacations/balance").await,
            Some(StatusCode::NOT_FOUND),
        );

        for action in ["submit", "approve", "reject", "cancel", "withdraw"] {
            let status = status_of("POST", &format!("/api/v1/vacations/{id}/{action}")).await;

            assert_ne!(status, Some(StatusCode::NOT_FOUND), "POST {action} should be registered");
        }
    }

    #[tokio::test]
    async fn test_protected_routes_require_auth() {
        for path in ["/api/v1/me", "/api/v1/users", "/api/v1/audit-logs", "/api/v1/vacations"] {
            let status = status_of("GET", path).await;

            assert_eq!(status, Some(StatusCode::UNAUTHORIZED), "GET {path} should require auth");
        }
    }

    #[tokio::test]
    async fn test_export_route_is_registered() {
        assert_ne!(
            status_of("GET", "/api/v1/exports/vacations").await,
            Some(StatusCode::NOT_FOUND),
        );
    }
}
