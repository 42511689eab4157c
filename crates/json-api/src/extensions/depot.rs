//! Depot helper extensions.

use std::any::Any;

use furlough_app::{authz::Principal, domain::sessions::records::ClientMeta};
use salvo::{Depot, Request, http::header::USER_AGENT};

use crate::errors::ApiError;

const PRINCIPAL_KEY: &str = "principal";

/// Helpers for mapping depot extraction failures to API errors.
pub(crate) trait DepotExt {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, ApiError>;
    fn principal_or_401(&self) -> Result<&Principal, ApiError>;
    fn insert_principal(&mut self, principal: Principal);
}

impl DepotExt for Depot {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, ApiError> {
        self.obtain::<T>().map_err(|_ignored| ApiError::internal())
    }

    fn principal_or_401(&self) -> Result<&Principal, ApiError> {
        self.get::<Principal>(PRINCIPAL_KEY)
            .ok()
            .ok_or_else(ApiError::unauthenticated)
    }

    fn insert_principal(&mut self, principal: Principal) {
        self.insert(PRINCIPAL_KEY, principal);
    }
}

/// Client address and user agent for session records and audit rows.
pub(crate) fn client_meta(req: &Request) -> ClientMeta {
    ClientMeta {
        ip: req.remote_addr().as_ipv4().map(|addr| addr.ip().to_string()).or_else(|| {
            req.remote_addr().as_ipv6().map(|addr| addr.ip().to_string())
        }),
        user_agent: req
            .headers()
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string),
    }
}

/// Rate-limit key for unauthenticated endpoints.
pub(crate) fn client_ip(req: &Request) -> String {
    client_meta(req).ip.unwrap_or_else(|| "unknown".to_string())
}
