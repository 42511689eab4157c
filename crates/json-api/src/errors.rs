//! API error envelope.
//!
//! Every failure renders as `{"error": {"code", "message", "details"?}}`
//! with the status code carrying the class of failure. Details hold opaque
//! identifiers only; no personal data and no token material.

use salvo::{
    Depot, Request, Response, Writer, async_trait,
    http::StatusCode,
    oapi::{self, Components, Operation, endpoint::EndpointOutRegister},
    writing::Json,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
    retry_after_secs: Option<i64>,
}

impl ApiError {
    #[must_use]
    pub(crate) fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
            retry_after_secs: None,
        }
    }

    #[must_use]
    pub(crate) fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub(crate) fn with_retry_after(mut self, secs: i64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }

    pub(crate) fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub(crate) fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "not_authenticated", "Not authenticated")
    }

    pub(crate) fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "not_authorized", "Insufficient permissions")
    }

    pub(crate) fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", "Not found")
    }

    pub(crate) fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub(crate) fn locked(retry_after_secs: i64) -> Self {
        Self::new(
            StatusCode::LOCKED,
            "login_locked",
            "Account locked due to repeated failed logins",
        )
        .with_retry_after(retry_after_secs)
    }

    pub(crate) fn rate_limited(retry_after_secs: i64) -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "Too many requests",
        )
        .with_retry_after(retry_after_secs)
    }

    pub(crate) fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "Internal server error",
        )
    }
}

#[async_trait]
impl Writer for ApiError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        res.status_code(self.status);

        if let Some(secs) = self.retry_after_secs {
            let _ = res.add_header("Retry-After", secs.to_string(), true);
        }

        res.render(Json(ErrorEnvelope {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        }));
    }
}

impl EndpointOutRegister for ApiError {
    #[inline]
    fn register(_components: &mut Components, operation: &mut Operation) {
        operation.responses.insert(
            "default",
            oapi::Response::new("Error response; see the `error` envelope for details."),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let body = serde_json::to_value(ErrorEnvelope {
            error: ErrorBody {
                code: "overlapping_request",
                message: "Dates overlap an existing request".to_string(),
                details: None,
            },
        })
        .unwrap();

        assert_eq!(body["error"]["code"], "overlapping_request");
        assert!(body["error"].get("details").is_none());
    }
}
