//! Security response headers.

use salvo::prelude::*;

const CSP: &str = "default-src 'self'; frame-ancestors 'self'; base-uri 'self'";

/// Conservative headers applied to every response.
#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    ctrl.call_next(req, depot, res).await;

    let _ = res.add_header("Strict-Transport-Security", "max-age=63072000; includeSubDomains", true);
    let _ = res.add_header("X-Content-Type-Options", "nosniff", true);
    let _ = res.add_header("X-Frame-Options", "SAMEORIGIN", true);
    let _ = res.add_header("Referrer-Policy", "strict-origin-when-cross-origin", true);
    let _ = res.add_header("Content-Security-Policy", CSP, true);
}

#[cfg(test)]
mod tests {
    use salvo::test::TestClient;

    use super::*;

    #[salvo::handler]
    async fn ok(res: &mut Response) {
        res.render("ok");
    }

    #[tokio::test]
    async fn test_headers_present_on_every_response() {
        let router = Router::new().hoop(handler).push(Router::new().get(ok));

        let res = TestClient::get("http://example.com")
            .send(&Service::new(router))
            .await;

        for header in [
            "strict-transport-security",
            "x-content-type-options",
            "x-frame-options",
            "referrer-policy",
            "content-security-policy",
        ] {
            assert!(res.headers().contains_key(header), "{header} missing");
        }
    }
}
