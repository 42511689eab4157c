//! Per-route rate limiting.

use std::sync::Arc;

use furlough_app::rategate::RateCategory;
use salvo::{async_trait, prelude::*};

use crate::{
    errors::ApiError,
    extensions::{DepotExt, client_ip},
    state::State,
};

/// Hoop enforcing one rate category. Authenticated routes key on the
/// principal; everything else keys on the client address.
pub(crate) struct RateLimit(pub(crate) RateCategory);

#[async_trait]
impl Handler for RateLimit {
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        let Some(state) = depot.obtain::<Arc<State>>().ok().map(Arc::clone) else {
            ApiError::internal().write(req, depot, res).await;
            ctrl.skip_rest();

            return;
        };

        let key = depot
            .principal_or_401()
            .map(|principal| principal.user_uuid.to_string())
            .unwrap_or_else(|_unauthenticated| client_ip(req));

        let decision = state.app.rategate.check_and_record(self.0, &key);

        let _ = res.add_header("X-RateLimit-Remaining", decision.remaining.to_string(), true);

        if !decision.allowed {
            ApiError::rate_limited(decision.retry_after_secs)
                .write(req, depot, res)
                .await;
            ctrl.skip_rest();

            return;
        }

        ctrl.call_next(req, depot, res).await;
    }
}
