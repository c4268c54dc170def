use std::sync::Arc;

use salvo::catch_panic::CatchPanic;
use salvo::cors::{AllowHeaders, AllowMethods, AllowOrigin, Cors};
use salvo::http::{Method, header};
use salvo::prelude::*;

use crate::handlers::{health, session};
use crate::request_id::request_id;
use crate::state::RendezvousState;

/// A hoop that injects the shared [`RendezvousState`] into every request's
/// [`Depot`], so handlers reach it via `depot.obtain` instead of a
/// process-global `OnceLock` (see `state.rs`'s doc comment for why this
/// departs from the teacher's admin-server idiom here specifically).
struct InjectState(Arc<RendezvousState>);

#[async_trait::async_trait]
impl Handler for InjectState {
    async fn handle(&self, _req: &mut Request, depot: &mut Depot, _res: &mut Response, _ctrl: &mut FlowCtrl) {
        depot.inject(self.0.clone());
    }
}

/// Builds the rendezvous HTTP surface of spec.md §6: CORS permissive over
/// the documented methods/headers, a panic-catching hoop (so one handler
/// panic never takes the whole listener down, mirroring the teacher's
/// workspace-wide `catch-panic` feature flag), a request-id stamp, and the
/// six endpoints.
pub fn router(state: Arc<RendezvousState>) -> Router {
    let cors = Cors::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([header::CONTENT_TYPE, header::AUTHORIZATION]))
        .into_handler();

    Router::with_hoop(CatchPanic::new())
        .hoop(cors)
        .hoop(request_id)
        .hoop(InjectState(state))
        .push(Router::with_path("/health").get(health::health))
        // Mutating endpoints are routed with `.goal()` (no method filter)
        // so every method reaches the handler, which answers wrong-method
        // requests with an explicit 405 itself (see
        // `handlers::session::require_method`) instead of falling through
        // to salvo's unmatched-route 404.
        .push(Router::with_path("/session/create").goal(session::create))
        .push(Router::with_path("/session/join").goal(session::join))
        .push(Router::with_path("/session/{id}/status").get(session::status))
        .push(Router::with_path("/session/{id}/connect").goal(session::connect))
        .push(Router::with_path("/session/{id}").goal(session::delete))
        .push(Router::with_path("/internal/validate").goal(session::validate))
}
