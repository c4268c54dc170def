use salvo::prelude::*;
use uuid::Uuid;

/// Stamps every response with a fresh `X-Request-Id`, purely additive to
/// the wire format spec.md §6 documents — no client behavior is specified
/// to depend on it, it exists only so an operator can correlate one log
/// line across rendezvous, relay and bridge for a single attempt.
#[handler]
pub async fn request_id(res: &mut Response) {
    let id = Uuid::new_v4();
    res.headers_mut().insert(
        "x-request-id",
        id.to_string().parse().expect("uuid string is a valid header value"),
    );
}
