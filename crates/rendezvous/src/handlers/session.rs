use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use burrow_proto::{Claims, Role, SessionId};
use burrow_ratelimit::Operation;
use salvo::http::{Method, StatusCode, header};
use salvo::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::RendezvousError;
use crate::state::RendezvousState;

/// Every mutating handler in this module is routed via `.goal()` rather
/// than `.post()`/`.delete()` (see `router.rs`), so it owns its own method
/// check and can answer wrong-method requests with an explicit 405 instead
/// of falling through to salvo's unmatched-route 404 (spec.md §4.4).
fn require_method(req: &Request, method: Method) -> Result<(), RendezvousError> {
    if req.method() == &method {
        Ok(())
    } else {
        Err(RendezvousError::MethodNotAllowed(req.method().to_string()))
    }
}

/// Rejects any mutating request whose body isn't declared
/// `application/json` before it reaches `req.parse_json()` (spec.md §4.4
/// "enforce Content-Type JSON"). Parameters are allowed after `;` (e.g.
/// `application/json; charset=utf-8`).
fn require_json_content_type(req: &Request) -> Result<(), RendezvousError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case("application/json") {
        Ok(())
    } else {
        Err(RendezvousError::UnsupportedMediaType)
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_secs()
}

/// The rate limiter's identity key: the caller's socket address rather
/// than any client-supplied header, so a malicious caller cannot pick its
/// own bucket (spec.md §4.4 "rate-limit by caller identity").
fn caller_identity(req: &Request) -> String {
    req.remote_addr().to_string()
}

fn state(depot: &Depot) -> Arc<RendezvousState> {
    depot
        .obtain::<Arc<RendezvousState>>()
        .expect("RendezvousState must be injected before routing to handlers")
        .clone()
}

#[derive(Serialize)]
struct CreateResponse {
    #[serde(rename = "sessionId")]
    session_id: String,
    code: String,
    #[serde(rename = "hostToken")]
    host_token: String,
    #[serde(rename = "relayToken")]
    relay_token: String,
    #[serde(rename = "expiresAt")]
    expires_at: u64,
}

/// `POST /session/create`
#[handler]
pub async fn create(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    if let Err(e) = require_method(req, Method::POST) {
        return e.write(res);
    }

    let state = state(depot);

    if !state.limiter.allow(&caller_identity(req), Operation::SessionCreate) {
        return RendezvousError::RateLimited.write(res);
    }

    match state.store.create() {
        Ok(created) => {
            res.render(Json(CreateResponse {
                session_id: created.id.to_string(),
                code: created.code.to_string(),
                // The host's capability token doubles as its relay
                // handshake credential; both field names are populated
                // with the same value so either calling convention works
                // against spec.md §6's documented response shape.
                host_token: created.host_token.clone(),
                relay_token: created.host_token,
                expires_at: created.expires_at_unix,
            }));
        }
        Err(e) => RendezvousError::from(e).write(res),
    }
}

#[derive(Deserialize)]
struct JoinRequest {
    code: String,
}

#[derive(Serialize)]
struct JoinResponse {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "joinToken")]
    join_token: String,
    #[serde(rename = "relayToken")]
    relay_token: String,
    #[serde(rename = "hostConnected")]
    host_connected: bool,
}

/// `POST /session/join`
#[handler]
pub async fn join(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    if let Err(e) = require_method(req, Method::POST) {
        return e.write(res);
    }
    if let Err(e) = require_json_content_type(req) {
        return e.write(res);
    }

    let state = state(depot);

    if !state.limiter.allow(&caller_identity(req), Operation::SessionJoin) {
        return RendezvousError::RateLimited.write(res);
    }

    let body: JoinRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(e) => return RendezvousError::BadRequest(e.to_string()).write(res),
    };

    match state.store.join(&body.code) {
        Ok(joined) => {
            res.render(Json(JoinResponse {
                session_id: joined.id.to_string(),
                join_token: joined.joiner_token.clone(),
                relay_token: joined.joiner_token,
                host_connected: joined.host_connected,
            }));
        }
        Err(e) => RendezvousError::from(e).write(res),
    }
}

#[derive(Serialize)]
struct StatusResponse {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "hostConnected")]
    host_connected: bool,
    #[serde(rename = "joinConnected")]
    join_connected: bool,
    #[serde(rename = "expiresAt")]
    expires_at: u64,
}

fn path_session_id(req: &mut Request) -> Result<SessionId, RendezvousError> {
    req.param::<String>("id")
        .ok_or_else(|| RendezvousError::BadRequest("missing session id path segment".into()))?
        .parse()
        .map_err(|_| RendezvousError::BadRequest("session id is not valid hex".into()))
}

/// `GET /session/{id}/status`
#[handler]
pub async fn status(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let state = state(depot);

    let id = match path_session_id(req) {
        Ok(id) => id,
        Err(e) => return e.write(res),
    };

    match state.store.status(id) {
        Ok(view) => {
            res.render(Json(StatusResponse {
                session_id: id.to_string(),
                host_connected: view.host_connected,
                join_connected: view.joiner_connected,
                expires_at: view.expires_at_unix,
            }));
        }
        Err(e) => RendezvousError::from(e).write(res),
    }
}

#[derive(Deserialize)]
struct ConnectRequest {
    role: Role,
    connected: bool,
}

/// `POST /session/{id}/connect`. Per spec.md §9's resolved open question,
/// the relay is the intended sole writer of these flags; this endpoint
/// exists so the relay (or a peer, for defense-in-depth parity with the
/// documented surface) can report liveness without reaching into the
/// store directly. Rate-limited on the `SessionJoin` bucket: spec.md §4.2
/// names only two bucket classes, so this and the other non-create/join
/// mutating handlers share the higher-rate bucket rather than each
/// getting a dedicated one.
#[handler]
pub async fn connect(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    if let Err(e) = require_method(req, Method::POST) {
        return e.write(res);
    }
    if let Err(e) = require_json_content_type(req) {
        return e.write(res);
    }

    let state = state(depot);

    if !state.limiter.allow(&caller_identity(req), Operation::SessionJoin) {
        return RendezvousError::RateLimited.write(res);
    }

    let id = match path_session_id(req) {
        Ok(id) => id,
        Err(e) => return e.write(res),
    };

    let body: ConnectRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(e) => return RendezvousError::BadRequest(e.to_string()).write(res),
    };

    match state.store.set_connected(id, body.role, body.connected) {
        Ok(()) => {
            res.status_code(StatusCode::OK);
        }
        Err(e) => RendezvousError::from(e).write(res),
    }
}

/// `DELETE /session/{id}`, authenticated with `Authorization: Bearer
/// <hostToken>`. Rate-limited on the `SessionJoin` bucket (see `connect`'s
/// doc comment for why).
#[handler]
pub async fn delete(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    if let Err(e) = require_method(req, Method::DELETE) {
        return e.write(res);
    }

    let state = state(depot);

    if !state.limiter.allow(&caller_identity(req), Operation::SessionJoin) {
        return RendezvousError::RateLimited.write(res);
    }

    let id = match path_session_id(req) {
        Ok(id) => id,
        Err(e) => return e.write(res),
    };

    let Some(token) = bearer_token(req) else {
        return RendezvousError::Unauthorized.write(res);
    };

    match state.store.delete(id, &token) {
        Ok(()) => {
            res.status_code(StatusCode::OK);
        }
        Err(e) => RendezvousError::from(e).write(res),
    }
}

fn bearer_token(req: &Request) -> Option<String> {
    let header = req.headers().get(salvo::http::header::AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(|s| s.to_string())
}

#[derive(Deserialize)]
struct ValidateRequest {
    token: String,
}

#[derive(Serialize)]
struct ValidateResponse {
    #[serde(rename = "sessionId")]
    session_id: String,
    role: Role,
    valid: bool,
}

/// `POST /internal/validate`: verifies signature and expiry, then confirms
/// the referenced session still exists (spec.md §4.4's defense-in-depth
/// cross-check a relay may call alongside local signature verification).
/// Rate-limited on the `SessionJoin` bucket (see `connect`'s doc comment
/// for why).
#[handler]
pub async fn validate(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    if let Err(e) = require_method(req, Method::POST) {
        return e.write(res);
    }
    if let Err(e) = require_json_content_type(req) {
        return e.write(res);
    }

    let state = state(depot);

    if !state.limiter.allow(&caller_identity(req), Operation::SessionJoin) {
        return RendezvousError::RateLimited.write(res);
    }

    let body: ValidateRequest = match req.parse_json().await {
        Ok(body) => body,
        Err(e) => return RendezvousError::BadRequest(e.to_string()).write(res),
    };

    let claims: Claims = match state.signer.verify(&body.token, now_unix()) {
        Ok(claims) => claims,
        Err(e) => return RendezvousError::TokenInvalid(e.to_string()).write(res),
    };

    if let Err(e) = state.store.status(claims.sid) {
        return RendezvousError::from(e).write(res);
    }

    res.render(Json(ValidateResponse {
        session_id: claims.sid.to_string(),
        role: claims.role,
        valid: true,
    }));
}
