//! The rendezvous HTTP surface: thin `salvo` handlers over the session
//! store, token signer and rate limiter. Every handler here is an adapter;
//! none of the invariants from spec.md §3/§4.3 live in this crate, they
//! live in `burrow-session` and `burrow-token`.

mod config;
mod error;
mod handlers;
mod request_id;
mod router;
mod state;

pub use config::{ConfigError, RendezvousConfig, INSECURE_DEFAULT_SECRET};
pub use error::RendezvousError;
pub use router::router;
pub use state::RendezvousState;
