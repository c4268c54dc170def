//! The peer-side bridge: waits for a pre-existing local TCP listener to
//! appear, then couples it to an already-authenticated relay socket handed
//! in from outside (the relay connection's own authentication is the
//! caller's concern — this crate only forwards bytes once it has one).

mod bridge;
mod error;
mod state;
mod target;

pub use bridge::Bridge;
pub use error::BridgeError;
pub use state::BridgeState;
pub use target::LocalTarget;
