//! Wire-level primitives shared by the signer, session store, rendezvous
//! HTTP surface, relay and bridge: session identifiers, join codes, the
//! host/joiner role, and the capability token's claim set.
//!
//! Nothing in this crate performs I/O or holds any lock; it exists purely so
//! that every other crate in the workspace agrees on byte-for-byte the same
//! identifier formats and JSON field names.

mod claims;
mod code;
mod id;
mod role;

pub use claims::Claims;
pub use code::{Code, CodeError};
pub use id::SessionId;
pub use role::Role;
