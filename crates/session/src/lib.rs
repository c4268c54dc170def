//! The authoritative session store: id- and code-indexed session records,
//! TTL enforcement, and role-token issuance via a shared [`TokenSigner`].
//!
//! [`TokenSigner`]: burrow_token::TokenSigner

mod error;
mod record;
mod store;

pub use error::StoreError;
pub use record::{CreatedSession, JoinedSession, StatusView};
pub use store::SessionStore;
