//! The TCP relay: one listener, one task per accepted connection. Each
//! connection authenticates with a single handshake frame, then either
//! parks as a pending half or completes a pair and splices.

mod config;
mod error;
mod handshake;
mod pending;
mod server;
mod splice;
mod stream;
mod tls;

pub use config::RelayConfig;
pub use error::RelayError;
pub use pending::PendingTable;
pub use server::RelayServer;
pub use stream::RelayStream;
pub use tls::build_tls_acceptor;
