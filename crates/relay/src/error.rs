/// The relay's error taxonomy, per spec.md §4.5 and §7. None of these cross
/// an HTTP boundary; they classify a connection's outcome for logging and
/// for the best-effort failure envelope written back to the socket.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("handshake not received within the deadline")]
    HandshakeTimeout,
    #[error("handshake frame was not a single well-formed JSON line: {0}")]
    HandshakeMalformed(String),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("pending entry reaped before a peer arrived")]
    PairTimeout,
    #[error("max-session deadline elapsed")]
    SessionExpired,
    #[error("peer closed normally")]
    PeerClosed,
}

impl RelayError {
    /// The message placed in the handshake failure envelope, when one is
    /// still sendable. Internal-only variants (pairing/session lifecycle)
    /// never reach this because they occur after the handshake already
    /// succeeded.
    pub fn wire_message(&self) -> String {
        self.to_string()
    }
}
