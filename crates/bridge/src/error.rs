#[derive(Debug, thiserror::Error, Clone)]
pub enum BridgeError {
    #[error("local listener never appeared within the wait deadline")]
    Timeout,
    #[error("connecting to the local target failed: {0}")]
    ConnectFailed(String),
    #[error("forwarding stopped on an I/O error: {0}")]
    Io(String),
    #[error("cancelled")]
    Cancelled,
}
