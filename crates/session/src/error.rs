/// Failures from any session store operation, per spec.md §4.3's operation
/// table. Rendezvous HTTP handlers map these 1:1 onto status codes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("session not found or expired")]
    NotFound,
    #[error("session already has a joiner")]
    Conflict,
    #[error("bearer token does not match this session")]
    Forbidden,
    #[error("internal error: {0}")]
    Internal(String),
}
