use burrow_session::StoreError;
use salvo::http::StatusCode;
use serde::Serialize;

/// The rendezvous HTTP surface's own error taxonomy, mapping spec.md §7's
/// design-level kinds onto status codes. Per-concern error enum, mirroring
/// the teacher's split between `AdminError` and the store/token crates'
/// own errors rather than one workspace-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum RendezvousError {
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("request body was not valid JSON for this endpoint")]
    BadRequest(String),
    #[error("missing or invalid Authorization bearer token")]
    Unauthorized,
    #[error("token is not valid: {0}")]
    TokenInvalid(String),
    #[error("method {0} is not allowed on this endpoint")]
    MethodNotAllowed(String),
    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl RendezvousError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RendezvousError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RendezvousError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            RendezvousError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
            RendezvousError::Store(StoreError::Forbidden) => StatusCode::FORBIDDEN,
            RendezvousError::Store(StoreError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            RendezvousError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RendezvousError::Unauthorized => StatusCode::UNAUTHORIZED,
            RendezvousError::TokenInvalid(_) => StatusCode::UNAUTHORIZED,
            RendezvousError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RendezvousError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }

    /// Writes this error's status and JSON body onto `res`. A plain
    /// function rather than a `salvo::Writer` impl: every handler in this
    /// crate already takes `&mut Response` directly, matching the
    /// teacher's admin-server handler shape, so routing an error through
    /// `Result<_, RendezvousError>` and a trait impl would be the only
    /// place in the crate doing it differently.
    pub fn write(&self, res: &mut salvo::Response) {
        if !matches!(self, RendezvousError::Store(StoreError::Internal(_))) {
            tracing::warn!(error = %self, "rendezvous request rejected");
        } else {
            tracing::error!(error = %self, "rendezvous internal error");
        }
        res.status_code(self.status_code());
        res.render(salvo::writing::Json(ErrorBody {
            error: self.to_string(),
        }));
    }
}
