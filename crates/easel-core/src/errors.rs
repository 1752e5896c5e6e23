use std::time::Duration;

/// Typed errors from the content-generation collaborator.
/// Classifies failures as fatal (don't retry) or retryable; the pipeline
/// never retries internally, the classification feeds logs and callers.
#[derive(Clone, Debug, thiserror::Error)]
pub enum GenerationError {
    // Fatal
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    // Retryable
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("generation service overloaded")]
    Overloaded,
    #[error("network error: {0}")]
    Network(String),

    // Operational
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::Overloaded | Self::Network(_)
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_) | Self::InvalidRequest(_) | Self::InvalidResponse(_)
        )
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidResponse(_) => "invalid_response",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::Overloaded => "overloaded",
            Self::Network(_) => "network_error",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Classify an HTTP status code into the appropriate variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            400 => Self::InvalidRequest(body),
            429 => Self::RateLimited { retry_after: None },
            529 => Self::Overloaded,
            500..=599 => Self::ServerError { status, body },
            _ => Self::InvalidRequest(format!("unexpected status {status}: {body}")),
        }
    }
}

/// Typed errors from the rendering collaborator. Always contained to a
/// single thumbnail; never propagated past the rendering stage.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render service error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RenderError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http_error",
            Self::Network(_) => "network_error",
            Self::Timeout(_) => "timeout",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }

    pub fn from_status(status: u16, body: String) -> Self {
        Self::Http { status, body }
    }
}
