use thiserror::Error;

/// Failure of a single API interaction or a client-side form check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never reached the server.
    #[error("network error: {message}")]
    Network {
        /// Transport failure description.
        message: String,
    },
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {}", .server_error.as_deref().unwrap_or("request failed"))]
    Http {
        /// Status code.
        status: u16,
        /// Raw response body.
        body: String,
        /// Error string extracted from the body, when present.
        server_error: Option<String>,
    },
    /// A form check failed before any request was issued.
    #[error("{0}")]
    Validation(String),
    /// The response could not be decoded.
    #[error("malformed response: {0}")]
    Parse(String),
    /// A 2xx envelope carried `success: false`.
    #[error("{}", .error.as_deref().unwrap_or("request was rejected by the server"))]
    Rejected {
        /// Server-supplied error string.
        error: Option<String>,
    },
}

impl ApiError {
    /// Human-readable message suitable for a banner or inline alert.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Error string supplied by the server, if any.
    #[must_use]
    pub fn server_error(&self) -> Option<&str> {
        match self {
            Self::Http { server_error, .. } => server_error.as_deref(),
            Self::Rejected { error } => error.as_deref(),
            _ => None,
        }
    }

    /// HTTP status for [`ApiError::Http`].
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error came from a client-side check.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Short kind label used in telemetry.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Http { .. } => "http",
            Self::Validation(_) => "validation",
            Self::Parse(_) => "parse",
            Self::Rejected { .. } => "rejected",
        }
    }
}
