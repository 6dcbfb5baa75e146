use thiserror::Error;

/// Top-level error type for the `jetdash-api` crate.
///
/// Covers every failure mode of a single request against the monitoring
/// backend: transport, HTTP status, backend-reported errors, and payload
/// decoding. `jetdash-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Backend ─────────────────────────────────────────────────────
    /// Non-success HTTP status. `message` is the backend's `error` field
    /// when the body carried one, otherwise the canonical reason.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// A 2xx response whose body was `{"error": "..."}`.
    #[error("{message}")]
    Backend { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on the
    /// next poll.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the endpoint does not exist on the backend.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Http { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the request never produced an HTTP response
    /// (connection reset, refused, timed out).
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_connect() || e.is_timeout() || e.is_request())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Http {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }

    #[test]
    fn backend_errors_are_not_transient() {
        let err = Error::Backend {
            message: "arp not found".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "arp not found");
    }

    #[test]
    fn http_404_is_not_found() {
        let err = Error::Http {
            status: 404,
            message: "Not Found".into(),
        };
        assert!(err.is_not_found());
    }
}
