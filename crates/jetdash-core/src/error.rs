// ── Core error types ──
//
// User-facing errors from jetdash-core. Consumers never see raw HTTP
// status codes or JSON parse failures; the `From<jetdash_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend request timed out")]
    Timeout,

    #[error("Console is not running")]
    Disconnected,

    // ── Target errors ────────────────────────────────────────────────
    #[error("The {target} target is not configured")]
    NotConfigured { target: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation {key} is already pending")]
    OperationPending { key: String },

    #[error("{message}")]
    Backend { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<jetdash_api::Error> for CoreError {
    fn from(err: jetdash_api::Error) -> Self {
        match err {
            jetdash_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() || e.is_request() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            jetdash_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            jetdash_api::Error::ClientBuild(message) => CoreError::Config { message },
            jetdash_api::Error::Http { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            jetdash_api::Error::Backend { message } => CoreError::Backend { message },
            jetdash_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_passes_through() {
        let err: CoreError = jetdash_api::Error::Backend {
            message: "container not found".into(),
        }
        .into();
        assert_eq!(err.to_string(), "container not found");
    }

    #[test]
    fn http_status_is_kept() {
        let err: CoreError = jetdash_api::Error::Http {
            status: 502,
            message: "Bad Gateway".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Api { status: Some(502), .. }));
    }
}
