//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use jetdash_config::ConfigError;
use jetdash_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_CONFIGURED: i32 = 3;
    pub const BACKEND: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the backend at {url}")]
    #[diagnostic(
        code(jetdash::connection_failed),
        help(
            "Check that the monitoring backend is running and reachable.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out")]
    #[diagnostic(
        code(jetdash::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    RequestTimeout,

    #[error("Timed out after {seconds}s waiting for {what}")]
    #[diagnostic(
        code(jetdash::wait_timeout),
        help("The backend answered slowly or not at all. Try again, or raise --wait.")
    )]
    WaitTimeout { what: String, seconds: u64 },

    // ── Targets ──────────────────────────────────────────────────────
    #[error("The {target} target is not configured")]
    #[diagnostic(
        code(jetdash::not_configured),
        help("The console backend has no remote host set. Configure one on the backend, or drop --remote.")
    )]
    NotConfigured { target: String },

    #[error("Remote target configuration error: {message}")]
    #[diagnostic(code(jetdash::target_config))]
    TargetConfig { message: String },

    // ── Operations ───────────────────────────────────────────────────
    #[error("Operation {key} is already in progress")]
    #[diagnostic(
        code(jetdash::operation_pending),
        help("Wait for it to be confirmed or to time out before retrying.")
    )]
    OperationPending { key: String },

    #[error("Operation {key} failed: {message}")]
    #[diagnostic(code(jetdash::operation_failed))]
    OperationFailed { key: String, message: String },

    #[error("Operation {key} was not confirmed in time")]
    #[diagnostic(
        code(jetdash::operation_timeout),
        help("The request was accepted but no later poll showed the expected state.")
    )]
    OperationTimedOut { key: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(jetdash::backend))]
    Backend { message: String },

    #[error("API error ({code}): {message}")]
    #[diagnostic(code(jetdash::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(jetdash::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(jetdash::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: jetdash config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No console backend configured")]
    #[diagnostic(
        code(jetdash::no_config),
        help(
            "Pass --console <URL>, or create a profile with: jetdash config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(jetdash::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(jetdash::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::RequestTimeout | Self::WaitTimeout { .. } | Self::OperationTimedOut { .. } => {
                exit_code::TIMEOUT
            }
            Self::NotConfigured { .. } | Self::TargetConfig { .. } | Self::NoConfig { .. } => {
                exit_code::NOT_CONFIGURED
            }
            Self::OperationPending { .. } => exit_code::CONFLICT,
            Self::Backend { .. } | Self::ApiError { .. } | Self::OperationFailed { .. } => {
                exit_code::BACKEND
            }
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Disconnected => CliError::ConnectionFailed {
                url: "(stopped)".into(),
                source: "Console is not running".into(),
            },

            CoreError::Timeout => CliError::RequestTimeout,

            CoreError::NotConfigured { target } => CliError::NotConfigured { target },

            CoreError::Config { message } => CliError::TargetConfig { message },

            CoreError::OperationPending { key } => CliError::OperationPending { key },

            CoreError::Backend { message } => CliError::Backend { message },

            CoreError::Api { message, status } => CliError::ApiError {
                code: status.map_or_else(|| "transport".into(), |s| s.to_string()),
                message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
