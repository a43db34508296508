// ── Core error types ──
//
// Reconciliation-level errors. Consumers never see HTTP status codes or
// reqwest errors directly: the `From<nexus3_api::Error>` impl sorts
// transport failures into unavailable / auth / rejected.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Selection ────────────────────────────────────────────────────
    #[error("Invalid selector: {message}")]
    InvalidSelector { message: String },

    // ── Remote ───────────────────────────────────────────────────────
    #[error("Nexus is unavailable: {message}")]
    RemoteUnavailable { message: String },

    #[error("Nexus did not answer in time: {message}")]
    Timeout { message: String },

    #[error("Authentication failed: {message}")]
    AuthFailure { message: String },

    #[error("Rejected by Nexus{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    RemoteRejected {
        status: Option<u16>,
        message: String,
    },

    // ── Local snapshot ───────────────────────────────────────────────
    #[error("Corrupt snapshot {}: {message}", .path.display())]
    CorruptSnapshot { path: PathBuf, message: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn rejected(message: impl Into<String>) -> Self {
        Self::RemoteRejected {
            status: None,
            message: message.into(),
        }
    }

    /// Errors after which no further request can succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AuthFailure { .. })
    }

    /// Short machine-friendly label used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSelector { .. } => "invalid-selector",
            Self::RemoteUnavailable { .. } => "remote-unavailable",
            Self::Timeout { .. } => "timeout",
            Self::AuthFailure { .. } => "auth-failure",
            Self::RemoteRejected { .. } => "remote-rejected",
            Self::CorruptSnapshot { .. } => "corrupt-snapshot",
            Self::Io { .. } => "io",
            Self::Config { .. } => "config",
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nexus3_api::Error> for CoreError {
    fn from(err: nexus3_api::Error) -> Self {
        if err.is_timeout() {
            return CoreError::Timeout {
                message: err.to_string(),
            };
        }
        if err.is_unavailable() {
            return CoreError::RemoteUnavailable {
                message: err.to_string(),
            };
        }
        match err {
            nexus3_api::Error::Authentication { message } => CoreError::AuthFailure { message },
            nexus3_api::Error::Api { status, message } => CoreError::RemoteRejected {
                status: Some(status),
                message,
            },
            nexus3_api::Error::Deserialization { message, body: _ } => CoreError::RemoteRejected {
                status: None,
                message: format!("unexpected response: {message}"),
            },
            nexus3_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            nexus3_api::Error::Tls(message) => CoreError::Config { message },
            nexus3_api::Error::Transport(e) => CoreError::RemoteUnavailable {
                message: e.to_string(),
            },
        }
    }
}
