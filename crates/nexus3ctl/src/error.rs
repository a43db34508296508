//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use nexus3_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// The run finished but some actions failed.
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Nexus is unavailable")]
    #[diagnostic(
        code(nexus3ctl::unavailable),
        help(
            "Check that the server is running and that --url points at it.\n\
             Detail: {message}"
        )
    )]
    Unavailable { message: String },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(nexus3ctl::tls),
        help(
            "Use --insecure (-k) to accept a self-signed certificate,\n\
             or point --ca-cert (or ca_cert in your profile) at the issuing CA."
        )
    )]
    Tls { message: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(nexus3ctl::timeout),
        help("Increase the timeout with --timeout or check server responsiveness.\nDetail: {message}")
    )]
    Timeout { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(nexus3ctl::auth_failed),
        help("Verify the username and password (--user / --password or NEXUS3_USERNAME / NEXUS3_PASSWORD).")
    )]
    AuthFailed,

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(nexus3ctl::no_credentials),
        help(
            "Pass --user and --password, set NEXUS3_USERNAME and NEXUS3_PASSWORD,\n\
             or add username and password (or password_env) to the profile."
        )
    )]
    NoCredentials { profile: String },

    #[error("No Nexus server configured")]
    #[diagnostic(
        code(nexus3ctl::no_server),
        help(
            "Pass --url (or set NEXUS3_URL), or add a profile with a url to\n\
             {path}"
        )
    )]
    NoServer { path: String },

    // ── Selection ────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(nexus3ctl::invalid_selector),
        help("Types: ALL, NONE, repos, ldap, roles, realms (prefix with - to remove).")
    )]
    InvalidSelector { message: String },

    // ── Remote ───────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(nexus3ctl::rejected))]
    Rejected { message: String },

    // ── Local snapshot ───────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(nexus3ctl::snapshot))]
    Snapshot { message: String },

    // ── Reconciliation ───────────────────────────────────────────────
    #[error("{failed} of {total} actions failed")]
    #[diagnostic(
        code(nexus3ctl::partial),
        help("Failed actions are listed above; re-run once the cause is fixed.")
    )]
    Partial { failed: usize, total: usize },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nexus3ctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(nexus3ctl::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(nexus3ctl::config))]
    Config(Box<figment::Error>),

    // ── Output ───────────────────────────────────────────────────────
    #[error("Could not render output: {0}")]
    #[diagnostic(code(nexus3ctl::render))]
    Render(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unavailable { .. } | Self::Tls { .. } => exit_code::CONNECTION,
            Self::AuthFailed | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Partial { .. } => exit_code::PARTIAL,
            Self::InvalidSelector { .. }
            | Self::Validation { .. }
            | Self::NoServer { .. }
            | Self::ProfileNotFound { .. } => exit_code::USAGE,
            Self::Rejected { .. }
            | Self::Snapshot { .. }
            | Self::Config(_)
            | Self::Render(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidSelector { message } => CliError::InvalidSelector { message },
            CoreError::RemoteUnavailable { message } => CliError::Unavailable { message },
            CoreError::Timeout { message } => CliError::Timeout { message },
            CoreError::AuthFailure { .. } => CliError::AuthFailed,
            err @ CoreError::RemoteRejected { .. } => CliError::Rejected {
                message: err.to_string(),
            },
            err @ (CoreError::CorruptSnapshot { .. } | CoreError::Io { .. }) => {
                CliError::Snapshot {
                    message: err.to_string(),
                }
            }
            CoreError::Config { message } => CliError::Validation {
                field: "connection".into(),
                reason: message,
            },
        }
    }
}
