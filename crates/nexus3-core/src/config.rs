// ── Runtime connection configuration ──
//
// Describes *how* to reach a Nexus server. The CLI resolves flags, env vars
// and profiles once into a `NexusConfig` and hands it in; core never reads
// configuration files or the environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for connecting to a single Nexus server.
#[derive(Debug, Clone)]
pub struct NexusConfig {
    /// Server URL (e.g., `https://nexus.example.com`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Upper bound on concurrent requests.
    pub jobs: usize,
}

impl NexusConfig {
    pub(crate) fn transport(&self) -> nexus3_api::TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => nexus3_api::TlsMode::System,
            TlsVerification::CustomCa(path) => nexus3_api::TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => nexus3_api::TlsMode::DangerAcceptInvalid,
        };
        nexus3_api::TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
