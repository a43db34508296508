//! CLI-owned configuration: TOML profiles, credential resolution, and
//! translation to `nexus3_core::NexusConfig`.
//!
//! Core never sees these types -- it receives a pre-built `NexusConfig`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use nexus3_core::{NexusConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config structs ──────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when --profile is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: default_timeout(),
            jobs: default_jobs(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}
fn default_jobs() -> usize {
    4
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Nexus base URL (e.g., "https://nexus.example.com").
    pub url: Option<String>,

    pub username: Option<String>,

    /// Password (plaintext -- prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    pub insecure: Option<bool>,

    pub timeout: Option<u64>,
}

// ── Config file path ─────────────────────────────────────────────────

/// `--config` if given, otherwise the platform config directory.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    if let Some(path) = &global.config {
        return path.clone();
    }
    ProjectDirs::from("org", "nexus3ctl", "nexus3ctl").map_or_else(
        || PathBuf::from(".nexus3ctl.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the full Config from defaults, file and `NEXUS3_` environment.
///
/// Nested keys use a double underscore: `NEXUS3_DEFAULTS__TIMEOUT=30`.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_path(global)))
        .merge(Env::prefixed("NEXUS3_").split("__").only(&[
            "default_profile",
            "defaults.insecure",
            "defaults.timeout",
            "defaults.jobs",
        ]));

    Ok(figment.extract()?)
}

// ── Profile resolution ───────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Translate the config file, profile and global flags into a `NexusConfig`.
///
/// Flags and their environment variables win over the profile, the profile
/// wins over `[defaults]`.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<NexusConfig, CliError> {
    let profile_name = active_profile_name(global, config);
    let empty = Profile::default();
    let profile = match config.profiles.get(&profile_name) {
        Some(profile) => profile,
        // Only an explicitly requested profile has to exist.
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(config),
            });
        }
        None => &empty,
    };

    // 1. Server URL
    let url_str = global
        .url
        .as_deref()
        .or(profile.url.as_deref())
        .ok_or_else(|| CliError::NoServer {
            path: config_path(global).display().to_string(),
        })?;
    let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CliError::Validation {
            field: "url".into(),
            reason: format!("expected an http(s) URL, got '{url_str}'"),
        });
    }

    // 2. Credentials
    let (username, password) = resolve_credentials(global, profile, &profile_name)?;

    // 3. TLS verification
    let tls = if global.insecure || profile.insecure.unwrap_or(config.defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ca_path) = global.ca_cert.as_ref().or(profile.ca_cert.as_ref()) {
        if !ca_path.is_file() {
            return Err(CliError::Tls {
                message: format!("CA certificate {} not found", ca_path.display()),
            });
        }
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    // 4. Limits
    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(config.defaults.timeout);
    if timeout == 0 {
        return Err(CliError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    let jobs = global.jobs.unwrap_or(config.defaults.jobs);
    if jobs == 0 {
        return Err(CliError::Validation {
            field: "jobs".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(NexusConfig {
        url,
        username,
        password,
        tls,
        timeout: Duration::from_secs(timeout),
        jobs,
    })
}

fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

// ── Credential helpers ───────────────────────────────────────────────

/// Username and password: flag/env first, then the profile's
/// `password_env`, then plaintext in the profile.
fn resolve_credentials(
    global: &GlobalOpts,
    profile: &Profile,
    profile_name: &str,
) -> Result<(String, SecretString), CliError> {
    let missing = || CliError::NoCredentials {
        profile: profile_name.into(),
    };

    let username = global
        .user
        .clone()
        .or_else(|| profile.username.clone())
        .ok_or_else(missing)?;

    if let Some(pw) = &global.password {
        return Ok((username, SecretString::from(pw.clone())));
    }
    if let Some(pw) = profile
        .password_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok((username, SecretString::from(pw)));
    }
    if let Some(pw) = &profile.password {
        return Ok((username, SecretString::from(pw.clone())));
    }
    Err(missing())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["nexus3ctl"];
        argv.extend_from_slice(args);
        argv.push("ls");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn with_profile(name: &str, profile: Profile) -> Config {
        let mut config = Config::default();
        config.profiles.insert(name.into(), profile);
        config
    }

    #[test]
    fn flags_alone_are_enough() {
        let global = global(&[
            "--url",
            "https://nexus.example.com",
            "-u",
            "admin",
            "-p",
            "s3cret",
        ]);
        let resolved = resolve(&global, &Config::default()).unwrap();
        assert_eq!(resolved.url.as_str(), "https://nexus.example.com/");
        assert_eq!(resolved.username, "admin");
        assert_eq!(resolved.password.expose_secret(), "s3cret");
        assert_eq!(resolved.timeout, Duration::from_secs(10));
        assert_eq!(resolved.jobs, 4);
        assert_eq!(resolved.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn flags_override_profile() {
        let config = with_profile(
            "prod",
            Profile {
                url: Some("https://prod.example.com".into()),
                username: Some("deploy".into()),
                password: Some("from-file".into()),
                timeout: Some(30),
                insecure: Some(true),
                ..Profile::default()
            },
        );
        let resolved = resolve(
            &global(&["-P", "prod", "-u", "other", "--timeout", "5"]),
            &config,
        )
        .unwrap();
        assert_eq!(resolved.url.host_str(), Some("prod.example.com"));
        assert_eq!(resolved.username, "other");
        assert_eq!(resolved.password.expose_secret(), "from-file");
        assert_eq!(resolved.timeout, Duration::from_secs(5));
        assert_eq!(resolved.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn missing_pieces_are_reported() {
        assert!(matches!(
            resolve(&global(&[]), &Config::default()),
            Err(CliError::NoServer { .. })
        ));
        assert!(matches!(
            resolve(&global(&["--url", "http://nexus:8081"]), &Config::default()),
            Err(CliError::NoCredentials { .. })
        ));
        assert!(matches!(
            resolve(&global(&["-P", "nope"]), &Config::default()),
            Err(CliError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn non_http_urls_are_rejected() {
        let err = resolve(
            &global(&["--url", "ftp://nexus", "-u", "a", "-p", "b"]),
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "url"));
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let err = resolve(
            &global(&["--url", "http://nexus", "-u", "a", "-p", "b", "-j", "0"]),
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "jobs"));
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "lab"

[defaults]
timeout = 20

[profiles.lab]
url = "http://nexus.lab:8081"
username = "admin"
password = "admin123"
"#,
        )
        .unwrap();

        let global = global(&["--config", path.to_str().unwrap()]);
        let config = load_config(&global).unwrap();
        assert_eq!(active_profile_name(&global, &config), "lab");

        let resolved = resolve(&global, &config).unwrap();
        assert_eq!(resolved.url.port(), Some(8081));
        assert_eq!(resolved.timeout, Duration::from_secs(20));
    }
}
