//! Config subcommand handlers.

use std::path::PathBuf;

use serde::Serialize;
use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Effective settings as the next command would see them. Unlike
/// `config::resolve` this never fails on missing pieces.
#[derive(Debug, Serialize)]
struct Effective {
    config_file: PathBuf,
    config_file_exists: bool,
    profile: String,
    url: Option<String>,
    username: Option<String>,
    password: &'static str,
    insecure: bool,
    ca_cert: Option<PathBuf>,
    timeout: u64,
    jobs: usize,
    target_dir: PathBuf,
}

impl Effective {
    fn build(global: &GlobalOpts, cfg: &Config) -> Self {
        let profile_name = config::active_profile_name(global, cfg);
        let profile = cfg.profiles.get(&profile_name);
        let path = config::config_path(global);
        let has_password = global.password.is_some()
            || profile.is_some_and(|p| {
                p.password.is_some()
                    || p
                        .password_env
                        .as_deref()
                        .is_some_and(|name| std::env::var_os(name).is_some())
            });

        Self {
            config_file_exists: path.is_file(),
            config_file: path,
            url: global
                .url
                .clone()
                .or_else(|| profile.and_then(|p| p.url.clone())),
            username: global
                .user
                .clone()
                .or_else(|| profile.and_then(|p| p.username.clone())),
            password: if has_password { "********" } else { "(unset)" },
            insecure: global.insecure
                || profile
                    .and_then(|p| p.insecure)
                    .unwrap_or(cfg.defaults.insecure),
            ca_cert: global
                .ca_cert
                .clone()
                .or_else(|| profile.and_then(|p| p.ca_cert.clone())),
            timeout: global
                .timeout
                .or_else(|| profile.and_then(|p| p.timeout))
                .unwrap_or(cfg.defaults.timeout),
            jobs: global.jobs.unwrap_or(cfg.defaults.jobs),
            target_dir: global.target_dir.clone(),
            profile: profile_name,
        }
    }

    fn detail(&self) -> String {
        let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "(unset)".into());
        let lines = [
            ("Config file", self.config_file.display().to_string()),
            ("Profile", self.profile.clone()),
            ("URL", opt(&self.url)),
            ("Username", opt(&self.username)),
            ("Password", self.password.into()),
            ("Insecure", self.insecure.to_string()),
            (
                "CA cert",
                self.ca_cert
                    .as_ref()
                    .map_or_else(|| "(system)".into(), |p| p.display().to_string()),
            ),
            ("Timeout", format!("{}s", self.timeout)),
            ("Jobs", self.jobs.to_string()),
            ("Target dir", self.target_dir.display().to_string()),
        ];
        lines
            .iter()
            .map(|(k, v)| format!("{k:<12} {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Clone, Tabled, Serialize)]
struct ProfileRow {
    #[tabled(rename = "PROFILE")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "DEFAULT")]
    default: String,
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config(global)?;
            let effective = Effective::build(global, &cfg);
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => effective.detail(),
                OutputFormat::Json => output::render_json(&effective)?,
                OutputFormat::Yaml => output::render_yaml(&effective)?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path(global).display());
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config(global)?;
            if cfg.profiles.is_empty() {
                if !global.quiet {
                    eprintln!(
                        "No profiles configured in {}",
                        config::config_path(global).display()
                    );
                }
                return Ok(());
            }
            let active = config::active_profile_name(global, &cfg);
            let rows: Vec<ProfileRow> = cfg
                .profiles
                .iter()
                .map(|(name, profile)| ProfileRow {
                    name: name.clone(),
                    url: profile.url.clone().unwrap_or_default(),
                    default: if *name == active { "*".into() } else { String::new() },
                })
                .collect();
            let out =
                output::render_list(global.output, &rows, ProfileRow::clone, |r| r.name.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
