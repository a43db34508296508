//! Clap derive structures for the `nexus3ctl` CLI.
//!
//! Also compiled by `build.rs` for man pages, so this file may only depend
//! on clap and clap_complete.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nexus3ctl -- keep Nexus 3 configuration in files
#[derive(Debug, Parser)]
#[command(
    name = "nexus3ctl",
    version,
    about = "Export and import Sonatype Nexus 3 configuration",
    long_about = "Reconciles repositories, LDAP servers, roles and active realms\n\
        between a Nexus 3 server and a directory of JSON or YAML files.\n\n\
        `export` writes the server state to files, `import` pushes files to\n\
        the server. Nothing is ever deleted on either side.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'P', env = "NEXUS3_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "NEXUS3_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Nexus base URL (overrides profile)
    #[arg(long, env = "NEXUS3_URL", global = true)]
    pub url: Option<String>,

    /// Nexus username
    #[arg(long, short = 'u', env = "NEXUS3_USERNAME", global = true)]
    pub user: Option<String>,

    /// Nexus password
    #[arg(
        long,
        short = 'p',
        env = "NEXUS3_PASSWORD",
        global = true,
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// Directory holding the configuration snapshot
    #[arg(
        long,
        short = 'd',
        env = "NEXUS3_TARGET_DIR",
        default_value = "./out",
        global = true
    )]
    pub target_dir: PathBuf,

    /// Show what would change without writing anything
    #[arg(long, short = 'n', env = "NEXUS3_DRY", global = true)]
    pub dry: bool,

    /// Snapshot file format written by export
    #[arg(long, short = 'm', default_value = "json", global = true)]
    pub format: FileFormat,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NEXUS3_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "NEXUS3_INSECURE", global = true)]
    pub insecure: bool,

    /// CA certificate (PEM) used to verify the server
    #[arg(long, env = "NEXUS3_CA_CERT", global = true)]
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds [default: 10]
    #[arg(long, env = "NEXUS3_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Maximum concurrent requests [default: 4]
    #[arg(long, short = 'j', env = "NEXUS3_JOBS", global = true)]
    pub jobs: Option<usize>,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
    /// Plain text, one line per item (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FileFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// How `--limit` patterns are compared against resource names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectMode {
    Exact,
    Contains,
    #[value(name = "startswith")]
    StartsWith,
    #[value(name = "endswith")]
    EndsWith,
    /// Unanchored regular expression search
    Regex,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List resources on the server
    #[command(alias = "list")]
    Ls(LsArgs),

    /// Write server configuration into the target directory
    Export(ExportArgs),

    /// Push the target directory's configuration to the server
    Import(ImportArgs),

    /// Inspect CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Resource filter shared by `ls`, `export` and `import`.
#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Resource types: `ALL`, `NONE`, `repos,roles`, `-ldap` ...
    /// (known types: repos, ldap, roles, realms)
    #[arg(long, short = 't', allow_hyphen_values = true, value_name = "EXPR")]
    pub types: Option<String>,

    /// Only resources whose name matches; comma separated, repeatable
    #[arg(long, short = 'l', value_name = "PATTERN[,PATTERN...]")]
    pub limit: Vec<String>,

    /// How `--limit` patterns match
    #[arg(long, short = 's', default_value = "exact", ignore_case = true)]
    pub select: SelectMode,
}

#[derive(Debug, Args)]
pub struct LsArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Show full resource content instead of names
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Remove the target directory before exporting
    #[arg(long)]
    pub clean: bool,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved connection settings (password redacted)
    Show,

    /// Print the configuration file path
    Path,

    /// List configured profiles
    Profiles,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
