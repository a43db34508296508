//! Command dispatch: bridges CLI args -> core reconciliation -> output formatting.

pub mod config_cmd;
pub mod export;
pub mod import;
pub mod ls;
pub mod util;

use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    global: &GlobalOpts,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    match cmd {
        Command::Ls(args) => ls::handle(args, global).await,
        Command::Export(args) => export::handle(args, global, cancel).await,
        Command::Import(args) => import::handle(args, global, cancel).await,
        Command::Config(args) => config_cmd::handle(&args, global),
        Command::Completions(args) => {
            use clap::CommandFactory;

            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "nexus3ctl", &mut std::io::stdout());
            Ok(())
        }
    }
}
