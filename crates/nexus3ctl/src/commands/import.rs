//! `import`: snapshot directory → server.

use tokio_util::sync::CancellationToken;

use crate::cli::{GlobalOpts, ImportArgs};
use crate::error::CliError;

use super::util;

pub async fn handle(
    args: ImportArgs,
    global: &GlobalOpts,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let selector = util::selector(&args.filter)?;
    let (gateway, jobs) = util::connect(global)?;
    let store = util::store(global);
    if !store.root().is_dir() {
        tracing::warn!(dir = %store.root().display(), "target directory does not exist, nothing to import");
    }

    let report = util::reconciler(selector, global, jobs, cancel)
        .run(&store, &gateway, &gateway)
        .await?;
    util::finish(&report, global)
}
