//! `export`: server → snapshot directory.

use tokio_util::sync::CancellationToken;

use crate::cli::{ExportArgs, GlobalOpts};
use crate::error::CliError;

use super::util;

pub async fn handle(
    args: ExportArgs,
    global: &GlobalOpts,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let selector = util::selector(&args.filter)?;
    let (gateway, jobs) = util::connect(global)?;
    let store = util::store(global);

    if args.clean {
        if global.dry {
            tracing::info!(dir = %store.root().display(), "dry run: would remove target directory");
        } else if store.clean()? {
            tracing::info!(dir = %store.root().display(), "removed target directory");
        }
    }

    let report = util::reconciler(selector, global, jobs, cancel)
        .skip_system_owned(true)
        .run(&gateway, &store, &store)
        .await?;
    util::finish(&report, global)
}
