//! Helpers shared by the reconciliation commands.

use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use nexus3_core::{
    ActionReport, FileStore, FilterSpec, NexusGateway, Reconciler, Report, Selector,
    SnapshotFormat,
};

use crate::cli::{FileFormat, FilterArgs, GlobalOpts, SelectMode};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Compile `-t/-l/-s` into a selector. Runs before any I/O so a bad
/// expression never touches the server or the snapshot.
pub fn selector(filter: &FilterArgs) -> Result<Selector, CliError> {
    let mode = match filter.select {
        SelectMode::Exact => "exact",
        SelectMode::Contains => "contains",
        SelectMode::StartsWith => "startswith",
        SelectMode::EndsWith => "endswith",
        SelectMode::Regex => "regex",
    };
    let spec = FilterSpec {
        types: filter.types.clone(),
        patterns: filter.limit.clone(),
        mode: Some(mode.into()),
    };
    Ok(Selector::compile(&spec)?)
}

/// Resolve configuration and build the gateway. Returns the job limit too.
pub fn connect(global: &GlobalOpts) -> Result<(NexusGateway, usize), CliError> {
    let cfg = config::load_config(global)?;
    let nexus = config::resolve(global, &cfg)?;
    tracing::debug!(url = %nexus.url, user = %nexus.username, "connecting");
    let gateway = NexusGateway::connect(&nexus)?;
    Ok((gateway, nexus.jobs))
}

pub fn store(global: &GlobalOpts) -> FileStore {
    let format = match global.format {
        FileFormat::Json => SnapshotFormat::Json,
        FileFormat::Yaml => SnapshotFormat::Yaml,
    };
    FileStore::new(&global.target_dir, format)
}

pub fn reconciler(
    selector: Selector,
    global: &GlobalOpts,
    jobs: usize,
    cancel: CancellationToken,
) -> Reconciler {
    Reconciler::new(selector)
        .dry_run(global.dry)
        .jobs(jobs)
        .cancel_token(cancel)
}

// ── Report rendering ─────────────────────────────────────────────────

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "TYPE")]
    resource_type: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ACTION")]
    action: String,
    #[tabled(rename = "OUTCOME")]
    outcome: String,
    #[tabled(rename = "DETAIL")]
    detail: String,
}

/// Print the report and turn failures into the partial-failure exit.
pub fn finish(report: &Report, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let rendered = output::render_list(
        global.output,
        report.entries(),
        |entry: &ActionReport| ReportRow {
            resource_type: entry.key().resource_type.to_string(),
            name: entry.key().name.clone(),
            action: entry.action.label().into(),
            outcome: output::paint_outcome(entry.outcome.label(), color),
            detail: entry.outcome.detail().unwrap_or_default(),
        },
        |entry| {
            let line = format!(
                "{} {} {}",
                entry.outcome.label(),
                entry.action.label(),
                entry.key()
            );
            match entry.outcome.detail() {
                Some(detail) => format!("{line}: {detail}"),
                None => line,
            }
        },
    )?;
    output::print_output(&rendered, global.quiet);

    if !global.quiet {
        eprintln!("{}", summary_line(report, global.dry));
    }

    if report.has_failures() {
        let failed = report
            .entries()
            .iter()
            .filter(|e| e.is_failure())
            .count();
        return Err(CliError::Partial {
            failed,
            total: report.entries().len(),
        });
    }
    Ok(())
}

fn summary_line(report: &Report, dry: bool) -> String {
    if report.is_empty() {
        return "Nothing selected".into();
    }
    let s = report.summary();
    if dry {
        format!(
            "Dry run: {} to write, {} unchanged, {} skipped",
            s.previewed, s.unchanged, s.skipped
        )
    } else {
        format!(
            "{} applied, {} unchanged, {} failed, {} skipped",
            s.applied, s.unchanged, s.failed, s.skipped
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    fn filter(args: &[&str]) -> FilterArgs {
        let mut argv = vec!["nexus3ctl", "ls"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Ls(ls) => ls.filter,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn filter_flags_compile() {
        let selector = selector(&filter(&["-t", "-ldap", "-l", "dev,prod", "-s", "endswith"])).unwrap();
        assert!(!selector.includes_type(nexus3_core::ResourceType::Ldap));
        assert!(selector.matches_name("npm-prod"));
        assert!(!selector.matches_name("npm-qa"));
    }

    #[test]
    fn bad_type_expression_is_a_selector_error() {
        let err = selector(&filter(&["-t", "repos,users"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidSelector { .. }));
    }

    #[test]
    fn empty_report_summary() {
        assert_eq!(summary_line(&Report::default(), false), "Nothing selected");
    }
}
