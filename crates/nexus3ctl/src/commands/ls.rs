//! `ls`: list resources on the server.

use std::collections::BTreeMap;

use serde_json::Value;
use tabled::Tabled;

use nexus3_core::{Reconciler, Resource};

use crate::cli::{GlobalOpts, LsArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct NameRow {
    #[tabled(rename = "TYPE")]
    resource_type: String,
    #[tabled(rename = "NAME")]
    name: String,
}

#[derive(Tabled)]
struct ContentRow {
    #[tabled(rename = "TYPE")]
    resource_type: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CONTENT")]
    content: String,
}

pub async fn handle(args: LsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let selector = util::selector(&args.filter)?;
    let (gateway, _) = util::connect(global)?;
    let types = selector.selected_types();

    let listing = Reconciler::new(selector).collect(&gateway).await?;
    for problem in &listing.problems {
        tracing::warn!(key = %problem.key, reason = %problem.reason, "could not read resource");
    }

    let out = match global.output {
        OutputFormat::Table if args.all => output::render_list(
            global.output,
            &listing.resources,
            |r| ContentRow {
                resource_type: r.resource_type().to_string(),
                name: r.name().into(),
                content: r.attributes().to_string(),
            },
            |r| r.key().to_string(),
        )?,
        OutputFormat::Table | OutputFormat::Plain => output::render_list(
            global.output,
            &listing.resources,
            |r| NameRow {
                resource_type: r.resource_type().to_string(),
                name: r.name().into(),
            },
            |r| {
                if args.all {
                    format!("{} {}", r.key(), r.attributes())
                } else {
                    r.key().to_string()
                }
            },
        )?,
        OutputFormat::Json => output::render_json(&grouped(&types, &listing.resources, args.all))?,
        OutputFormat::Yaml => output::render_yaml(&grouped(&types, &listing.resources, args.all))?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

/// `{type: [name, ...]}`, or `{type: [payload, ...]}` with `--all`. Every
/// selected type gets a key, even when empty.
fn grouped(
    types: &[nexus3_core::ResourceType],
    resources: &[Resource],
    all: bool,
) -> BTreeMap<String, Vec<Value>> {
    let mut out: BTreeMap<String, Vec<Value>> =
        types.iter().map(|t| (t.to_string(), Vec::new())).collect();
    for resource in resources {
        let item = if all {
            resource.attributes().clone()
        } else {
            Value::from(resource.name())
        };
        out.entry(resource.resource_type().to_string())
            .or_default()
            .push(item);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nexus3_core::ResourceType;
    use serde_json::json;

    use super::*;

    #[test]
    fn grouping_keeps_empty_types() {
        let resources = vec![Resource::new(
            ResourceType::Role,
            "devs",
            json!({"id": "devs", "privileges": []}),
        )];
        let types = [ResourceType::Repository, ResourceType::Role];

        let names = grouped(&types, &resources, false);
        assert_eq!(json!(names), json!({"repos": [], "roles": ["devs"]}));

        let full = grouped(&types, &resources, true);
        assert_eq!(full["roles"][0]["privileges"], json!([]));
    }
}
