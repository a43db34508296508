// ── Reconciliation engine ──
//
// Collects both sides through `ResourceSource`, diffs them into a `Plan`,
// and pushes the plan's writes into a `ResourceSink`. Per-action failures
// land in the `Report`; only listing failures abort a run.

use std::collections::BTreeMap;

use futures_util::{StreamExt, stream};
use serde::{Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::gateway::{ResourceSink, ResourceSource};
use crate::plan::{Action, Listing, Plan};
use crate::resource::{Resource, ResourceKey, ResourceType};
use crate::selector::Selector;

const DEFAULT_JOBS: usize = 4;

// ── Report ───────────────────────────────────────────────────────────

/// What happened to one action.
#[derive(Debug)]
pub enum Outcome {
    Applied,
    /// Dry run: the write would have happened.
    Previewed,
    Unchanged,
    Failed(CoreError),
    Skipped { reason: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Previewed => "previewed",
            Self::Unchanged => "unchanged",
            Self::Failed(_) => "failed",
            Self::Skipped { .. } => "skipped",
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Failed(err) => Some(err.to_string()),
            Self::Skipped { reason } => Some(reason.clone()),
            Self::Applied | Self::Previewed | Self::Unchanged => None,
        }
    }
}

#[derive(Debug)]
pub struct ActionReport {
    pub action: Action,
    pub outcome: Outcome,
}

impl ActionReport {
    pub fn key(&self) -> &ResourceKey {
        self.action.key()
    }

    /// Anything that did not reach the desired state: failed writes,
    /// conflicts, and writes skipped after cancellation.
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_) | Outcome::Skipped { .. })
            || matches!(self.action, Action::Conflict { .. })
    }
}

impl Serialize for ActionReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Row<'a> {
            #[serde(rename = "type")]
            resource_type: ResourceType,
            name: &'a str,
            action: &'static str,
            outcome: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            detail: Option<String>,
        }

        Row {
            resource_type: self.key().resource_type,
            name: &self.key().name,
            action: self.action.label(),
            outcome: self.outcome.label(),
            detail: self.outcome.detail(),
        }
        .serialize(serializer)
    }
}

/// Outcome counts for a summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub applied: usize,
    pub previewed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Per-action results, in plan order.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Report {
    entries: Vec<ActionReport>,
}

impl Report {
    /// The dry-run report: every action is described, nothing is written.
    pub fn preview(plan: Plan) -> Self {
        let entries = plan
            .into_actions()
            .into_iter()
            .map(|action| {
                let outcome = match &action {
                    Action::Create(_) | Action::Update(_) => Outcome::Previewed,
                    _ => settled_outcome(&action),
                };
                ActionReport { action, outcome }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ActionReport] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(ActionReport::is_failure)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for entry in &self.entries {
            let slot = match entry.outcome {
                Outcome::Applied => &mut summary.applied,
                Outcome::Previewed => &mut summary.previewed,
                Outcome::Unchanged => &mut summary.unchanged,
                Outcome::Failed(_) => &mut summary.failed,
                Outcome::Skipped { .. } => &mut summary.skipped,
            };
            *slot += 1;
        }
        summary
    }
}

/// How many writes of the same type each write waits for: one more than
/// the deepest resource it references among the writes themselves.
/// References to resources that are not being written impose nothing.
fn reference_depths(writes: &[(usize, &Resource)]) -> Vec<usize> {
    let position: BTreeMap<&ResourceKey, usize> = writes
        .iter()
        .enumerate()
        .map(|(pos, (_, resource))| (resource.key(), pos))
        .collect();
    let edges: Vec<Vec<usize>> = writes
        .iter()
        .enumerate()
        .map(|(pos, (_, resource))| {
            resource
                .dependencies()
                .into_iter()
                .filter_map(|name| {
                    position
                        .get(&ResourceKey::new(resource.resource_type(), name))
                        .copied()
                })
                .filter(|&dep| dep != pos)
                .collect()
        })
        .collect();

    // Relax until stable. At most one pass per write, so a reference cycle
    // still terminates (the server rejects it anyway).
    let mut depths = vec![0; writes.len()];
    for _ in 0..writes.len() {
        let mut changed = false;
        for (pos, deps) in edges.iter().enumerate() {
            let wanted = deps.iter().map(|&dep| depths[dep] + 1).max().unwrap_or(0);
            if wanted > depths[pos] {
                depths[pos] = wanted;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    depths
}

/// Outcome of an action that never reaches the sink.
fn settled_outcome(action: &Action) -> Outcome {
    match action {
        Action::Conflict { reason, .. } => Outcome::Skipped {
            reason: reason.clone(),
        },
        _ => Outcome::Unchanged,
    }
}

// ── Reconciler ───────────────────────────────────────────────────────

/// Drives one reconciliation: collect, plan, apply.
///
/// ```ignore
/// let report = Reconciler::new(selector)
///     .jobs(8)
///     .run(&gateway, &store, &store)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Reconciler {
    selector: Selector,
    dry_run: bool,
    jobs: usize,
    cancel: CancellationToken,
    skip_system_owned: bool,
}

impl Reconciler {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            dry_run: false,
            jobs: DEFAULT_JOBS,
            cancel: CancellationToken::new(),
            skip_system_owned: false,
        }
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Token checked before each write; tripping it skips what is left.
    #[must_use]
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Leave server-owned resources out of the desired side.
    #[must_use]
    pub fn skip_system_owned(mut self, skip: bool) -> Self {
        self.skip_system_owned = skip;
        self
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// List every selected type from `source` and narrow to the selector.
    pub async fn collect<S>(&self, source: &S) -> Result<Listing, CoreError>
    where
        S: ResourceSource + Sync,
    {
        let mut listing = Listing::default();
        for resource_type in self.selector.selected_types() {
            listing.extend(source.list(resource_type).await?);
        }
        Ok(listing.filtered(&self.selector))
    }

    pub fn plan(&self, mut desired: Listing, actual: Listing) -> Plan {
        if self.skip_system_owned {
            desired.resources.retain(|r| {
                let owned = r.is_system_owned();
                if owned {
                    debug!(key = %r.key(), "skipping system-owned resource");
                }
                !owned
            });
        }
        Plan::build(desired, actual, &self.selector)
    }

    /// Execute `plan` against `sink`, or preview it in dry-run mode.
    ///
    /// Writes run in waves: one per resource type and apply tier, in that
    /// order, with up to `jobs` writes in flight inside a wave. The report
    /// keeps plan order regardless.
    pub async fn apply<K>(&self, plan: Plan, sink: &K) -> Report
    where
        K: ResourceSink + Sync,
    {
        if self.dry_run {
            return Report::preview(plan);
        }

        let actions = plan.into_actions();
        let mut outcomes: Vec<Option<Outcome>> = actions.iter().map(|_| None).collect();

        let mut writes: Vec<(usize, &Resource)> = Vec::new();
        for (idx, action) in actions.iter().enumerate() {
            match action.write_target() {
                Some(resource) => writes.push((idx, resource)),
                None => outcomes[idx] = Some(settled_outcome(action)),
            }
        }

        let depths = reference_depths(&writes);
        let mut waves: BTreeMap<(ResourceType, usize), Vec<usize>> = BTreeMap::new();
        for ((idx, resource), depth) in writes.iter().zip(depths) {
            let tier = usize::from(resource.apply_tier()) + depth;
            waves
                .entry((resource.resource_type(), tier))
                .or_default()
                .push(*idx);
        }

        for ((resource_type, tier), indices) in waves {
            debug!(%resource_type, tier, actions = indices.len(), "applying wave");
            let results: Vec<(usize, Outcome)> = stream::iter(indices)
                .map(|idx| {
                    let action = &actions[idx];
                    async move { (idx, self.apply_one(action, sink).await) }
                })
                .buffered(self.jobs)
                .collect()
                .await;
            for (idx, outcome) in results {
                outcomes[idx] = Some(outcome);
            }
        }

        let entries = actions
            .into_iter()
            .zip(outcomes)
            .map(|(action, outcome)| {
                let outcome = outcome.unwrap_or_else(|| settled_outcome(&action));
                ActionReport { action, outcome }
            })
            .collect();
        Report { entries }
    }

    async fn apply_one<K>(&self, action: &Action, sink: &K) -> Outcome
    where
        K: ResourceSink + Sync,
    {
        if self.cancel.is_cancelled() {
            return Outcome::Skipped {
                reason: "cancelled".into(),
            };
        }

        let result = match action {
            Action::Create(resource) => sink.create(resource).await,
            Action::Update(resource) => sink.update(resource).await,
            Action::Unchanged(_) | Action::Conflict { .. } => return settled_outcome(action),
        };

        match result {
            Ok(()) => {
                info!(key = %action.key(), action = action.label(), "applied");
                Outcome::Applied
            }
            Err(err) => {
                warn!(key = %action.key(), action = action.label(), error = %err, "action failed");
                if err.is_terminal() {
                    warn!("stopping after terminal error");
                    self.cancel.cancel();
                }
                Outcome::Failed(err)
            }
        }
    }

    /// Collect both sides, plan, and apply into `sink`.
    pub async fn run<D, A, K>(&self, desired: &D, actual: &A, sink: &K) -> Result<Report, CoreError>
    where
        D: ResourceSource + Sync,
        A: ResourceSource + Sync,
        K: ResourceSink + Sync,
    {
        let wanted = self.collect(desired).await?;
        let current = self.collect(actual).await?;
        let plan = self.plan(wanted, current);
        debug!(
            actions = plan.len(),
            changes = plan.has_changes(),
            dry_run = self.dry_run,
            "plan ready"
        );
        Ok(self.apply(plan, sink).await)
    }
}
