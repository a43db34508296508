// ── Plan computation ──
//
// Pure diff between a desired and an actual resource set. No I/O here:
// sources produce `Listing`s, the reconciler applies the resulting `Plan`.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::resource::{Resource, ResourceKey};
use crate::selector::Selector;

// ── Listing ──────────────────────────────────────────────────────────

/// An item a source could not turn into a resource (unparsable snapshot
/// file, detail fetch that failed). Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub key: ResourceKey,
    pub reason: String,
}

/// What a source returned for one or more resource types.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub resources: Vec<Resource>,
    pub problems: Vec<Problem>,
    /// Keys whose stored copy must be rewritten even when its content
    /// matches (a snapshot file in another format).
    pub stale: BTreeSet<ResourceKey>,
}

impl Listing {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self {
            resources,
            ..Self::default()
        }
    }

    pub fn extend(&mut self, other: Listing) {
        self.resources.extend(other.resources);
        self.problems.extend(other.problems);
        self.stale.extend(other.stale);
    }

    /// Keep only the resources (and problems) a selector matches.
    pub fn filtered(self, selector: &Selector) -> Self {
        Self {
            resources: self
                .resources
                .into_iter()
                .filter(|r| selector.matches(r))
                .collect(),
            problems: self
                .problems
                .into_iter()
                .filter(|p| selector.matches_key(&p.key))
                .collect(),
            stale: self
                .stale
                .into_iter()
                .filter(|key| selector.matches_key(key))
                .collect(),
        }
    }
}

// ── Action ───────────────────────────────────────────────────────────

/// One step of a plan.
///
/// There is deliberately no delete variant: resources present only on the
/// target side are left alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Create(Resource),
    Update(Resource),
    Unchanged(Resource),
    Conflict { key: ResourceKey, reason: String },
}

impl Action {
    pub fn key(&self) -> &ResourceKey {
        match self {
            Self::Create(r) | Self::Update(r) | Self::Unchanged(r) => r.key(),
            Self::Conflict { key, .. } => key,
        }
    }

    /// Resource to write, for actions that mutate the target.
    pub fn write_target(&self) -> Option<&Resource> {
        match self {
            Self::Create(r) | Self::Update(r) => Some(r),
            Self::Unchanged(_) | Self::Conflict { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Unchanged(_) => "unchanged",
            Self::Conflict { .. } => "conflict",
        }
    }
}

// ── Plan ─────────────────────────────────────────────────────────────

/// Ordered list of actions: grouped by resource type (enumeration order),
/// then by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Plan {
    actions: Vec<Action>,
}

impl Plan {
    /// Diff `desired` against `actual` within the scope of `selector`.
    ///
    /// Resources outside the selector are invisible on both sides. Keys
    /// only present in `actual` produce no action. Matching content that
    /// `actual` marks stale is rewritten.
    pub fn build(desired: Listing, actual: Listing, selector: &Selector) -> Self {
        let desired = desired.filtered(selector);
        let actual = actual.filtered(selector);

        for problem in &actual.problems {
            warn!(key = %problem.key, reason = %problem.reason, "ignoring unreadable target entry");
        }

        let mut conflicts: BTreeMap<ResourceKey, String> = desired
            .problems
            .into_iter()
            .map(|p| (p.key, p.reason))
            .collect();
        let wanted = index_desired(desired.resources, &mut conflicts);
        let existing = index_actual(actual.resources);
        let stale = actual.stale;

        let mut actions: Vec<Action> = wanted
            .into_values()
            .map(|resource| match existing.get(resource.key()) {
                None => Action::Create(resource),
                Some(current)
                    if current.same_content(&resource) && !stale.contains(resource.key()) =>
                {
                    Action::Unchanged(resource)
                }
                Some(_) => Action::Update(resource),
            })
            .collect();
        actions.extend(
            conflicts
                .into_iter()
                .map(|(key, reason)| Action::Conflict { key, reason }),
        );
        actions.sort_by(|a, b| a.key().cmp(b.key()));

        debug!(actions = actions.len(), "plan computed");
        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Whether applying this plan would write anything.
    pub fn has_changes(&self) -> bool {
        self.actions.iter().any(|a| a.write_target().is_some())
    }
}

/// Index the desired side. A key defined twice with different content is a
/// conflict; identical duplicates collapse silently.
fn index_desired(
    resources: Vec<Resource>,
    conflicts: &mut BTreeMap<ResourceKey, String>,
) -> BTreeMap<ResourceKey, Resource> {
    let mut index: BTreeMap<ResourceKey, Resource> = BTreeMap::new();
    for resource in resources {
        if conflicts.contains_key(resource.key()) {
            continue;
        }
        match index.get(resource.key()) {
            None => {
                index.insert(resource.key().clone(), resource);
            }
            Some(seen) if seen.same_content(&resource) => {}
            Some(_) => {
                let key = resource.key().clone();
                index.remove(&key);
                conflicts.insert(key, "defined more than once with different content".into());
            }
        }
    }
    index
}

/// Index the actual side, keeping the first occurrence of each key.
fn index_actual(resources: Vec<Resource>) -> BTreeMap<ResourceKey, Resource> {
    let mut index = BTreeMap::new();
    for resource in resources {
        let key = resource.key().clone();
        if index.contains_key(&key) {
            warn!(%key, "duplicate entry on target side, keeping the first");
            continue;
        }
        index.insert(key, resource);
    }
    index
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::resource::ResourceType;
    use crate::selector::{FilterSpec, MatchMode};

    fn res(resource_type: ResourceType, name: &str, attrs: serde_json::Value) -> Resource {
        Resource::new(resource_type, name, attrs)
    }

    fn labels(plan: &Plan) -> Vec<String> {
        plan.actions()
            .iter()
            .map(|a| format!("{} {}", a.label(), a.key()))
            .collect()
    }

    #[test]
    fn scenario_create_when_actual_is_empty() {
        let desired = Listing::new(vec![res(ResourceType::Repository, "a", json!({"x": 1}))]);
        let plan = Plan::build(desired, Listing::default(), &Selector::default());
        assert_eq!(labels(&plan), vec!["create repos:a"]);
    }

    #[test]
    fn scenario_identical_content_is_unchanged() {
        let desired = Listing::new(vec![res(ResourceType::Role, "R", json!({"p": 1}))]);
        let actual = Listing::new(vec![res(ResourceType::Role, "R", json!({"p": 1}))]);
        let plan = Plan::build(desired, actual, &Selector::default());
        assert_eq!(labels(&plan), vec!["unchanged roles:R"]);
        assert!(!plan.has_changes());
    }

    #[test]
    fn scenario_different_content_is_update() {
        let desired = Listing::new(vec![res(ResourceType::Role, "R", json!({"p": 1}))]);
        let actual = Listing::new(vec![res(ResourceType::Role, "R", json!({"p": 2}))]);
        let plan = Plan::build(desired, actual, &Selector::default());
        assert_eq!(labels(&plan), vec!["update roles:R"]);
        assert_eq!(
            plan.actions()[0].write_target().unwrap().attributes(),
            &json!({"p": 1})
        );
    }

    #[test]
    fn scenario_selector_scopes_the_plan() {
        let selector = Selector::new(
            [ResourceType::Repository],
            vec!["prod".into()],
            MatchMode::EndsWith,
        )
        .unwrap();
        let desired = Listing::new(vec![
            res(ResourceType::Repository, "maven-prod", json!({})),
            res(ResourceType::Repository, "maven-dev", json!({})),
            res(ResourceType::Role, "prod-admins", json!({})),
        ]);
        let plan = Plan::build(desired, Listing::default(), &selector);
        assert_eq!(labels(&plan), vec!["create repos:maven-prod"]);
    }

    #[test]
    fn actual_only_resources_are_never_removed() {
        let desired = Listing::new(vec![res(ResourceType::Ldap, "corp", json!({"a": 1}))]);
        let actual = Listing::new(vec![
            res(ResourceType::Ldap, "corp", json!({"a": 1})),
            res(ResourceType::Ldap, "legacy", json!({})),
            res(ResourceType::Repository, "orphan", json!({})),
        ]);
        let plan = Plan::build(desired, actual, &Selector::default());
        assert_eq!(labels(&plan), vec!["unchanged ldap:corp"]);
        assert!(plan.actions().iter().all(|a| a.key().name != "legacy"));
    }

    #[test]
    fn out_of_selector_resources_are_invisible() {
        let selector = Selector::compile(&FilterSpec {
            types: None,
            patterns: vec!["keep".into()],
            mode: Some("exact".into()),
        })
        .unwrap();
        let desired = Listing::new(vec![
            res(ResourceType::Role, "keep", json!({"v": 1})),
            res(ResourceType::Role, "other", json!({"v": 1})),
        ]);
        let actual = Listing::new(vec![res(ResourceType::Role, "other", json!({"v": 2}))]);
        let plan = Plan::build(desired, actual, &selector);
        assert_eq!(labels(&plan), vec!["create roles:keep"]);
    }

    #[test]
    fn order_is_type_then_name() {
        let desired = Listing::new(vec![
            res(ResourceType::Realms, "active", json!([])),
            res(ResourceType::Role, "b", json!({})),
            res(ResourceType::Repository, "z", json!({})),
            res(ResourceType::Role, "a", json!({})),
            res(ResourceType::Repository, "m", json!({})),
            res(ResourceType::Ldap, "corp", json!({})),
        ]);
        let plan = Plan::build(desired, Listing::default(), &Selector::default());
        assert_eq!(
            labels(&plan),
            vec![
                "create repos:m",
                "create repos:z",
                "create ldap:corp",
                "create roles:a",
                "create roles:b",
                "create realms:active",
            ]
        );
    }

    #[test]
    fn stale_target_copy_is_rewritten() {
        let desired = Listing::new(vec![
            res(ResourceType::Role, "a", json!({"p": 1})),
            res(ResourceType::Role, "b", json!({"p": 1})),
        ]);
        let mut actual = desired.clone();
        actual.stale.insert(ResourceKey::new(ResourceType::Role, "a"));
        let plan = Plan::build(desired, actual, &Selector::default());
        assert_eq!(labels(&plan), vec!["update roles:a", "unchanged roles:b"]);
    }

    #[test]
    fn conflicting_duplicates_and_problems_become_conflicts() {
        let desired = Listing {
            resources: vec![
                res(ResourceType::Role, "dup", json!({"v": 1})),
                res(ResourceType::Role, "dup", json!({"v": 2})),
                res(ResourceType::Role, "same", json!({"v": 1})),
                res(ResourceType::Role, "same", json!({"v": 1})),
            ],
            problems: vec![Problem {
                key: ResourceKey::new(ResourceType::Role, "broken"),
                reason: "expected value at line 1".into(),
            }],
            ..Listing::default()
        };
        let plan = Plan::build(desired, Listing::default(), &Selector::default());
        assert_eq!(
            labels(&plan),
            vec![
                "conflict roles:broken",
                "conflict roles:dup",
                "create roles:same",
            ]
        );
    }
}
