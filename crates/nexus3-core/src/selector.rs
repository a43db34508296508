// ── Selector engine ──
//
// A selector narrows a resource set by type and by name. Everything that
// can fail (unknown mode, unknown type token, bad regex) fails in
// `Selector::compile`; `matches` is total.

use std::collections::BTreeSet;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

use crate::error::CoreError;
use crate::resource::{Resource, ResourceKey, ResourceType};

/// How each pattern is compared against a resource name.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumString,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Exact,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
}

/// Uncompiled filter, as collected from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Type expression (`ALL`, `NONE`, `repos,roles`, `-ldap`, ...).
    /// `None` selects every type.
    pub types: Option<String>,
    /// Name patterns; each entry may itself be a comma-separated list.
    pub patterns: Vec<String>,
    /// Match mode name; `None` means `exact`.
    pub mode: Option<String>,
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact(Vec<String>),
    Contains(Vec<String>),
    StartsWith(Vec<String>),
    EndsWith(Vec<String>),
    Regex(Vec<Regex>),
}

/// A compiled predicate over `(type, name)`.
#[derive(Debug, Clone)]
pub struct Selector {
    types: BTreeSet<ResourceType>,
    mode: MatchMode,
    matcher: Matcher,
}

impl Default for Selector {
    fn default() -> Self {
        Self {
            types: BTreeSet::new(),
            mode: MatchMode::Exact,
            matcher: Matcher::Exact(Vec::new()),
        }
    }
}

impl Selector {
    /// Compile a filter spec.
    pub fn compile(spec: &FilterSpec) -> Result<Self, CoreError> {
        let mode = match spec.mode.as_deref() {
            None => MatchMode::default(),
            Some(raw) => MatchMode::from_str(raw).map_err(|_| CoreError::InvalidSelector {
                message: format!(
                    "unsupported mode '{raw}', please choose one of: {}",
                    MatchMode::VARIANTS.join(",")
                ),
            })?,
        };
        let types = match spec.types.as_deref() {
            None => BTreeSet::new(),
            Some(expr) => {
                let types = parse_types(expr)?;
                if types.is_empty() {
                    return Err(CoreError::InvalidSelector {
                        message: format!("type expression '{expr}' selects no resource type"),
                    });
                }
                types
            }
        };
        Self::new(types, split_patterns(&spec.patterns), mode)
    }

    /// Build a selector from already-parsed parts. An empty `types` set
    /// selects every type; an empty `patterns` list selects every name.
    pub fn new(
        types: impl IntoIterator<Item = ResourceType>,
        patterns: Vec<String>,
        mode: MatchMode,
    ) -> Result<Self, CoreError> {
        let matcher = match mode {
            MatchMode::Exact => Matcher::Exact(patterns),
            MatchMode::Contains => Matcher::Contains(patterns),
            MatchMode::StartsWith => Matcher::StartsWith(patterns),
            MatchMode::EndsWith => Matcher::EndsWith(patterns),
            MatchMode::Regex => Matcher::Regex(
                patterns
                    .iter()
                    .map(|p| {
                        Regex::new(p).map_err(|e| CoreError::InvalidSelector {
                            message: format!("invalid regex '{p}': {e}"),
                        })
                    })
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(Self {
            types: types.into_iter().collect(),
            mode,
            matcher,
        })
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Types this selector can match, in enumeration order.
    pub fn selected_types(&self) -> Vec<ResourceType> {
        if self.types.is_empty() {
            ResourceType::all()
        } else {
            self.types.iter().copied().collect()
        }
    }

    pub fn includes_type(&self, resource_type: ResourceType) -> bool {
        self.types.is_empty() || self.types.contains(&resource_type)
    }

    /// Whether `name` satisfies at least one pattern (or there are none).
    pub fn matches_name(&self, name: &str) -> bool {
        fn any(patterns: &[String], hit: impl Fn(&str) -> bool) -> bool {
            patterns.is_empty() || patterns.iter().any(|p| hit(p))
        }

        match &self.matcher {
            Matcher::Exact(p) => any(p, |p| name == p),
            Matcher::Contains(p) => any(p, |p| name.contains(p)),
            Matcher::StartsWith(p) => any(p, |p| name.starts_with(p)),
            Matcher::EndsWith(p) => any(p, |p| name.ends_with(p)),
            Matcher::Regex(r) => r.is_empty() || r.iter().any(|re| re.is_match(name)),
        }
    }

    pub fn matches_key(&self, key: &ResourceKey) -> bool {
        self.includes_type(key.resource_type) && self.matches_name(&key.name)
    }

    pub fn matches(&self, resource: &Resource) -> bool {
        self.matches_key(resource.key())
    }
}

/// Split `-l dev,prod -l qa` style values into individual patterns.
fn split_patterns(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|value| value.split(','))
        .map(str::to_owned)
        .collect()
}

/// Evaluate a type expression.
///
/// Tokens are comma separated: `ALL` selects every type, `NONE` clears the
/// set, `name`/`+name` adds and `-name` removes. An expression made only of
/// removals starts from `ALL`.
pub fn parse_types(expr: &str) -> Result<BTreeSet<ResourceType>, CoreError> {
    let tokens: Vec<&str> = expr
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    let mut out: BTreeSet<ResourceType> = if tokens.iter().all(|t| t.starts_with('-')) {
        ResourceType::all().into_iter().collect()
    } else {
        BTreeSet::new()
    };

    for token in tokens {
        match token {
            "ALL" => out = ResourceType::all().into_iter().collect(),
            "NONE" => out.clear(),
            _ => {
                let (remove, name) = match token.strip_prefix('-') {
                    Some(name) => (true, name),
                    None => (false, token.strip_prefix('+').unwrap_or(token)),
                };
                let resource_type =
                    ResourceType::from_str(name).map_err(|_| CoreError::InvalidSelector {
                        message: format!(
                            "unknown resource type '{name}', expected one of: {}",
                            ResourceType::all()
                                .iter()
                                .map(ToString::to_string)
                                .collect::<Vec<_>>()
                                .join(",")
                        ),
                    })?;
                if remove {
                    out.remove(&resource_type);
                } else {
                    out.insert(resource_type);
                }
            }
        }
    }
    Ok(out)
}
