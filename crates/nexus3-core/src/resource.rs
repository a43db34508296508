// ── Resource model ──
//
// Every configuration item, whatever its kind, is a `Resource`: a type tag,
// a name unique within that type, and an opaque JSON payload. Identity
// (`key`) and content (`same_content`) are separate comparisons.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Roles that ship with every Nexus instance.
const BUILTIN_ROLES: &[&str] = &["nx-admin", "nx-anonymous"];

/// The single name under which the active realm list is stored.
pub const REALMS_NAME: &str = "active";

// ── ResourceType ─────────────────────────────────────────────────────

/// Category of configuration item.
///
/// Variant order is the reporting order and the apply order: connectors
/// come before the roles that may map their groups.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    #[strum(serialize = "repos", to_string = "repos")]
    #[serde(rename = "repos")]
    Repository,
    Ldap,
    #[strum(serialize = "roles", to_string = "roles")]
    #[serde(rename = "roles")]
    Role,
    Realms,
}

impl ResourceType {
    /// Every type, in enumeration order.
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    /// Subdirectory of the snapshot root holding this type's files.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Repository => "repos",
            Self::Ldap => "ldap",
            Self::Role => "roles",
            Self::Realms => "realms",
        }
    }

    /// Payload field carrying the resource name.
    fn name_field(self) -> Option<&'static str> {
        match self {
            Self::Repository | Self::Ldap => Some("name"),
            Self::Role => Some("id"),
            Self::Realms => None,
        }
    }
}

// ── ResourceKey ──────────────────────────────────────────────────────

/// Identity of a resource: `(type, name)`.
///
/// Ordering is type enumeration order, then lexicographic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub name: String,
}

impl ResourceKey {
    pub fn new(resource_type: ResourceType, name: impl Into<String>) -> Self {
        Self {
            resource_type,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.name)
    }
}

// ── Resource ─────────────────────────────────────────────────────────

/// A configuration item. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(flatten)]
    key: ResourceKey,
    attributes: Value,
}

impl Resource {
    /// Build a resource from its parts. The payload is normalized but
    /// otherwise not validated.
    pub fn new(resource_type: ResourceType, name: impl Into<String>, attributes: Value) -> Self {
        Self {
            key: ResourceKey::new(resource_type, name),
            attributes: normalize(resource_type, attributes),
        }
    }

    /// Build a resource from a raw payload, deriving its name from the
    /// payload itself. Returns `None` when the identifying field is missing.
    ///
    /// Roles are identified by `id` (falling back to `name`); the realm list
    /// always carries the name [`REALMS_NAME`].
    pub fn from_payload(resource_type: ResourceType, attributes: Value) -> Option<Self> {
        let name = match resource_type.name_field() {
            None => REALMS_NAME.to_owned(),
            Some(field) => attributes
                .get(field)
                .or_else(|| attributes.get("name"))
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())?
                .to_owned(),
        };
        Some(Self::new(resource_type, name, attributes))
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn resource_type(&self) -> ResourceType {
        self.key.resource_type
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn attributes(&self) -> &Value {
        &self.attributes
    }

    /// Read a string attribute.
    pub fn str_attr(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).and_then(Value::as_str)
    }

    /// Deep structural equality of the payloads (object key order ignored).
    pub fn same_content(&self, other: &Self) -> bool {
        self.attributes == other.attributes
    }

    /// Whether the server owns this resource (built-in or LDAP-mapped
    /// roles). Such resources are never exported.
    pub fn is_system_owned(&self) -> bool {
        match self.resource_type() {
            ResourceType::Role => {
                BUILTIN_ROLES.contains(&self.name()) || self.str_attr("source") == Some("LDAP")
            }
            _ => false,
        }
    }

    /// Base position of this resource within its type's apply order:
    /// hosted, proxy, then group repositories. References between
    /// resources of one type are ordered by the reconciler on top of this.
    pub fn apply_tier(&self) -> u8 {
        match self.resource_type() {
            ResourceType::Repository => match self.str_attr("type") {
                Some("hosted") => 0,
                Some("proxy") => 1,
                _ => 2,
            },
            ResourceType::Role | ResourceType::Ldap | ResourceType::Realms => 0,
        }
    }

    /// Names of same-type resources this one refers to: nested roles, or
    /// the members of a group repository.
    pub fn dependencies(&self) -> Vec<&str> {
        let refs = match self.resource_type() {
            ResourceType::Role => self.attributes.get("roles"),
            ResourceType::Repository => self.attributes.pointer("/group/memberNames"),
            ResourceType::Ldap | ResourceType::Realms => None,
        };
        refs.and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Drop fields the server computes on read and rejects or ignores on write,
/// so that both sides of a comparison carry the same shape.
fn normalize(resource_type: ResourceType, mut attributes: Value) -> Value {
    if resource_type == ResourceType::Repository {
        if let Some(object) = attributes.as_object_mut() {
            object.remove("url");
        }
    }
    attributes
}
