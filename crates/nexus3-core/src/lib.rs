//! Selection and reconciliation engine for Nexus Repository 3 configuration.
//!
//! - **[`Resource`]**: one configuration item (repository, LDAP server, role,
//!   active realm list) keyed by `(type, name)`, attributes kept as opaque JSON.
//! - **[`Selector`]**: compiled type/name filter shared by every command.
//! - **[`ResourceSource`] / [`ResourceSink`]**: the two seams both sides of a
//!   reconciliation implement: [`NexusGateway`] for the server and
//!   [`FileStore`] for the local snapshot directory.
//! - **[`Reconciler`]**: collects, diffs into a [`Plan`], applies it and
//!   returns a per-action [`Report`]. It never deletes.

pub mod config;
pub mod error;
pub mod gateway;
pub mod plan;
pub mod reconcile;
pub mod resource;
pub mod selector;
pub mod store;

pub use config::{NexusConfig, TlsVerification};
pub use error::CoreError;
pub use gateway::{NexusGateway, ResourceSink, ResourceSource};
pub use plan::{Action, Listing, Plan, Problem};
pub use reconcile::{ActionReport, Outcome, Reconciler, Report, Summary};
pub use resource::{REALMS_NAME, Resource, ResourceKey, ResourceType};
pub use selector::{FilterSpec, MatchMode, Selector, parse_types};
pub use store::{FileStore, SnapshotFormat, escape_name, unescape_name};
