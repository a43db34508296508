// nexus3-api: Async Rust client for the Nexus Repository 3 REST API (`/service/rest/v1/`)

pub mod client;
pub mod error;
pub mod repositories;
pub mod security;
pub mod transport;

pub use client::NexusClient;
pub use error::Error;
pub use repositories::RepositorySummary;
pub use transport::{TlsMode, TransportConfig};
