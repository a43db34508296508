// ── Remote gateway ──
//
// `ResourceSource` / `ResourceSink` are the two seams the reconciler works
// against. `NexusGateway` binds every `ResourceType` to its REST endpoints;
// the file store implements the same traits for the local side.

use std::future::Future;

use futures_util::{StreamExt, stream};
use nexus3_api::{NexusClient, RepositorySummary};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::NexusConfig;
use crate::error::CoreError;
use crate::plan::{Listing, Problem};
use crate::resource::{REALMS_NAME, Resource, ResourceKey, ResourceType};

/// Anything resources can be listed from.
pub trait ResourceSource {
    fn list(
        &self,
        resource_type: ResourceType,
    ) -> impl Future<Output = Result<Listing, CoreError>> + Send;
}

/// Anything resources can be written to.
pub trait ResourceSink {
    fn create(&self, resource: &Resource) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn update(&self, resource: &Resource) -> impl Future<Output = Result<(), CoreError>> + Send;
}

// ── NexusGateway ─────────────────────────────────────────────────────

/// Live Nexus server as a resource source and sink.
pub struct NexusGateway {
    client: NexusClient,
    jobs: usize,
}

impl NexusGateway {
    /// Build the HTTP client for `config`. Does not contact the server.
    pub fn connect(config: &NexusConfig) -> Result<Self, CoreError> {
        let client = NexusClient::new(
            config.url.as_str(),
            config.username.clone(),
            config.password.clone(),
            &config.transport(),
        )?;
        debug!(url = %client.base_url(), user = client.username(), "nexus client ready");
        Ok(Self::new(client, config.jobs))
    }

    pub fn new(client: NexusClient, jobs: usize) -> Self {
        Self {
            client,
            jobs: jobs.max(1),
        }
    }

    pub fn client(&self) -> &NexusClient {
        &self.client
    }

    /// Repository listings are summaries; each full payload is fetched
    /// separately, `jobs` at a time.
    async fn list_repositories(&self) -> Result<Listing, CoreError> {
        let summaries = self.client.list_repositories().await?;
        let fetched: Vec<(RepositorySummary, Result<Value, nexus3_api::Error>)> =
            stream::iter(summaries)
                .map(|summary| async move {
                    let payload = self
                        .client
                        .get_repository(&summary.format, &summary.repo_type, &summary.name)
                        .await;
                    (summary, payload)
                })
                .buffered(self.jobs)
                .collect()
                .await;

        let mut listing = Listing::default();
        for (summary, payload) in fetched {
            let key = ResourceKey::new(ResourceType::Repository, summary.name.clone());
            match payload.map_err(CoreError::from) {
                Ok(payload) => push_payload(&mut listing, key, payload),
                Err(err) if err.is_terminal() => return Err(err),
                Err(err) => {
                    warn!(%key, error = %err, "could not fetch repository configuration");
                    listing.problems.push(Problem {
                        key,
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(listing)
    }

    fn from_payloads(resource_type: ResourceType, payloads: Vec<Value>) -> Listing {
        let mut listing = Listing::default();
        for (idx, payload) in payloads.into_iter().enumerate() {
            push_payload(
                &mut listing,
                ResourceKey::new(resource_type, format!("#{idx}")),
                payload,
            );
        }
        listing
    }
}

fn push_payload(listing: &mut Listing, fallback: ResourceKey, payload: Value) {
    match Resource::from_payload(fallback.resource_type, payload) {
        Some(resource) => listing.resources.push(resource),
        None => listing.problems.push(Problem {
            key: fallback,
            reason: "payload carries no identifying name".into(),
        }),
    }
}

impl ResourceSource for NexusGateway {
    async fn list(&self, resource_type: ResourceType) -> Result<Listing, CoreError> {
        debug!(%resource_type, "listing remote resources");
        let listing = match resource_type {
            ResourceType::Repository => self.list_repositories().await?,
            ResourceType::Ldap => {
                Self::from_payloads(resource_type, self.client.list_ldap_servers().await?)
            }
            ResourceType::Role => {
                Self::from_payloads(resource_type, self.client.list_roles().await?)
            }
            ResourceType::Realms => {
                let realms = self.client.active_realms().await?;
                Listing::new(vec![Resource::new(
                    ResourceType::Realms,
                    REALMS_NAME,
                    Value::from(realms),
                )])
            }
        };
        Ok(listing)
    }
}

impl ResourceSink for NexusGateway {
    async fn create(&self, resource: &Resource) -> Result<(), CoreError> {
        let body = resource.attributes();
        match resource.resource_type() {
            ResourceType::Repository => {
                let (format, repo_type) = repository_route(resource)?;
                self.client
                    .create_repository(format, repo_type, body)
                    .await?;
            }
            ResourceType::Ldap => self.client.create_ldap_server(body).await?,
            ResourceType::Role => self.client.create_role(body).await?,
            ResourceType::Realms => self.client.set_active_realms(&realm_list(resource)?).await?,
        }
        Ok(())
    }

    async fn update(&self, resource: &Resource) -> Result<(), CoreError> {
        let body = resource.attributes();
        let name = resource.name();
        match resource.resource_type() {
            ResourceType::Repository => {
                let (format, repo_type) = repository_route(resource)?;
                self.client
                    .update_repository(format, repo_type, name, body)
                    .await?;
            }
            ResourceType::Ldap => self.client.update_ldap_server(name, body).await?,
            ResourceType::Role => self.client.update_role(name, body).await?,
            ResourceType::Realms => self.client.set_active_realms(&realm_list(resource)?).await?,
        }
        Ok(())
    }
}

/// Repository endpoints are routed by format and type.
fn repository_route(resource: &Resource) -> Result<(&str, &str), CoreError> {
    match (resource.str_attr("format"), resource.str_attr("type")) {
        (Some(format), Some(repo_type)) => Ok((format, repo_type)),
        _ => Err(CoreError::rejected(
            "repository payload needs string 'format' and 'type' fields",
        )),
    }
}

fn realm_list(resource: &Resource) -> Result<Vec<String>, CoreError> {
    resource
        .attributes()
        .as_array()
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| CoreError::rejected("realm configuration must be a list of realm ids"))
}
