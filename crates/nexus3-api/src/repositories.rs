// Repository endpoints
//
// The listing endpoint only returns a summary per repository; the full
// configuration lives under `repositories/{format}/{type}/{name}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::{NexusClient, segment};
use crate::error::Error;

/// One entry of `GET repositories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    pub format: String,
    #[serde(rename = "type")]
    pub repo_type: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Map a repository format to the name used in endpoint paths.
///
/// Nexus reports Maven repositories as `maven2` but routes them under
/// `repositories/maven/...`.
pub fn api_format(format: &str) -> &str {
    match format {
        "maven2" => "maven",
        other => other,
    }
}

impl NexusClient {
    /// List all repositories (summary form).
    ///
    /// `GET repositories`
    pub async fn list_repositories(&self) -> Result<Vec<RepositorySummary>, Error> {
        debug!("listing repositories");
        self.get("repositories").await
    }

    /// Fetch the full configuration of one repository.
    ///
    /// `GET repositories/{format}/{type}/{name}`
    pub async fn get_repository(
        &self,
        format: &str,
        repo_type: &str,
        name: &str,
    ) -> Result<Value, Error> {
        debug!(name, format, repo_type, "fetching repository");
        self.get(&repository_path(format, repo_type, Some(name)))
            .await
    }

    /// Create a repository.
    ///
    /// `POST repositories/{format}/{type}`
    pub async fn create_repository(
        &self,
        format: &str,
        repo_type: &str,
        body: &Value,
    ) -> Result<(), Error> {
        debug!(format, repo_type, "creating repository");
        self.post(&repository_path(format, repo_type, None), body)
            .await
    }

    /// Replace the configuration of an existing repository.
    ///
    /// `PUT repositories/{format}/{type}/{name}`
    pub async fn update_repository(
        &self,
        format: &str,
        repo_type: &str,
        name: &str,
        body: &Value,
    ) -> Result<(), Error> {
        debug!(name, format, repo_type, "updating repository");
        self.put(&repository_path(format, repo_type, Some(name)), body)
            .await
    }
}

fn repository_path(format: &str, repo_type: &str, name: Option<&str>) -> String {
    let base = format!(
        "repositories/{}/{}",
        segment(api_format(format)),
        segment(repo_type)
    );
    match name {
        Some(name) => format!("{base}/{}", segment(name)),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maven2_is_routed_as_maven() {
        assert_eq!(api_format("maven2"), "maven");
        assert_eq!(api_format("npm"), "npm");
        assert_eq!(
            repository_path("maven2", "hosted", Some("releases")),
            "repositories/maven/hosted/releases"
        );
        assert_eq!(repository_path("raw", "group", None), "repositories/raw/group");
    }
}
