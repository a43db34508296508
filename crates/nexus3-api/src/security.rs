// Security endpoints: roles, LDAP connectors and active realms.
//
// Payloads are passed through as raw JSON; the server owns their schema.

use serde_json::Value;
use tracing::debug;

use crate::client::{NexusClient, segment};
use crate::error::Error;

impl NexusClient {
    // ── Roles ────────────────────────────────────────────────────────

    /// List all roles, including built-in and LDAP-sourced ones.
    ///
    /// `GET security/roles`
    pub async fn list_roles(&self) -> Result<Vec<Value>, Error> {
        debug!("listing roles");
        self.get("security/roles").await
    }

    /// `POST security/roles`
    pub async fn create_role(&self, body: &Value) -> Result<(), Error> {
        debug!("creating role");
        self.post("security/roles", body).await
    }

    /// `PUT security/roles/{id}`
    pub async fn update_role(&self, id: &str, body: &Value) -> Result<(), Error> {
        debug!(id, "updating role");
        self.put(&format!("security/roles/{}", segment(id)), body)
            .await
    }

    // ── LDAP ─────────────────────────────────────────────────────────

    /// List configured LDAP connections.
    ///
    /// `GET security/ldap`
    pub async fn list_ldap_servers(&self) -> Result<Vec<Value>, Error> {
        debug!("listing ldap servers");
        self.get("security/ldap").await
    }

    /// `POST security/ldap`
    pub async fn create_ldap_server(&self, body: &Value) -> Result<(), Error> {
        debug!("creating ldap server");
        self.post("security/ldap", body).await
    }

    /// `PUT security/ldap/{name}`
    pub async fn update_ldap_server(&self, name: &str, body: &Value) -> Result<(), Error> {
        debug!(name, "updating ldap server");
        self.put(&format!("security/ldap/{}", segment(name)), body)
            .await
    }

    // ── Realms ───────────────────────────────────────────────────────

    /// Ordered list of active security realm ids.
    ///
    /// `GET security/realms/active`
    pub async fn active_realms(&self) -> Result<Vec<String>, Error> {
        debug!("listing active realms");
        self.get("security/realms/active").await
    }

    /// Replace the active realm list (order is significant).
    ///
    /// `PUT security/realms/active`
    pub async fn set_active_realms(&self, realms: &[String]) -> Result<(), Error> {
        debug!(?realms, "setting active realms");
        self.put("security/realms/active", realms).await
    }
}
