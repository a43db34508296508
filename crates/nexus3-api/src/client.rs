// Hand-crafted async HTTP client for the Nexus Repository 3 REST API.
//
// Base path: /service/rest/v1/
// Auth: HTTP basic auth on every request

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

const REST_PREFIX: &str = "/service/rest/v1";

// ── Error response shapes from the REST API ─────────────────────────

/// Validation failures come back as `[{"id": "...", "message": "..."}]`.
#[derive(serde::Deserialize)]
struct ValidationError {
    #[serde(default)]
    id: Option<String>,
    message: String,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Nexus REST API.
///
/// Every endpoint module (`repositories`, `security`) is implemented as
/// inherent methods in separate files; this module only covers URL
/// construction, authentication and response handling.
pub struct NexusClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
}

impl NexusClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client from a server URL, basic-auth credentials and a
    /// transport config.
    ///
    /// `base_url` is the server root (e.g. `https://nexus.example.com` or
    /// `https://example.com/nexus`); the REST prefix is appended unless
    /// already present.
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(base_url, username, password, http)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(
        base_url: &str,
        username: impl Into<String>,
        password: SecretString,
        http: reqwest::Client,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            username: username.into(),
            password,
        })
    }

    /// Build the base URL ending in `/service/rest/v1/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with(REST_PREFIX) {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}{REST_PREFIX}/"));
        }

        Ok(url)
    }

    /// The REST base URL (always ends with `/service/rest/v1/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The user requests are authenticated as.
    pub fn username(&self) -> &str {
        &self.username
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"security/roles"`) onto the base URL.
    ///
    /// Dynamic segments must already be escaped with [`segment`].
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.authed(self.http.get(url)).send().await?;
        Self::handle_response(resp).await
    }

    pub(crate) async fn post<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.authed(self.http.post(url).json(body)).send().await?;
        Self::handle_empty(resp).await
    }

    pub(crate) async fn put<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.authed(self.http.put(url).json(body)).send().await?;
        Self::handle_empty(resp).await
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Authentication {
                message: "credentials rejected (HTTP 401)".into(),
            };
        }

        let raw = resp.text().await.unwrap_or_default();
        Error::Api {
            status: status.as_u16(),
            message: error_message(status, &raw),
        }
    }
}

/// Extract a readable message from an error body.
fn error_message(status: reqwest::StatusCode, raw: &str) -> String {
    if let Ok(errors) = serde_json::from_str::<Vec<ValidationError>>(raw) {
        if !errors.is_empty() {
            return errors
                .into_iter()
                .map(|e| match e.id {
                    Some(id) if id != "*" => format!("{id}: {}", e.message),
                    _ => e.message,
                })
                .collect::<Vec<_>>()
                .join("; ");
        }
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        status.to_string()
    } else {
        trimmed.chars().take(500).collect()
    }
}

/// Percent-escape a single path segment (repository names may contain
/// characters that are not valid in a bare URL path).
pub(crate) fn segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
