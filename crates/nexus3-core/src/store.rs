// ── Local snapshot store ──
//
// One file per resource under `<root>/<type dir>/<escaped name>.<ext>`.
// Names are percent-escaped so that any resource name maps to exactly one
// safe file name and back.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::gateway::{ResourceSink, ResourceSource};
use crate::plan::{Listing, Problem};
use crate::resource::{Resource, ResourceKey, ResourceType};

/// Serialization used for snapshot files.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Json,
    Yaml,
}

impl SnapshotFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    pub fn render(self, value: &Value) -> Result<String, String> {
        match self {
            Self::Json => serde_json::to_string_pretty(value)
                .map(|mut out| {
                    out.push('\n');
                    out
                })
                .map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        }
    }

    fn parse(self, raw: &str) -> Result<Value, String> {
        match self {
            Self::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
        }
    }
}

// ── Name escaping ────────────────────────────────────────────────────

/// Escape a resource name into a file stem.
///
/// Bytes outside `[A-Za-z0-9_.-]` become `%XX`; so do `%` itself and a
/// leading `.` (no hidden files, no `.`/`..`). The mapping is injective.
pub fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (idx, byte) in name.bytes().enumerate() {
        let safe = byte.is_ascii_alphanumeric()
            || matches!(byte, b'_' | b'-')
            || (byte == b'.' && idx > 0);
        if safe {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Reverse [`escape_name`]. Returns `None` for stems it cannot have produced.
pub fn unescape_name(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while let Some(&byte) = bytes.get(idx) {
        if byte == b'%' {
            let hex = stem.get(idx + 1..idx + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            idx += 3;
        } else {
            out.push(byte);
            idx += 1;
        }
    }
    String::from_utf8(out).ok()
}

// ── FileStore ────────────────────────────────────────────────────────

/// Snapshot directory as a resource source and sink.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    format: SnapshotFormat,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, format: SnapshotFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> SnapshotFormat {
        self.format
    }

    fn type_dir(&self, resource_type: ResourceType) -> PathBuf {
        self.root.join(resource_type.dir_name())
    }

    /// Path a resource is written to in the configured format.
    pub fn path_for(&self, key: &ResourceKey) -> PathBuf {
        self.type_dir(key.resource_type).join(format!(
            "{}.{}",
            escape_name(&key.name),
            self.format.extension()
        ))
    }

    /// Read every snapshot file of one type. Unreadable files become
    /// problems in the listing; only a failure to read the directory
    /// itself is an error. Files in a format other than the configured one
    /// are marked stale so the next write converts them.
    pub fn read(&self, resource_type: ResourceType) -> Result<Listing, CoreError> {
        let dir = self.type_dir(resource_type);
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "no snapshot directory");
            return Ok(Listing::default());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)
            .map_err(|e| CoreError::io(&dir, e))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut listing = Listing::default();
        for path in paths {
            let Some((stem, format)) = snapshot_file(&path) else {
                debug!(path = %path.display(), "skipping non-snapshot file");
                continue;
            };
            let key = ResourceKey::new(
                resource_type,
                unescape_name(stem).unwrap_or_else(|| stem.to_owned()),
            );
            match load(&path, format, &key) {
                Ok(resource) => {
                    if format != self.format {
                        debug!(%key, found = %format, "snapshot in another format");
                        listing.stale.insert(key);
                    }
                    listing.resources.push(resource);
                }
                Err(err) => {
                    warn!(%key, error = %err, "skipping unreadable snapshot");
                    listing.problems.push(Problem {
                        key,
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(listing)
    }

    /// Serialize a resource and atomically replace its file. A copy of the
    /// same resource in another format is removed so the snapshot keeps a
    /// single file per resource.
    pub fn write(&self, resource: &Resource) -> Result<PathBuf, CoreError> {
        let path = self.path_for(resource.key());
        let dir = self.type_dir(resource.resource_type());
        std::fs::create_dir_all(&dir).map_err(|e| CoreError::io(&dir, e))?;

        let content = self
            .format
            .render(resource.attributes())
            .map_err(|message| CoreError::CorruptSnapshot {
                path: path.clone(),
                message,
            })?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| CoreError::io(&dir, e))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| CoreError::io(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| CoreError::io(temp.path(), e))?;
        temp.persist(&path)
            .map_err(|e| CoreError::io(&path, e.error))?;

        for stale in ["json", "yaml", "yml"]
            .into_iter()
            .filter(|ext| *ext != self.format.extension())
            .map(|ext| path.with_extension(ext))
            .filter(|p| p.is_file())
        {
            debug!(path = %stale.display(), "removing copy in previous format");
            std::fs::remove_file(&stale).map_err(|e| CoreError::io(&stale, e))?;
        }

        debug!(key = %resource.key(), path = %path.display(), "snapshot written");
        Ok(path)
    }

    /// Remove the whole snapshot tree. Returns `false` when there was
    /// nothing to remove.
    pub fn clean(&self) -> Result<bool, CoreError> {
        if !self.root.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&self.root).map_err(|e| CoreError::io(&self.root, e))?;
        Ok(true)
    }
}

/// File stem and format of a snapshot file, or `None` for anything else
/// (hidden files, temp files, unknown extensions).
fn snapshot_file(path: &Path) -> Option<(&str, SnapshotFormat)> {
    let stem = path.file_stem()?.to_str()?;
    if stem.starts_with('.') {
        return None;
    }
    let format = SnapshotFormat::from_extension(path.extension()?.to_str()?)?;
    Some((stem, format))
}

fn load(path: &Path, format: SnapshotFormat, key: &ResourceKey) -> Result<Resource, CoreError> {
    let corrupt = |message: String| CoreError::CorruptSnapshot {
        path: path.to_path_buf(),
        message,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
    let payload = format.parse(&raw).map_err(corrupt)?;
    let resource = Resource::from_payload(key.resource_type, payload)
        .ok_or_else(|| corrupt("payload carries no identifying name".into()))?;
    if resource.key() != key {
        return Err(corrupt(format!(
            "file name says '{}' but payload names '{}'",
            key.name,
            resource.name()
        )));
    }
    Ok(resource)
}

// Directory scans and atomic writes block, so they run on the blocking
// pool and concurrent writes really overlap.
impl FileStore {
    async fn blocking<T, F>(&self, work: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(&FileStore) -> Result<T, CoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || work(&store))
            .await
            .map_err(|e| CoreError::io(&self.root, std::io::Error::other(e)))?
    }
}

impl ResourceSource for FileStore {
    async fn list(&self, resource_type: ResourceType) -> Result<Listing, CoreError> {
        self.blocking(move |store| store.read(resource_type)).await
    }
}

impl ResourceSink for FileStore {
    async fn create(&self, resource: &Resource) -> Result<(), CoreError> {
        let resource = resource.clone();
        self.blocking(move |store| store.write(&resource).map(|_| ()))
            .await
    }

    async fn update(&self, resource: &Resource) -> Result<(), CoreError> {
        let resource = resource.clone();
        self.blocking(move |store| store.write(&resource).map(|_| ()))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::resource::REALMS_NAME;

    #[test]
    fn escaping_is_reversible_and_path_safe() {
        for name in ["maven-releases", "a b/c", "50%", ".hidden", "..", "ünï", "x.y"] {
            let escaped = escape_name(name);
            assert!(!escaped.contains('/'), "{escaped}");
            assert!(!escaped.starts_with('.'), "{escaped}");
            assert_eq!(unescape_name(&escaped).as_deref(), Some(name));
        }
        assert_eq!(escape_name("a b/c"), "a%20b%2Fc");
        assert_eq!(escape_name("50%"), "50%25");
        assert_eq!(escape_name("x.y"), "x.y");
        assert_ne!(escape_name("a/b"), escape_name("a%2Fb"));
        assert_eq!(unescape_name("bad%Z1"), None);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), SnapshotFormat::Json);
        let repo = Resource::new(
            ResourceType::Repository,
            "docker/hosted",
            json!({"name": "docker/hosted", "format": "docker", "type": "hosted"}),
        );

        let path = store.write(&repo).unwrap();
        assert_eq!(path, dir.path().join("repos").join("docker%2Fhosted.json"));
        assert!(std::fs::read_to_string(&path).unwrap().ends_with("}\n"));

        let listing = store.read(ResourceType::Repository).unwrap();
        assert_eq!(listing.resources, vec![repo]);
        assert!(listing.problems.is_empty());
    }

    #[test]
    fn yaml_snapshots_replace_json_copies() {
        let dir = tempfile::tempdir().unwrap();
        let role = Resource::new(ResourceType::Role, "devs", json!({"id": "devs", "roles": []}));
        FileStore::new(dir.path(), SnapshotFormat::Json)
            .write(&role)
            .unwrap();

        let yaml = FileStore::new(dir.path(), SnapshotFormat::Yaml);
        yaml.write(&role).unwrap();

        assert!(!dir.path().join("roles/devs.json").exists());
        assert!(dir.path().join("roles/devs.yaml").exists());
        assert_eq!(yaml.read(ResourceType::Role).unwrap().resources, vec![role]);
    }

    #[test]
    fn files_in_another_format_are_stale() {
        let dir = tempfile::tempdir().unwrap();
        let roles = dir.path().join("roles");
        std::fs::create_dir_all(&roles).unwrap();
        std::fs::write(roles.join("devs.json"), r#"{"id": "devs"}"#).unwrap();
        std::fs::write(roles.join("ops.yaml"), "id: ops\n").unwrap();

        let listing = FileStore::new(dir.path(), SnapshotFormat::Yaml)
            .read(ResourceType::Role)
            .unwrap();

        assert_eq!(listing.resources.len(), 2);
        let stale: Vec<_> = listing.stale.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(stale, vec!["devs"]);
    }

    #[tokio::test]
    async fn format_switch_rewrites_unchanged_snapshot() {
        use crate::reconcile::Reconciler;
        use crate::selector::Selector;

        let dir = tempfile::tempdir().unwrap();
        let roles = dir.path().join("roles");
        std::fs::create_dir_all(&roles).unwrap();
        std::fs::write(roles.join("devs.json"), r#"{"id": "devs"}"#).unwrap();

        let source = FileStore::new(dir.path(), SnapshotFormat::Json);
        let target = FileStore::new(dir.path(), SnapshotFormat::Yaml);
        let report = Reconciler::new(Selector::default())
            .run(&source, &target, &target)
            .await
            .unwrap();

        let rows: Vec<_> = report
            .entries()
            .iter()
            .map(|e| format!("{} {}", e.action.label(), e.outcome.label()))
            .collect();
        assert_eq!(rows, vec!["update applied"]);
        assert!(roles.join("devs.yaml").is_file());
        assert!(!roles.join("devs.json").exists());

        let again = Reconciler::new(Selector::default())
            .run(&target, &target, &target)
            .await
            .unwrap();
        assert_eq!(again.entries()[0].outcome.label(), "unchanged");
    }

    #[test]
    fn corrupt_files_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let roles = dir.path().join("roles");
        std::fs::create_dir_all(&roles).unwrap();
        std::fs::write(roles.join("good.json"), r#"{"id": "good"}"#).unwrap();
        std::fs::write(roles.join("broken.json"), "{not json").unwrap();
        std::fs::write(roles.join("renamed.json"), r#"{"id": "other"}"#).unwrap();
        std::fs::write(roles.join("README.md"), "notes").unwrap();

        let listing = FileStore::new(dir.path(), SnapshotFormat::Json)
            .read(ResourceType::Role)
            .unwrap();

        assert_eq!(listing.resources.len(), 1);
        assert_eq!(listing.resources[0].name(), "good");
        let broken: Vec<_> = listing.problems.iter().map(|p| p.key.name.as_str()).collect();
        assert_eq!(broken, vec!["broken", "renamed"]);
    }

    #[test]
    fn realms_live_in_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), SnapshotFormat::Json);
        let realms = Resource::new(ResourceType::Realms, REALMS_NAME, json!(["LdapRealm"]));
        store.write(&realms).unwrap();

        assert!(dir.path().join("realms/active.json").is_file());
        assert_eq!(store.read(ResourceType::Realms).unwrap().resources, vec![realms]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nothing"), SnapshotFormat::Json);
        let listing = store.read(ResourceType::Ldap).unwrap();
        assert!(listing.resources.is_empty());
        assert!(!store.clean().unwrap());
    }
}
