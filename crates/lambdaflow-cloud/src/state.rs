//! Persistent record of provisioned resources
//!
//! `.lambdaflow/state.json` maps `provider:kind:logical_name` to what the
//! provider returned when the resource was created. Providers whose remote
//! API cannot be queried by logical name answer lookups from this file.
//!
//! ```text
//! .lambdaflow/
//! ├── state.json          current record
//! ├── state.json.backup   previous record
//! └── lock.json           held while `lambdaflow up` runs
//! ```

use crate::error::{CloudError, Result};
use crate::provider::{Resource, ResourceKey, ResourceKind};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".lambdaflow";
const STATE_FILE: &str = "state.json";
const BACKUP_FILE: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// A lock older than this is assumed to belong to a crashed run.
fn stale_after() -> Duration {
    Duration::hours(1)
}

/// `provider:kind:logical_name`
pub fn state_key(provider: &str, key: &ResourceKey) -> String {
    format!("{}:{}", provider, key)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries recorded by one provider, in key order
    pub fn get_provider_resources(&self, provider: &str) -> Vec<(&String, &ResourceState)> {
        let prefix = format!("{}:", provider);
        self.resources
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .collect()
    }

    /// Insert or replace an entry. A replaced entry keeps its `created_at`.
    pub fn set_resource(&mut self, key: String, mut state: ResourceState) {
        let now = Utc::now();
        if let Some(previous) = self.resources.get(&key) {
            state.created_at = previous.created_at;
        }
        state.updated_at = now;
        self.resources.insert(key, state);
        self.updated_at = now;
    }

    pub fn get_resource(&self, key: &str) -> Option<&ResourceState> {
        self.resources.get(key)
    }
}

/// One entry of the state file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    pub kind: ResourceKind,
    pub logical_name: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn from_resource(resource: &Resource) -> Self {
        let now = Utc::now();
        Self {
            kind: resource.kind,
            logical_name: resource.logical_name.clone(),
            id: resource.id.clone(),
            arn: resource.arn.clone(),
            attributes: resource.attributes.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild the resource. Recorded resources are never "created" by the
    /// current run.
    pub fn to_resource(&self) -> Resource {
        Resource {
            kind: self.kind,
            logical_name: self.logical_name.clone(),
            id: self.id.clone(),
            arn: self.arn.clone(),
            attributes: self.attributes.clone(),
            created: false,
        }
    }
}

/// Reads and writes the state directory of one project
pub struct StateManager {
    dir: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            dir: project_root.as_ref().join(STATE_DIR),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Missing file means nothing was provisioned yet.
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.state_path();
        if !fs::try_exists(&path).await? {
            tracing::debug!(path = %path.display(), "No state file yet");
            return Ok(GlobalState::new());
        }

        let state: GlobalState = serde_json::from_str(&fs::read_to_string(&path).await?)?;
        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "{} was written by a newer lambdaflow (version {}, supported {})",
                path.display(),
                state.version,
                STATE_VERSION
            )));
        }

        tracing::debug!(resources = state.resources.len(), "State loaded");
        Ok(state)
    }

    /// Copy the current file to the backup, then replace it.
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.state_path();
        if fs::try_exists(&path).await? {
            fs::copy(&path, self.dir.join(BACKUP_FILE)).await?;
        }

        // rename keeps the previous file intact if the write is interrupted
        let tmp = self.dir.join(format!("{}.tmp", STATE_FILE));
        fs::write(&tmp, serde_json::to_vec_pretty(state)?).await?;
        fs::rename(&tmp, &path).await?;

        tracing::debug!(resources = state.resources.len(), "State saved");
        Ok(())
    }

    /// Take the project lock, replacing it if its holder went away long ago.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(LOCK_FILE);

        if fs::try_exists(&path).await? {
            let held: LockRecord = serde_json::from_str(&fs::read_to_string(&path).await?)?;
            if Utc::now() - held.acquired_at < stale_after() {
                return Err(CloudError::LockError(format!(
                    "{} (pid {}) has held the state lock since {}",
                    held.holder, held.pid, held.acquired_at
                )));
            }
            tracing::warn!(
                holder = %held.holder,
                since = %held.acquired_at,
                "Taking over stale state lock"
            );
        }

        let record = LockRecord {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        fs::write(&path, serde_json::to_vec_pretty(&record)?).await?;

        tracing::debug!(path = %path.display(), "State lock acquired");
        Ok(StateLock {
            path,
            released: false,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockRecord {
    holder: String,
    #[serde(default)]
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Held lock. Dropping it without `release` still removes the lock file.
pub struct StateLock {
    path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!("State lock released");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gateway() -> Resource {
        Resource::new(ResourceKind::Gateway, "apiHandler-api", "abc123")
            .with_arn("arn:aws:execute-api:eu-west-1:123456789012:abc123")
            .with_attribute("endpoint", "https://abc123.execute-api.eu-west-1.amazonaws.com")
    }

    #[tokio::test]
    async fn test_saved_resource_is_restored() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let resource = gateway();
        let key = state_key("aws", &resource.key());
        assert_eq!(key, "aws:gateway:apiHandler-api");

        let mut state = GlobalState::new();
        state.set_resource(key.clone(), ResourceState::from_resource(&resource));
        manager.save(&state).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.resources.len(), 1);
        assert_eq!(loaded.get_resource(&key).unwrap().to_resource(), resource);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let temp_dir = tempdir().unwrap();
        let state = StateManager::new(temp_dir.path()).load().await.unwrap();
        assert!(state.resources.is_empty());
        assert!(!temp_dir.path().join(STATE_DIR).exists());
    }

    #[tokio::test]
    async fn test_second_save_leaves_backup() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        manager.save(&GlobalState::new()).await.unwrap();
        assert!(!temp_dir.path().join(".lambdaflow/state.json.backup").exists());

        manager.save(&GlobalState::new()).await.unwrap();
        assert!(temp_dir.path().join(".lambdaflow/state.json.backup").exists());
        assert!(!temp_dir.path().join(".lambdaflow/state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_newer_state_version_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        state.version = STATE_VERSION + 1;
        manager.save(&state).await.unwrap();

        assert!(matches!(
            manager.load().await,
            Err(CloudError::StateError(_))
        ));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let lock = manager.acquire_lock().await.unwrap();
        assert!(matches!(
            manager.acquire_lock().await,
            Err(CloudError::LockError(_))
        ));

        lock.release().await.unwrap();
        let again = manager.acquire_lock().await.unwrap();
        drop(again);
        assert!(!temp_dir.path().join(".lambdaflow/lock.json").exists());
    }

    #[tokio::test]
    async fn test_stale_lock_is_taken_over() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path().join(STATE_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        let stale = LockRecord {
            holder: "ci-runner".to_string(),
            pid: 42,
            acquired_at: Utc::now() - Duration::hours(2),
        };
        std::fs::write(dir.join(LOCK_FILE), serde_json::to_vec(&stale).unwrap()).unwrap();

        let lock = StateManager::new(temp_dir.path()).acquire_lock().await;
        assert!(lock.is_ok());
    }

    #[test]
    fn test_replacing_entry_keeps_created_at() {
        let mut state = GlobalState::new();
        let key = state_key("aws", &gateway().key());

        let mut first = ResourceState::from_resource(&gateway());
        first.created_at = Utc::now() - Duration::days(3);
        let created_at = first.created_at;
        state.set_resource(key.clone(), first);
        state.set_resource(key.clone(), ResourceState::from_resource(&gateway()));

        let entry = state.get_resource(&key).unwrap();
        assert_eq!(entry.created_at, created_at);
        assert!(entry.updated_at > created_at);
    }

    #[test]
    fn test_provider_resources_filter() {
        let mut state = GlobalState::new();
        let resource = gateway();
        state.set_resource(
            state_key("aws", &resource.key()),
            ResourceState::from_resource(&resource),
        );
        state.set_resource(
            state_key("memory", &resource.key()),
            ResourceState::from_resource(&resource),
        );

        assert_eq!(state.get_provider_resources("aws").len(), 1);
        assert!(state.get_provider_resources("gcp").is_empty());
    }
}
