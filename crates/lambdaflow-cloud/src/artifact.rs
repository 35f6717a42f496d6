//! Artifact store contract and the bundle publisher
//!
//! Handler bundles are built elsewhere; this module only moves
//! `<dist>/<handler>.zip` into the artifact bucket.

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Location of an uploaded object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Object storage used for handler bundles
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload `body` to `bucket/key`
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<ObjectRef>;

    /// Check whether `bucket/key` exists
    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectRef>>;
}

/// Object key of a handler bundle
pub fn bundle_key(handler_name: &str) -> String {
    format!("{}.zip", handler_name)
}

/// Uploads `<dist_dir>/<handler>.zip` to `<bucket>/<handler>.zip`
pub struct ArtifactPublisher {
    store: Arc<dyn ArtifactStore>,
    bucket: String,
    dist_dir: PathBuf,
}

impl ArtifactPublisher {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        bucket: impl Into<String>,
        dist_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            dist_dir: dist_dir.as_ref().to_path_buf(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Local path of the bundle for `handler_name`
    pub fn bundle_path(&self, handler_name: &str) -> PathBuf {
        self.dist_dir.join(bundle_key(handler_name))
    }

    /// Upload the bundle for `handler_name`
    pub async fn publish(&self, handler_name: &str) -> Result<ObjectRef> {
        let path = self.bundle_path(handler_name);
        if !tokio::fs::try_exists(&path).await? {
            return Err(CloudError::BundleNotFound(path));
        }

        let body = tokio::fs::read(&path).await?;
        let key = bundle_key(handler_name);
        tracing::info!(
            path = %path.display(),
            bucket = %self.bucket,
            key = %key,
            bytes = body.len(),
            "Uploading bundle"
        );

        let object = self.store.put(&self.bucket, &key, body).await?;
        tracing::info!(object = %object, "Bundle uploaded");
        Ok(object)
    }
}
