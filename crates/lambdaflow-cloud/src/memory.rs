//! In-memory provider
//!
//! Simulates the remote provider for tests and dry runs: resources live in
//! a map keyed by `(kind, logical name)`, every call is recorded, and
//! creates can be made to fail for chosen keys.

use crate::artifact::{ArtifactStore, ObjectRef};
use crate::error::{CloudError, Result};
use crate::provider::{
    AuthStatus, CloudProvider, Resource, ResourceConfig, ResourceKey, ResourceKind, ResourceSpec,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

const SIM_ACCOUNT: &str = "000000000000";
const SIM_REGION: &str = "sim-local-1";

/// A call observed by [`MemoryProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Lookup(ResourceKey),
    Create(ResourceKey),
    Put { bucket: String, key: String },
    Head { bucket: String, key: String },
}

#[derive(Debug, Default)]
struct Inner {
    resources: BTreeMap<ResourceKey, Resource>,
    objects: BTreeMap<(String, String), Vec<u8>>,
    calls: Vec<ProviderCall>,
    failures: BTreeSet<ResourceKey>,
    next_id: u64,
}

/// Simulated cloud provider and artifact store
#[derive(Debug, Default)]
pub struct MemoryProvider {
    inner: Mutex<Inner>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // state stays readable after a panic in another test
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next creates of `(kind, logical_name)` fail
    pub fn fail_on_create(&self, kind: ResourceKind, logical_name: impl Into<String>) {
        self.lock()
            .failures
            .insert(ResourceKey::new(kind, logical_name));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Seed an object in the simulated bucket
    pub fn insert_object(&self, bucket: impl Into<String>, key: impl Into<String>, body: Vec<u8>) {
        self.lock().objects.insert((bucket.into(), key.into()), body);
    }

    pub fn with_object(self, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        self.insert_object(bucket, key, Vec::new());
        self
    }

    pub fn has_object(&self, bucket: &str, key: &str) -> bool {
        self.lock()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    /// Seed a resource as if an earlier run had created it
    pub fn insert_resource(&self, resource: Resource) {
        self.lock().resources.insert(resource.key(), resource);
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of create calls, all kinds
    pub fn total_creates(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ProviderCall::Create(_)))
            .count()
    }

    /// Number of create calls for `kind`
    pub fn create_count(&self, kind: ResourceKind) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ProviderCall::Create(key) if key.kind == kind))
            .count()
    }

    /// Number of existing resources of `kind`
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.lock()
            .resources
            .keys()
            .filter(|k| k.kind == kind)
            .count()
    }

    pub fn get(&self, kind: ResourceKind, logical_name: &str) -> Option<Resource> {
        self.lock()
            .resources
            .get(&ResourceKey::new(kind, logical_name))
            .cloned()
    }
}

fn materialize(inner: &mut Inner, config: &ResourceConfig) -> Result<Resource> {
    inner.next_id += 1;
    let seq = inner.next_id;
    let kind = config.kind();
    let name = config.logical_name.as_str();

    let resource = match &config.spec {
        ResourceSpec::Bucket { name: bucket } => {
            Resource::new(kind, name, bucket.as_str()).with_arn(format!("arn:sim:s3:::{}", bucket))
        }
        ResourceSpec::Function { name, artifact, .. } => {
            let bundle = (artifact.bucket.clone(), artifact.key.clone());
            if !inner.objects.contains_key(&bundle) {
                return Err(CloudError::ApiError(format!(
                    "code object {} does not exist",
                    artifact
                )));
            }
            Resource::new(kind, config.logical_name.as_str(), name.as_str()).with_arn(format!(
                "arn:sim:lambda:{}:{}:function:{}",
                SIM_REGION, SIM_ACCOUNT, name
            ))
        }
        ResourceSpec::Gateway { .. } => {
            let id = format!("gw{:06}", seq);
            Resource::new(kind, name, id.as_str())
                .with_arn(format!(
                    "arn:sim:execute-api:{}:{}:{}",
                    SIM_REGION, SIM_ACCOUNT, id
                ))
                .with_attribute("endpoint", format!("https://{}.execute-api.sim", id))
        }
        ResourceSpec::Stage { gateway_id, name: stage } => {
            require(inner, ResourceKind::Gateway, gateway_id)?;
            Resource::new(kind, name, stage.as_str()).with_attribute("gateway_id", gateway_id)
        }
        ResourceSpec::Integration { gateway_id, function_arn } => {
            require(inner, ResourceKind::Gateway, gateway_id)?;
            Resource::new(kind, name, format!("int{:06}", seq))
                .with_attribute("gateway_id", gateway_id)
                .with_attribute("function_arn", function_arn)
        }
        ResourceSpec::Route {
            gateway_id,
            route_key,
            integration_id,
        } => {
            require(inner, ResourceKind::Gateway, gateway_id)?;
            require(inner, ResourceKind::Integration, integration_id)?;
            Resource::new(kind, name, format!("rt{:06}", seq))
                .with_attribute("gateway_id", gateway_id)
                .with_attribute("route_key", route_key)
        }
        ResourceSpec::Topic { name: topic } => Resource::new(kind, name, topic.as_str()).with_arn(
            format!("arn:sim:sns:{}:{}:{}", SIM_REGION, SIM_ACCOUNT, topic),
        ),
        ResourceSpec::Subscription {
            topic_arn,
            function_arn,
        } => {
            let arn = format!("{}:sub{:06}", topic_arn, seq);
            Resource::new(kind, name, arn.as_str())
                .with_arn(arn)
                .with_attribute("endpoint", function_arn)
        }
        ResourceSpec::Permission {
            statement_id,
            principal,
            source_arn,
            ..
        } => Resource::new(kind, name, statement_id.as_str())
            .with_attribute("principal", principal)
            .with_attribute("source_arn", source_arn),
    };
    Ok(resource)
}

/// Fail when no resource of `kind` has the provider id `id`
fn require(inner: &Inner, kind: ResourceKind, id: &str) -> Result<()> {
    let found = inner
        .resources
        .values()
        .any(|r| r.kind == kind && r.id == id);
    if found {
        Ok(())
    } else {
        Err(CloudError::ResourceNotFound(format!("{} {}", kind, id)))
    }
}

#[async_trait]
impl CloudProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn display_name(&self) -> &str {
        "In-memory simulator"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok(SIM_ACCOUNT))
    }

    async fn lookup(&self, key: &ResourceKey) -> Result<Option<Resource>> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Lookup(key.clone()));
        Ok(inner.resources.get(key).cloned())
    }

    async fn create(&self, config: &ResourceConfig) -> Result<Resource> {
        let key = config.key();
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Create(key.clone()));

        if inner.failures.contains(&key) {
            return Err(CloudError::ApiError(format!("injected failure for {}", key)));
        }
        if inner.resources.contains_key(&key) {
            return Err(CloudError::ResourceAlreadyExists(key.to_string()));
        }

        let resource = materialize(&mut inner, config)?;
        inner.resources.insert(key, resource.clone());
        Ok(resource)
    }

    async fn resources(&self) -> Result<Vec<Resource>> {
        Ok(self.lock().resources.values().cloned().collect())
    }
}

#[async_trait]
impl ArtifactStore for MemoryProvider {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<ObjectRef> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        inner
            .objects
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(ObjectRef::new(bucket, key))
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectRef>> {
        let mut inner = self.lock();
        inner.calls.push(ProviderCall::Head {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        let exists = inner
            .objects
            .contains_key(&(bucket.to_string(), key.to_string()));
        Ok(exists.then(|| ObjectRef::new(bucket, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(name: &str) -> ResourceConfig {
        ResourceConfig::new(
            name,
            ResourceSpec::Topic {
                name: name.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_create_or_get_is_idempotent() {
        let provider = MemoryProvider::new();

        let first = provider.create_or_get(&topic("events")).await.unwrap();
        assert!(first.created);
        let second = provider.create_or_get(&topic("events")).await.unwrap();
        assert!(!second.created);
        assert_eq!(first.arn, second.arn);

        assert_eq!(provider.count(ResourceKind::Topic), 1);
        assert_eq!(provider.create_count(ResourceKind::Topic), 1);
    }

    #[tokio::test]
    async fn test_plain_create_rejects_existing_key() {
        let provider = MemoryProvider::new();
        provider.create(&topic("events")).await.unwrap();

        assert!(matches!(
            provider.create(&topic("events")).await,
            Err(CloudError::ResourceAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let provider = MemoryProvider::new();
        provider.fail_on_create(ResourceKind::Topic, "events");

        assert!(provider.create_or_get(&topic("events")).await.is_err());
        assert_eq!(provider.count(ResourceKind::Topic), 0);

        provider.clear_failures();
        assert!(provider.create_or_get(&topic("events")).await.is_ok());
    }

    #[tokio::test]
    async fn test_route_requires_integration() {
        let provider = MemoryProvider::new();
        let gateway = provider
            .create(&ResourceConfig::new(
                "api",
                ResourceSpec::Gateway {
                    name: "api".to_string(),
                },
            ))
            .await
            .unwrap();

        let route = ResourceConfig::new(
            "handler",
            ResourceSpec::Route {
                gateway_id: gateway.id.clone(),
                route_key: "ANY /handler".to_string(),
                integration_id: "missing".to_string(),
            },
        );
        assert!(matches!(
            provider.create(&route).await,
            Err(CloudError::ResourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_object_store() {
        let provider = MemoryProvider::new();
        assert!(provider.head("b", "k.zip").await.unwrap().is_none());

        provider.put("b", "k.zip", vec![1, 2, 3]).await.unwrap();
        assert_eq!(
            provider.head("b", "k.zip").await.unwrap(),
            Some(ObjectRef::new("b", "k.zip"))
        );
        assert_eq!(provider.calls().len(), 3);
    }
}
