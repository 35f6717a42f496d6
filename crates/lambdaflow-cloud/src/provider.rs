//! Cloud provider trait definition

use crate::artifact::ObjectRef;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Cloud provider abstraction trait
///
/// A provider is an idempotent remote CRUD service: every resource is
/// addressed by `(kind, logical name)` and [`CloudProvider::create_or_get`]
/// never creates a second resource for a key that already exists.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "aws", "memory")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Find a resource previously created under this key
    async fn lookup(&self, key: &ResourceKey) -> Result<Option<Resource>>;

    /// Create a resource unconditionally
    async fn create(&self, config: &ResourceConfig) -> Result<Resource>;

    /// All resources known to this provider
    async fn resources(&self) -> Result<Vec<Resource>>;

    /// Create-or-reuse keyed by `(kind, logical name)`
    async fn create_or_get(&self, config: &ResourceConfig) -> Result<Resource> {
        let key = config.key();
        if let Some(mut existing) = self.lookup(&key).await? {
            tracing::debug!(%key, id = %existing.id, "Reusing existing resource");
            existing.created = false;
            return Ok(existing);
        }

        tracing::info!(%key, "Creating resource");
        let mut resource = self.create(config).await?;
        resource.created = true;
        Ok(resource)
    }
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Kind of a managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Bucket,
    Function,
    /// Shared HTTP entry point; its `arn` is the execution ARN
    Gateway,
    /// Auto-deployed stage of the gateway
    Stage,
    /// Gateway-to-function proxy integration
    Integration,
    Route,
    Topic,
    Subscription,
    Permission,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Bucket => "bucket",
            ResourceKind::Function => "function",
            ResourceKind::Gateway => "gateway",
            ResourceKind::Stage => "stage",
            ResourceKind::Integration => "integration",
            ResourceKind::Route => "route",
            ResourceKind::Topic => "topic",
            ResourceKind::Subscription => "subscription",
            ResourceKind::Permission => "permission",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic identity of a resource: `(kind, logical name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub logical_name: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, logical_name: impl Into<String>) -> Self {
        Self {
            kind,
            logical_name: logical_name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.logical_name)
    }
}

/// Provider-facing description of what to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResourceSpec {
    Bucket {
        name: String,
    },
    Function {
        name: String,
        artifact: ObjectRef,
        entry_point: String,
        runtime: String,
        role: Option<String>,
        environment: BTreeMap<String, String>,
    },
    Gateway {
        name: String,
    },
    Stage {
        gateway_id: String,
        name: String,
    },
    Integration {
        gateway_id: String,
        function_arn: String,
    },
    Route {
        gateway_id: String,
        route_key: String,
        integration_id: String,
    },
    Topic {
        name: String,
    },
    Subscription {
        topic_arn: String,
        function_arn: String,
    },
    Permission {
        function_name: String,
        statement_id: String,
        principal: String,
        source_arn: String,
    },
}

impl ResourceSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceSpec::Bucket { .. } => ResourceKind::Bucket,
            ResourceSpec::Function { .. } => ResourceKind::Function,
            ResourceSpec::Gateway { .. } => ResourceKind::Gateway,
            ResourceSpec::Stage { .. } => ResourceKind::Stage,
            ResourceSpec::Integration { .. } => ResourceKind::Integration,
            ResourceSpec::Route { .. } => ResourceKind::Route,
            ResourceSpec::Topic { .. } => ResourceKind::Topic,
            ResourceSpec::Subscription { .. } => ResourceKind::Subscription,
            ResourceSpec::Permission { .. } => ResourceKind::Permission,
        }
    }
}

/// Configuration for a cloud resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Stable name the resource is reconciled under
    pub logical_name: String,

    pub spec: ResourceSpec,

    /// Tags applied on creation
    pub tags: BTreeMap<String, String>,
}

impl ResourceConfig {
    pub fn new(logical_name: impl Into<String>, spec: ResourceSpec) -> Self {
        Self {
            logical_name: logical_name.into(),
            spec,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.spec.kind()
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.kind(), self.logical_name.clone())
    }
}

/// A resource as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub logical_name: String,

    /// Provider-specific identifier
    pub id: String,

    /// ARN-equivalent, when the provider has one
    pub arn: Option<String>,

    /// Extra attributes (endpoint, route key, ...)
    pub attributes: BTreeMap<String, String>,

    /// Whether this run created the resource (false when it was reused)
    #[serde(skip)]
    pub created: bool,
}

impl Resource {
    pub fn new(kind: ResourceKind, logical_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            logical_name: logical_name.into(),
            id: id.into(),
            arn: None,
            attributes: BTreeMap::new(),
            created: false,
        }
    }

    pub fn with_arn(mut self, arn: impl Into<String>) -> Self {
        self.arn = Some(arn.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.kind, self.logical_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_key_display() {
        let key = ResourceKey::new(ResourceKind::Permission, "apiHandler:apigateway");
        assert_eq!(key.to_string(), "permission:apiHandler:apigateway");
    }

    #[test]
    fn test_config_kind_follows_resource_spec() {
        let config = ResourceConfig::new(
            "events",
            ResourceSpec::Topic {
                name: "events".to_string(),
            },
        );
        assert_eq!(config.kind(), ResourceKind::Topic);
        assert_eq!(config.key(), ResourceKey::new(ResourceKind::Topic, "events"));
    }

    #[test]
    fn test_spec_serializes_with_kind_tag() {
        let spec = ResourceSpec::Stage {
            gateway_id: "abc".to_string(),
            name: "$default".to_string(),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["kind"], "stage");
        assert_eq!(json["gateway_id"], "abc");
    }
}
