//! Per-run context
//!
//! Holds the run settings and the two pieces of shared state of a run: the
//! shared gateway and the shared topic. Both are published once and read
//! many times afterwards.

use crate::error::{CloudError, Result};
use crate::provider::{Resource, ResourceKind};
use lambdaflow_core::RunConfig;
use std::collections::BTreeMap;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// Tag identifying resources managed by lambdaflow
pub const MANAGED_BY_TAG: &str = "managed-by";
/// Tag carrying the project name
pub const PROJECT_TAG: &str = "lambdaflow:project";

/// Shared HTTP entry point of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayHandle {
    pub logical_name: String,
    pub id: String,
    pub endpoint: Option<String>,
    /// ARN prefix used by invoke permissions
    pub execution_arn: String,
}

impl GatewayHandle {
    pub fn from_resource(resource: &Resource) -> Result<Self> {
        if resource.kind != ResourceKind::Gateway {
            return Err(CloudError::InvalidResource(format!(
                "expected a gateway, got {}",
                resource.key()
            )));
        }
        let execution_arn = resource.arn.clone().ok_or_else(|| {
            CloudError::InvalidResource(format!("gateway {} has no execution ARN", resource.id))
        })?;
        Ok(Self {
            logical_name: resource.logical_name.clone(),
            id: resource.id.clone(),
            endpoint: resource.attribute("endpoint").map(|s| s.to_string()),
            execution_arn,
        })
    }

    /// Placeholder used while planning, before the gateway exists
    pub fn pending(logical_name: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            id: String::new(),
            endpoint: None,
            execution_arn: String::new(),
        }
    }

    /// Source ARN matching any stage and any method under this gateway
    pub fn invoke_source_arn(&self) -> String {
        format!("{}/*/*", self.execution_arn)
    }
}

/// Shared pub/sub topic of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicHandle {
    pub logical_name: String,
    pub arn: String,
}

impl TopicHandle {
    pub fn from_resource(resource: &Resource) -> Result<Self> {
        if resource.kind != ResourceKind::Topic {
            return Err(CloudError::InvalidResource(format!(
                "expected a topic, got {}",
                resource.key()
            )));
        }
        let arn = resource.arn.clone().ok_or_else(|| {
            CloudError::InvalidResource(format!("topic {} has no ARN", resource.id))
        })?;
        Ok(Self {
            logical_name: resource.logical_name.clone(),
            arn,
        })
    }

    pub fn pending(logical_name: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            arn: String::new(),
        }
    }
}

/// Explicit state of one provisioning run
#[derive(Debug)]
pub struct RunContext {
    run: RunConfig,
    gateway: OnceCell<GatewayHandle>,
    topic: OnceCell<TopicHandle>,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(run: RunConfig) -> Self {
        Self {
            run,
            gateway: OnceCell::new(),
            topic: OnceCell::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(&self) -> &RunConfig {
        &self.run
    }

    pub fn gateway(&self) -> Option<&GatewayHandle> {
        self.gateway.get()
    }

    pub fn topic(&self) -> Option<&TopicHandle> {
        self.topic.get()
    }

    pub(crate) fn gateway_cell(&self) -> &OnceCell<GatewayHandle> {
        &self.gateway
    }

    pub(crate) fn topic_cell(&self) -> &OnceCell<TopicHandle> {
        &self.topic
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run tags plus the lambdaflow management tags
    pub fn resource_tags(&self) -> BTreeMap<String, String> {
        let mut tags = self.run.tags.clone();
        tags.insert(MANAGED_BY_TAG.to_string(), "lambdaflow".to_string());
        if !self.run.project.is_empty() {
            tags.insert(PROJECT_TAG.to_string(), self.run.project.clone());
        }
        tags
    }
}
