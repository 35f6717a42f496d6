//! AWS provider implementation
//!
//! Lookups are answered from the state file: API Gateway does not
//! deduplicate APIs by name, so the recorded id is the only reliable way
//! to find a gateway created by an earlier run. Creates that conflict with
//! an existing function or permission statement adopt the remote resource.

use crate::clients::AwsClients;
use crate::error::{AwsError, Result};
use async_trait::async_trait;
use aws_sdk_apigatewayv2::types::{IntegrationType, ProtocolType};
use aws_sdk_lambda::types::{Environment, FunctionCode, Runtime};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration, Tagging};
use lambdaflow_cloud::{
    AuthStatus, CloudProvider, GlobalState, ObjectRef, Resource, ResourceConfig, ResourceKey,
    ResourceKind, ResourceSpec, ResourceState, StateManager, state_key,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{Mutex, OnceCell};

const PROVIDER_NAME: &str = "aws";

/// Region in which S3 rejects an explicit location constraint
const S3_DEFAULT_REGION: &str = "us-east-1";

/// `arn:aws:execute-api:<region>:<account>:<api id>`
pub fn execution_arn(region: &str, account_id: &str, api_id: &str) -> String {
    format!("arn:aws:execute-api:{}:{}:{}", region, account_id, api_id)
}

/// Integration target of a route
pub fn integration_target(integration_id: &str) -> String {
    format!("integrations/{}", integration_id)
}

fn tag_map(tags: &BTreeMap<String, String>) -> HashMap<String, String> {
    tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// AWS provider
pub struct AwsProvider {
    clients: AwsClients,
    state_manager: StateManager,
    state: Mutex<GlobalState>,
    account_id: OnceCell<String>,
}

impl AwsProvider {
    /// Create a provider backed by `state_manager`
    pub async fn connect(clients: AwsClients, state_manager: StateManager) -> Result<Self> {
        let state = state_manager.load().await?;
        tracing::debug!(
            region = %clients.region,
            recorded = state.get_provider_resources(PROVIDER_NAME).len(),
            "AWS provider ready"
        );
        Ok(Self {
            clients,
            state_manager,
            state: Mutex::new(state),
            account_id: OnceCell::new(),
        })
    }

    pub fn clients(&self) -> &AwsClients {
        &self.clients
    }

    async fn account_id(&self) -> Result<&str> {
        let id = self
            .account_id
            .get_or_try_init(|| async move {
                let identity = self
                    .clients
                    .sts
                    .get_caller_identity()
                    .send()
                    .await
                    .map_err(|e| AwsError::api("GetCallerIdentity", e))?;
                identity
                    .account()
                    .map(|a| a.to_string())
                    .ok_or(AwsError::MissingAccountId)
            })
            .await?;
        Ok(id.as_str())
    }

    /// Persist a freshly created resource.
    ///
    /// The in-memory state keeps the entry even when saving fails, so the
    /// rest of this run still reuses it.
    async fn record(&self, resource: &Resource) -> Result<()> {
        let mut state = self.state.lock().await;
        state.set_resource(
            state_key(PROVIDER_NAME, &resource.key()),
            ResourceState::from_resource(resource),
        );

        if let Err(e) = self.state_manager.save(&state).await {
            tracing::warn!(
                key = %resource.key(),
                id = %resource.id,
                arn = resource.arn.as_deref().unwrap_or("-"),
                error = %e,
                "Created resource is missing from the state file"
            );
            return Err(AwsError::Unrecorded {
                key: resource.key().to_string(),
                id: resource.id.clone(),
                message: e.to_string(),
            });
        }
        Ok(())
    }

    async fn create_resource(&self, config: &ResourceConfig) -> Result<Resource> {
        let name = config.logical_name.as_str();
        let tags = &config.tags;

        match &config.spec {
            ResourceSpec::Bucket { name: bucket } => self.ensure_bucket(name, bucket, tags).await,
            ResourceSpec::Function {
                name: function_name,
                artifact,
                entry_point,
                runtime,
                role,
                environment,
            } => {
                let role = role
                    .as_deref()
                    .ok_or_else(|| AwsError::MissingExecutionRole(function_name.clone()))?;
                self.create_function(
                    name,
                    function_name,
                    artifact,
                    entry_point,
                    runtime,
                    role,
                    environment,
                    tags,
                )
                .await
            }
            ResourceSpec::Gateway { name: api_name } => self.create_api(name, api_name, tags).await,
            ResourceSpec::Stage {
                gateway_id,
                name: stage,
            } => {
                let output = self
                    .clients
                    .apigateway
                    .create_stage()
                    .api_id(gateway_id)
                    .stage_name(stage)
                    .auto_deploy(true)
                    .set_tags(Some(tag_map(tags)))
                    .send()
                    .await
                    .map_err(|e| AwsError::api("CreateStage", e))?;
                let stage_name = output.stage_name().unwrap_or(stage.as_str());
                Ok(Resource::new(ResourceKind::Stage, name, stage_name)
                    .with_attribute("gateway_id", gateway_id))
            }
            ResourceSpec::Integration {
                gateway_id,
                function_arn,
            } => {
                let output = self
                    .clients
                    .apigateway
                    .create_integration()
                    .api_id(gateway_id)
                    .integration_type(IntegrationType::AwsProxy)
                    .integration_uri(function_arn)
                    .payload_format_version("2.0")
                    .send()
                    .await
                    .map_err(|e| AwsError::api("CreateIntegration", e))?;
                let id = output
                    .integration_id()
                    .ok_or(AwsError::IncompleteResponse("CreateIntegration"))?;
                Ok(Resource::new(ResourceKind::Integration, name, id)
                    .with_attribute("gateway_id", gateway_id))
            }
            ResourceSpec::Route {
                gateway_id,
                route_key,
                integration_id,
            } => {
                let output = self
                    .clients
                    .apigateway
                    .create_route()
                    .api_id(gateway_id)
                    .route_key(route_key)
                    .target(integration_target(integration_id))
                    .send()
                    .await
                    .map_err(|e| AwsError::api("CreateRoute", e))?;
                let id = output
                    .route_id()
                    .ok_or(AwsError::IncompleteResponse("CreateRoute"))?;
                Ok(Resource::new(ResourceKind::Route, name, id)
                    .with_attribute("gateway_id", gateway_id)
                    .with_attribute("route_key", route_key))
            }
            ResourceSpec::Topic { name: topic } => self.create_topic(name, topic, tags).await,
            ResourceSpec::Subscription {
                topic_arn,
                function_arn,
            } => {
                // Subscribe is idempotent for the same endpoint
                let output = self
                    .clients
                    .sns
                    .subscribe()
                    .topic_arn(topic_arn)
                    .protocol("lambda")
                    .endpoint(function_arn)
                    .return_subscription_arn(true)
                    .send()
                    .await
                    .map_err(|e| AwsError::api("Subscribe", e))?;
                let arn = output
                    .subscription_arn()
                    .ok_or(AwsError::IncompleteResponse("Subscribe"))?;
                Ok(Resource::new(ResourceKind::Subscription, name, arn)
                    .with_arn(arn)
                    .with_attribute("topic_arn", topic_arn))
            }
            ResourceSpec::Permission {
                function_name,
                statement_id,
                principal,
                source_arn,
            } => {
                self.add_permission(name, function_name, statement_id, principal, source_arn)
                    .await
            }
        }
    }

    async fn ensure_bucket(
        &self,
        name: &str,
        bucket: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<Resource> {
        let s3 = &self.clients.s3;
        let resource = Resource::new(ResourceKind::Bucket, name, bucket)
            .with_arn(format!("arn:aws:s3:::{}", bucket));

        match s3.head_bucket().bucket(bucket).send().await {
            Ok(_) => {
                tracing::info!(bucket, "Adopting existing bucket");
                return Ok(resource);
            }
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {}
            Err(e) => return Err(AwsError::api("HeadBucket", e)),
        }

        let mut request = s3.create_bucket().bucket(bucket);
        if self.clients.region != S3_DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(
                        self.clients.region.as_str(),
                    ))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|e| AwsError::api("CreateBucket", e))?;

        if !tags.is_empty() {
            let tag_set = tags
                .iter()
                .map(|(k, v)| {
                    aws_sdk_s3::types::Tag::builder()
                        .key(k)
                        .value(v)
                        .build()
                        .map_err(|e| AwsError::InvalidTag {
                            key: k.clone(),
                            message: e.to_string(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            let tagging = Tagging::builder()
                .set_tag_set(Some(tag_set))
                .build()
                .map_err(|e| AwsError::InvalidTag {
                    key: "*".to_string(),
                    message: e.to_string(),
                })?;
            s3.put_bucket_tagging()
                .bucket(bucket)
                .tagging(tagging)
                .send()
                .await
                .map_err(|e| AwsError::api("PutBucketTagging", e))?;
        }

        Ok(resource)
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_function(
        &self,
        name: &str,
        function_name: &str,
        artifact: &ObjectRef,
        entry_point: &str,
        runtime: &str,
        role: &str,
        environment: &BTreeMap<String, String>,
        tags: &BTreeMap<String, String>,
    ) -> Result<Resource> {
        let lambda = &self.clients.lambda;
        let code = FunctionCode::builder()
            .s3_bucket(&artifact.bucket)
            .s3_key(&artifact.key)
            .build();

        let mut request = lambda
            .create_function()
            .function_name(function_name)
            .runtime(Runtime::from(runtime))
            .role(role)
            .handler(entry_point)
            .code(code)
            .set_tags(Some(tag_map(tags)));
        if !environment.is_empty() {
            request = request.environment(
                Environment::builder()
                    .set_variables(Some(tag_map(environment)))
                    .build(),
            );
        }

        let arn = match request.send().await {
            Ok(output) => output
                .function_arn()
                .map(|a| a.to_string())
                .ok_or(AwsError::IncompleteResponse("CreateFunction"))?,
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_resource_conflict_exception()) =>
            {
                tracing::info!(function = function_name, "Adopting existing function");
                let output = lambda
                    .get_function()
                    .function_name(function_name)
                    .send()
                    .await
                    .map_err(|e| AwsError::api("GetFunction", e))?;
                output
                    .configuration()
                    .and_then(|c| c.function_arn())
                    .map(|a| a.to_string())
                    .ok_or(AwsError::IncompleteResponse("GetFunction"))?
            }
            Err(e) => return Err(AwsError::api("CreateFunction", e)),
        };

        Ok(Resource::new(ResourceKind::Function, name, function_name)
            .with_arn(arn)
            .with_attribute("artifact", artifact.to_string()))
    }

    async fn create_api(
        &self,
        name: &str,
        api_name: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<Resource> {
        let output = self
            .clients
            .apigateway
            .create_api()
            .name(api_name)
            .protocol_type(ProtocolType::Http)
            .set_tags(Some(tag_map(tags)))
            .send()
            .await
            .map_err(|e| AwsError::api("CreateApi", e))?;

        let api_id = output
            .api_id()
            .ok_or(AwsError::IncompleteResponse("CreateApi"))?;
        let account_id = self.account_id().await?;

        let mut resource = Resource::new(ResourceKind::Gateway, name, api_id)
            .with_arn(execution_arn(&self.clients.region, account_id, api_id));
        if let Some(endpoint) = output.api_endpoint() {
            resource = resource.with_attribute("endpoint", endpoint);
        }
        Ok(resource)
    }

    async fn create_topic(
        &self,
        name: &str,
        topic: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<Resource> {
        let sns_tags = tags
            .iter()
            .map(|(k, v)| {
                aws_sdk_sns::types::Tag::builder()
                    .key(k)
                    .value(v)
                    .build()
                    .map_err(|e| AwsError::InvalidTag {
                        key: k.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        // CreateTopic returns the existing ARN for a known name
        let output = self
            .clients
            .sns
            .create_topic()
            .name(topic)
            .set_tags(Some(sns_tags))
            .send()
            .await
            .map_err(|e| AwsError::api("CreateTopic", e))?;
        let arn = output
            .topic_arn()
            .ok_or(AwsError::IncompleteResponse("CreateTopic"))?;

        Ok(Resource::new(ResourceKind::Topic, name, topic).with_arn(arn))
    }

    async fn add_permission(
        &self,
        name: &str,
        function_name: &str,
        statement_id: &str,
        principal: &str,
        source_arn: &str,
    ) -> Result<Resource> {
        let result = self
            .clients
            .lambda
            .add_permission()
            .function_name(function_name)
            .statement_id(statement_id)
            .action("lambda:InvokeFunction")
            .principal(principal)
            .source_arn(source_arn)
            .send()
            .await;

        match result {
            Ok(_) => {}
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_resource_conflict_exception()) =>
            {
                tracing::info!(
                    function = function_name,
                    statement_id,
                    "Permission statement already present"
                );
            }
            Err(e) => return Err(AwsError::api("AddPermission", e)),
        }

        Ok(Resource::new(ResourceKind::Permission, name, statement_id)
            .with_attribute("function", function_name)
            .with_attribute("principal", principal)
            .with_attribute("source_arn", source_arn))
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "Amazon Web Services"
    }

    async fn check_auth(&self) -> lambdaflow_cloud::Result<lambdaflow_cloud::AuthStatus> {
        match self.clients.sts.get_caller_identity().send().await {
            Ok(identity) => {
                let account = identity.account().unwrap_or("unknown");
                let arn = identity.arn().unwrap_or("unknown");
                Ok(AuthStatus::ok(format!("{} ({})", account, arn)))
            }
            Err(e) => Ok(AuthStatus::failed(
                AwsError::api("GetCallerIdentity", e).to_string(),
            )),
        }
    }

    async fn lookup(&self, key: &ResourceKey) -> lambdaflow_cloud::Result<Option<Resource>> {
        let state = self.state.lock().await;
        let found = state
            .get_resource(&state_key(PROVIDER_NAME, key))
            .map(|s| s.to_resource());
        tracing::debug!(%key, found = found.is_some(), "State lookup");
        Ok(found)
    }

    async fn create(&self, config: &ResourceConfig) -> lambdaflow_cloud::Result<Resource> {
        let resource = self.create_resource(config).await?;
        self.record(&resource).await?;
        tracing::info!(key = %resource.key(), id = %resource.id, "Created AWS resource");
        Ok(resource)
    }

    async fn resources(&self) -> lambdaflow_cloud::Result<Vec<Resource>> {
        let state = self.state.lock().await;
        Ok(state
            .get_provider_resources(PROVIDER_NAME)
            .into_iter()
            .map(|(_, s)| s.to_resource())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_arn() {
        assert_eq!(
            execution_arn("eu-west-1", "123456789012", "a1b2c3"),
            "arn:aws:execute-api:eu-west-1:123456789012:a1b2c3"
        );
    }

    #[test]
    fn test_integration_target() {
        assert_eq!(integration_target("xyz"), "integrations/xyz");
    }

    #[test]
    fn test_tag_map() {
        let mut tags = BTreeMap::new();
        tags.insert("managed-by".to_string(), "lambdaflow".to_string());
        let map = tag_map(&tags);
        assert_eq!(map.get("managed-by").map(String::as_str), Some("lambdaflow"));
    }

    fn offline_clients() -> AwsClients {
        let config = aws_config::SdkConfig::builder()
            .region(aws_config::Region::new("eu-west-1"))
            .behavior_version(aws_config::BehaviorVersion::latest())
            .build();
        AwsClients::from_config("eu-west-1", &config)
    }

    #[tokio::test]
    async fn test_lookup_reads_recorded_state() {
        let temp = tempfile::tempdir().unwrap();
        let manager = StateManager::new(temp.path());

        let gateway = Resource::new(ResourceKind::Gateway, "first-api", "a1b2c3")
            .with_arn(execution_arn("eu-west-1", "123456789012", "a1b2c3"));
        let mut state = GlobalState::default();
        state.set_resource(
            state_key(PROVIDER_NAME, &gateway.key()),
            ResourceState::from_resource(&gateway),
        );
        // entries of other providers are ignored
        state.set_resource(
            "memory:function:apiHandler".to_string(),
            ResourceState::from_resource(&Resource::new(
                ResourceKind::Function,
                "apiHandler",
                "fn-1",
            )),
        );
        manager.save(&state).await.unwrap();

        let provider = AwsProvider::connect(offline_clients(), StateManager::new(temp.path()))
            .await
            .unwrap();

        let found = provider
            .lookup(&ResourceKey::new(ResourceKind::Gateway, "first-api"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "a1b2c3");
        assert!(!found.created);

        let missing = provider
            .lookup(&ResourceKey::new(ResourceKind::Function, "apiHandler"))
            .await
            .unwrap();
        assert!(missing.is_none());

        assert_eq!(provider.resources().await.unwrap().len(), 1);
        assert_eq!(provider.name(), "aws");
    }

    #[tokio::test]
    async fn test_unsaved_resource_reports_its_id() {
        let temp = tempfile::tempdir().unwrap();
        let provider = AwsProvider::connect(offline_clients(), StateManager::new(temp.path()))
            .await
            .unwrap();
        // the state directory cannot be created over a regular file
        std::fs::write(temp.path().join(".lambdaflow"), "").unwrap();

        let gateway = Resource::new(ResourceKind::Gateway, "first-api", "a1b2c3");
        let err = provider.record(&gateway).await.unwrap_err();
        match &err {
            AwsError::Unrecorded { key, id, .. } => {
                assert_eq!(key, "gateway:first-api");
                assert_eq!(id, "a1b2c3");
            }
            other => panic!("expected an unrecorded resource, got {:?}", other),
        }
        assert!(matches!(
            lambdaflow_cloud::CloudError::from(err),
            lambdaflow_cloud::CloudError::StateError(ref msg) if msg.contains("a1b2c3")
        ));

        // later lookups in the same run still see it
        let found = provider
            .lookup(&ResourceKey::new(ResourceKind::Gateway, "first-api"))
            .await
            .unwrap();
        assert_eq!(found.map(|r| r.id), Some("a1b2c3".to_string()));
    }
}
