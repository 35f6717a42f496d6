//! Idempotent multi-resource reconciler
//!
//! Walks the handlers of a stack in input order and makes sure every
//! resource they need exists: the artifact bucket, one function per
//! handler, the shared gateway and topic, and the bindings and invoke
//! permissions produced by the [binder](crate::binder). Every create is
//! keyed by `(kind, logical name)` and preceded by a lookup, so running
//! twice against the same provider creates nothing the second time.

use crate::action::{Action, ActionType, HandlerOutcome, Plan, RunReport};
use crate::artifact::{ArtifactStore, ObjectRef};
use crate::binder::{Binding, bind, with_shared_names};
use crate::context::{GatewayHandle, RunContext, TopicHandle};
use crate::error::{CloudError, Result};
use crate::provider::{
    CloudProvider, Resource, ResourceConfig, ResourceKey, ResourceKind, ResourceSpec,
};
use lambdaflow_core::{HandlerConfig, RunConfig, validate};
use std::sync::Arc;
use std::time::Instant;

/// Name of the auto-deployed gateway stage
pub const DEFAULT_STAGE: &str = "$default";

/// Options for a reconciliation run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Continue with the remaining handlers after one fails
    pub keep_going: bool,
}

pub struct Reconciler {
    provider: Arc<dyn CloudProvider>,
    store: Arc<dyn ArtifactStore>,
    options: RunOptions,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn CloudProvider>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            provider,
            store,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Reconcile `handlers` against the provider.
    ///
    /// Returns `Err` only for problems that stop the whole run (validation,
    /// artifact bucket). Per-handler failures land in [`RunReport::failed`].
    pub async fn run(&self, ctx: &RunContext, handlers: &[HandlerConfig]) -> Result<RunReport> {
        let start = Instant::now();
        validate(ctx.run(), handlers)?;

        let mut report = RunReport::new();
        tracing::info!(
            provider = self.provider.name(),
            handlers = handlers.len(),
            "Starting reconciliation"
        );

        let bucket = self.ensure_bucket(ctx).await?;
        report.shared.push(bucket);

        let run = with_shared_names(ctx.run(), handlers);

        for (index, handler) in handlers.iter().enumerate() {
            if ctx.is_cancelled() {
                tracing::warn!(
                    handler = %handler.name,
                    "Run cancelled, skipping remaining handlers"
                );
                report.cancelled = true;
                report
                    .skipped
                    .extend(handlers[index..].iter().map(|h| h.name.clone()));
                break;
            }

            match self.reconcile_bound(ctx, &run, handler).await {
                Ok(resources) => {
                    tracing::info!(
                        handler = %handler.name,
                        resources = resources.len(),
                        "Handler reconciled"
                    );
                    report.reconciled.push(HandlerOutcome {
                        handler: handler.name.clone(),
                        resources,
                    });
                }
                Err(e) => {
                    tracing::warn!(handler = %handler.name, error = %e, "Handler failed");
                    report.add_failure(&handler.name, &e);
                    if !self.options.keep_going {
                        report
                            .skipped
                            .extend(handlers[index + 1..].iter().map(|h| h.name.clone()));
                        break;
                    }
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            reconciled = report.reconciled.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            duration_ms = report.duration_ms,
            "Reconciliation finished"
        );
        Ok(report)
    }

    async fn ensure_bucket(&self, ctx: &RunContext) -> Result<Resource> {
        let bucket = &ctx.run().bucket_name;
        let config = ResourceConfig::new(
            bucket.as_str(),
            ResourceSpec::Bucket {
                name: bucket.clone(),
            },
        )
        .with_tags(ctx.resource_tags());
        self.provider.create_or_get(&config).await
    }

    /// Reconcile one handler, returning every resource it touched.
    ///
    /// Shared resources are named as if `handler` were the whole run.
    pub async fn reconcile_handler(
        &self,
        ctx: &RunContext,
        handler: &HandlerConfig,
    ) -> Result<Vec<Resource>> {
        let run = with_shared_names(ctx.run(), std::slice::from_ref(handler));
        self.reconcile_bound(ctx, &run, handler).await
    }

    /// `run` carries the shared names resolved for the whole handler list
    async fn reconcile_bound(
        &self,
        ctx: &RunContext,
        run: &RunConfig,
        handler: &HandlerConfig,
    ) -> Result<Vec<Resource>> {
        let tags = ctx.resource_tags();
        let mut resources = Vec::new();

        let artifact = self
            .store
            .head(&run.bucket_name, &handler.artifact_key)
            .await?
            .ok_or_else(|| CloudError::ArtifactMissing {
                bucket: run.bucket_name.clone(),
                key: handler.artifact_key.clone(),
            })?;

        let function = self
            .provider
            .create_or_get(&function_config(run, handler, artifact).with_tags(tags.clone()))
            .await?;
        let function_arn = function.arn.clone().ok_or_else(|| {
            CloudError::InvalidResource(format!("function {} has no ARN", function.id))
        })?;
        let function_name = function.id.clone();
        resources.push(function);

        let outcome = bind(run, handler, ctx.gateway(), ctx.topic());

        if let Some(name) = &outcome.new_gateway {
            resources.extend(self.ensure_gateway(ctx, name).await?);
        }
        if let Some(name) = &outcome.new_topic {
            resources.extend(self.ensure_topic(ctx, name).await?);
        }

        for binding in &outcome.bindings {
            match binding {
                Binding::Route(route) => {
                    let gateway = ctx.gateway().ok_or_else(|| {
                        CloudError::InvalidResource(format!(
                            "gateway {} is not available",
                            route.gateway
                        ))
                    })?;

                    let integration = self
                        .provider
                        .create_or_get(
                            &ResourceConfig::new(
                                handler.name.as_str(),
                                ResourceSpec::Integration {
                                    gateway_id: gateway.id.clone(),
                                    function_arn: function_arn.clone(),
                                },
                            )
                            .with_tags(tags.clone()),
                        )
                        .await?;

                    let route = self
                        .provider
                        .create_or_get(
                            &ResourceConfig::new(
                                handler.name.as_str(),
                                ResourceSpec::Route {
                                    gateway_id: gateway.id.clone(),
                                    route_key: route.route_key(),
                                    integration_id: integration.id.clone(),
                                },
                            )
                            .with_tags(tags.clone()),
                        )
                        .await?;

                    resources.push(integration);
                    resources.push(route);
                }
                Binding::Subscription(subscription) => {
                    let topic = ctx.topic().ok_or_else(|| {
                        CloudError::InvalidResource(format!(
                            "topic {} is not available",
                            subscription.topic
                        ))
                    })?;

                    let resource = self
                        .provider
                        .create_or_get(
                            &ResourceConfig::new(
                                handler.name.as_str(),
                                ResourceSpec::Subscription {
                                    topic_arn: topic.arn.clone(),
                                    function_arn: function_arn.clone(),
                                },
                            )
                            .with_tags(tags.clone()),
                        )
                        .await?;
                    resources.push(resource);
                }
            }
        }

        for permission in &outcome.permissions {
            let source_arn = permission
                .source
                .resolve(ctx.gateway(), ctx.topic())
                .ok_or_else(|| {
                    CloudError::InvalidResource(format!(
                        "no source ARN for permission {}",
                        permission.logical_name()
                    ))
                })?;

            let resource = self
                .provider
                .create_or_get(
                    &ResourceConfig::new(
                        permission.logical_name(),
                        ResourceSpec::Permission {
                            function_name: function_name.clone(),
                            statement_id: permission.statement_id(),
                            principal: permission.principal.clone(),
                            source_arn,
                        },
                    )
                    .with_tags(tags.clone()),
                )
                .await?;
            resources.push(resource);
        }

        Ok(resources)
    }

    /// Create or reuse the shared gateway and its stage, publishing it once
    async fn ensure_gateway(&self, ctx: &RunContext, name: &str) -> Result<Vec<Resource>> {
        let mut created = Vec::new();
        let created_ref = &mut created;
        let tags = ctx.resource_tags();

        ctx.gateway_cell()
            .get_or_try_init(|| async move {
                let gateway = self
                    .provider
                    .create_or_get(
                        &ResourceConfig::new(
                            name,
                            ResourceSpec::Gateway {
                                name: name.to_string(),
                            },
                        )
                        .with_tags(tags.clone()),
                    )
                    .await?;
                let handle = GatewayHandle::from_resource(&gateway)?;

                let stage = self
                    .provider
                    .create_or_get(
                        &ResourceConfig::new(
                            name,
                            ResourceSpec::Stage {
                                gateway_id: handle.id.clone(),
                                name: DEFAULT_STAGE.to_string(),
                            },
                        )
                        .with_tags(tags),
                    )
                    .await?;

                tracing::info!(
                    gateway = %handle.logical_name,
                    id = %handle.id,
                    endpoint = handle.endpoint.as_deref().unwrap_or("-"),
                    "Shared gateway ready"
                );
                created_ref.push(gateway);
                created_ref.push(stage);
                Ok::<_, CloudError>(handle)
            })
            .await?;

        Ok(created)
    }

    /// Create or reuse the shared topic, publishing it once
    async fn ensure_topic(&self, ctx: &RunContext, name: &str) -> Result<Vec<Resource>> {
        let mut created = Vec::new();
        let created_ref = &mut created;
        let tags = ctx.resource_tags();

        ctx.topic_cell()
            .get_or_try_init(|| async move {
                let topic = self
                    .provider
                    .create_or_get(
                        &ResourceConfig::new(
                            name,
                            ResourceSpec::Topic {
                                name: name.to_string(),
                            },
                        )
                        .with_tags(tags),
                    )
                    .await?;
                let handle = TopicHandle::from_resource(&topic)?;

                tracing::info!(
                    topic = %handle.logical_name,
                    arn = %handle.arn,
                    "Shared topic ready"
                );
                created_ref.push(topic);
                Ok::<_, CloudError>(handle)
            })
            .await?;

        Ok(created)
    }

    /// Compute the resources a run would touch without creating anything
    pub async fn plan(&self, run: &RunConfig, handlers: &[HandlerConfig]) -> Result<Plan> {
        validate(run, handlers)?;
        let run = &with_shared_names(run, handlers);

        let mut plan = Plan::default();
        self.plan_action(
            &mut plan,
            ResourceKey::new(ResourceKind::Bucket, run.bucket_name.as_str()),
            None,
            format!("artifact bucket {}", run.bucket_name),
        )
        .await?;

        let mut gateway: Option<GatewayHandle> = None;
        let mut topic: Option<TopicHandle> = None;

        for handler in handlers {
            let owner = Some(handler.name.as_str());

            if self
                .store
                .head(&run.bucket_name, &handler.artifact_key)
                .await?
                .is_none()
            {
                plan.warnings.push(format!(
                    "{}: artifact {} is missing",
                    handler.name,
                    ObjectRef::new(run.bucket_name.as_str(), handler.artifact_key.as_str())
                ));
            }

            self.plan_action(
                &mut plan,
                ResourceKey::new(ResourceKind::Function, handler.name.as_str()),
                owner,
                format!("function {} ({})", handler.name, handler.runtime),
            )
            .await?;

            let outcome = bind(run, handler, gateway.as_ref(), topic.as_ref());

            if let Some(name) = &outcome.new_gateway {
                self.plan_action(
                    &mut plan,
                    ResourceKey::new(ResourceKind::Gateway, name.as_str()),
                    owner,
                    format!("shared HTTP gateway {}", name),
                )
                .await?;
                self.plan_action(
                    &mut plan,
                    ResourceKey::new(ResourceKind::Stage, name.as_str()),
                    owner,
                    format!("stage {} of {}", DEFAULT_STAGE, name),
                )
                .await?;
                gateway = Some(GatewayHandle::pending(name.as_str()));
            }
            if let Some(name) = &outcome.new_topic {
                self.plan_action(
                    &mut plan,
                    ResourceKey::new(ResourceKind::Topic, name.as_str()),
                    owner,
                    format!("shared topic {}", name),
                )
                .await?;
                topic = Some(TopicHandle::pending(name.as_str()));
            }

            for binding in &outcome.bindings {
                match binding {
                    Binding::Route(route) => {
                        self.plan_action(
                            &mut plan,
                            ResourceKey::new(ResourceKind::Integration, handler.name.as_str()),
                            owner,
                            format!("integration {} -> {}", route.gateway, route.function),
                        )
                        .await?;
                        self.plan_action(
                            &mut plan,
                            ResourceKey::new(ResourceKind::Route, handler.name.as_str()),
                            owner,
                            format!("route {} on {}", route.route_key(), route.gateway),
                        )
                        .await?;
                    }
                    Binding::Subscription(subscription) => {
                        self.plan_action(
                            &mut plan,
                            ResourceKey::new(ResourceKind::Subscription, handler.name.as_str()),
                            owner,
                            format!(
                                "subscription {} -> {}",
                                subscription.topic, subscription.function
                            ),
                        )
                        .await?;
                    }
                }
            }

            for permission in &outcome.permissions {
                self.plan_action(
                    &mut plan,
                    ResourceKey::new(ResourceKind::Permission, permission.logical_name()),
                    owner,
                    format!(
                        "allow {} to invoke {}",
                        permission.principal, permission.function
                    ),
                )
                .await?;
            }
        }

        Ok(plan)
    }

    async fn plan_action(
        &self,
        plan: &mut Plan,
        key: ResourceKey,
        handler: Option<&str>,
        description: String,
    ) -> Result<()> {
        let action_type = match self.provider.lookup(&key).await? {
            Some(_) => ActionType::NoOp,
            None => ActionType::Create,
        };
        plan.actions.push(Action {
            action_type,
            key,
            handler: handler.map(|h| h.to_string()),
            description,
        });
        Ok(())
    }
}

fn function_config(
    run: &RunConfig,
    handler: &HandlerConfig,
    artifact: ObjectRef,
) -> ResourceConfig {
    ResourceConfig::new(
        handler.name.as_str(),
        ResourceSpec::Function {
            name: handler.name.clone(),
            artifact,
            entry_point: handler.entry_point.clone(),
            runtime: handler.runtime.clone(),
            role: run.execution_role.clone(),
            environment: handler.environment.clone(),
        },
    )
}
