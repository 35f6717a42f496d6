//! Trigger binder
//!
//! Expands one handler into the bindings and invoke permissions its triggers
//! require, and decides whether the run's shared gateway and topic must be
//! created or can be reused. Pure: no provider calls happen here.

use crate::context::{GatewayHandle, TopicHandle};
use lambdaflow_core::{HandlerConfig, RunConfig, TriggerKind};

/// Result of binding one handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindOutcome {
    /// Logical name of a gateway that must be created for this run
    pub new_gateway: Option<String>,

    /// Logical name of a topic that must be created for this run
    pub new_topic: Option<String>,

    pub bindings: Vec<Binding>,

    /// Exactly one per binding
    pub permissions: Vec<InvokePermission>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Route(RouteBinding),
    Subscription(SubscriptionBinding),
}

/// HTTP route on the shared gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBinding {
    /// Logical name of the gateway (non-owning)
    pub gateway: String,
    pub path: String,
    pub method: String,
    /// Logical name of the target function
    pub function: String,
}

impl RouteBinding {
    pub fn route_key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Subscription of a function to the shared topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionBinding {
    pub topic: String,
    pub function: String,
}

/// What the permission's source ARN is constrained to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConstraint {
    /// Any stage and method of the gateway (`<execution arn>/*/*`)
    GatewayExecution { gateway: String },
    /// The topic ARN
    Topic { topic: String },
}

impl SourceConstraint {
    /// Resolve to a concrete source ARN once the shared resources exist
    pub fn resolve(
        &self,
        gateway: Option<&GatewayHandle>,
        topic: Option<&TopicHandle>,
    ) -> Option<String> {
        match self {
            SourceConstraint::GatewayExecution { gateway: name } => gateway
                .filter(|g| &g.logical_name == name)
                .map(|g| g.invoke_source_arn()),
            SourceConstraint::Topic { topic: name } => topic
                .filter(|t| &t.logical_name == name)
                .map(|t| t.arn.clone()),
        }
    }
}

/// Grants a triggering service the right to invoke a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokePermission {
    pub trigger: TriggerKind,
    pub principal: String,
    pub function: String,
    pub source: SourceConstraint,
}

impl InvokePermission {
    /// One permission per (function, triggering service)
    pub fn logical_name(&self) -> String {
        format!("{}:{}", self.function, self.trigger.service())
    }

    pub fn statement_id(&self) -> String {
        format!("lambdaflow-{}-invoke", self.trigger.service())
    }
}

/// Logical name of the shared gateway when `handler` is the first to need it
pub fn gateway_name(run: &RunConfig, handler: &HandlerConfig) -> String {
    run.gateway_name
        .clone()
        .unwrap_or_else(|| format!("{}-api", handler.name))
}

/// Logical name of the shared topic when `handler` is the first to need it
pub fn topic_name(run: &RunConfig, handler: &HandlerConfig) -> String {
    run.topic_name
        .clone()
        .unwrap_or_else(|| format!("{}-sns", handler.name))
}

/// Fix the shared gateway and topic names for a whole run.
///
/// The first handler in input order that asks for each trigger names the
/// shared resource, whether or not that handler itself reconciles. A run
/// that skips a failing handler therefore creates the same gateway and
/// topic as the rerun that later succeeds.
pub fn with_shared_names(run: &RunConfig, handlers: &[HandlerConfig]) -> RunConfig {
    let mut resolved = run.clone();
    if resolved.gateway_name.is_none()
        && let Some(first) = handlers.iter().find(|h| h.has_trigger(TriggerKind::HttpApi))
    {
        resolved.gateway_name = Some(gateway_name(run, first));
    }
    if resolved.topic_name.is_none()
        && let Some(first) = handlers.iter().find(|h| h.has_trigger(TriggerKind::PubSub))
    {
        resolved.topic_name = Some(topic_name(run, first));
    }
    resolved
}

/// Expand `handler` into bindings against the run's shared resources.
///
/// The first handler asking for [`TriggerKind::HttpApi`] gets a
/// `new_gateway` signal; later handlers attach routes to `shared_gateway`.
/// The topic follows the same rule.
pub fn bind(
    run: &RunConfig,
    handler: &HandlerConfig,
    shared_gateway: Option<&GatewayHandle>,
    shared_topic: Option<&TopicHandle>,
) -> BindOutcome {
    let mut outcome = BindOutcome::default();

    if handler.has_trigger(TriggerKind::HttpApi) {
        let gateway = match shared_gateway {
            Some(existing) => existing.logical_name.clone(),
            None => {
                let name = gateway_name(run, handler);
                outcome.new_gateway = Some(name.clone());
                name
            }
        };

        let route = handler.http_route();
        outcome.bindings.push(Binding::Route(RouteBinding {
            gateway: gateway.clone(),
            path: route.path,
            method: route.method,
            function: handler.name.clone(),
        }));
        outcome.permissions.push(InvokePermission {
            trigger: TriggerKind::HttpApi,
            principal: TriggerKind::HttpApi.principal().to_string(),
            function: handler.name.clone(),
            source: SourceConstraint::GatewayExecution { gateway },
        });
    }

    if handler.has_trigger(TriggerKind::PubSub) {
        let topic = match shared_topic {
            Some(existing) => existing.logical_name.clone(),
            None => {
                let name = topic_name(run, handler);
                outcome.new_topic = Some(name.clone());
                name
            }
        };

        outcome
            .bindings
            .push(Binding::Subscription(SubscriptionBinding {
                topic: topic.clone(),
                function: handler.name.clone(),
            }));
        outcome.permissions.push(InvokePermission {
            trigger: TriggerKind::PubSub,
            principal: TriggerKind::PubSub.principal().to_string(),
            function: handler.name.clone(),
            source: SourceConstraint::Topic { topic },
        });
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambdaflow_core::HttpRoute;

    fn run() -> RunConfig {
        RunConfig::new("hello", "artifacts", "eu-west-1")
    }

    fn gateway() -> GatewayHandle {
        GatewayHandle {
            logical_name: "first-api".to_string(),
            id: "abc".to_string(),
            endpoint: None,
            execution_arn: "arn:aws:execute-api:eu-west-1:123456789012:abc".to_string(),
        }
    }

    #[test]
    fn test_first_http_handler_creates_gateway() {
        let handler = HandlerConfig::new("first")
            .with_trigger(TriggerKind::HttpApi)
            .with_route(HttpRoute::new("/hello", "GET"));

        let outcome = bind(&run(), &handler, None, None);
        assert_eq!(outcome.new_gateway.as_deref(), Some("first-api"));
        assert!(outcome.new_topic.is_none());
        assert_eq!(
            outcome.bindings,
            vec![Binding::Route(RouteBinding {
                gateway: "first-api".to_string(),
                path: "/hello".to_string(),
                method: "GET".to_string(),
                function: "first".to_string(),
            })]
        );
        assert_eq!(outcome.permissions.len(), 1);
        assert_eq!(outcome.permissions[0].principal, "apigateway.amazonaws.com");
    }

    #[test]
    fn test_later_http_handler_reuses_gateway() {
        let handler = HandlerConfig::new("second").with_trigger(TriggerKind::HttpApi);
        let shared = gateway();

        let outcome = bind(&run(), &handler, Some(&shared), None);
        assert!(outcome.new_gateway.is_none());
        match &outcome.bindings[0] {
            Binding::Route(route) => {
                assert_eq!(route.gateway, "first-api");
                assert_eq!(route.route_key(), "ANY /second");
            }
            other => panic!("expected route, got {:?}", other),
        }
    }

    #[test]
    fn test_pubsub_handler_binds_topic() {
        let handler = HandlerConfig::new("worker").with_trigger(TriggerKind::PubSub);

        let outcome = bind(&run(), &handler, None, None);
        assert!(outcome.new_gateway.is_none());
        assert_eq!(outcome.new_topic.as_deref(), Some("worker-sns"));
        assert_eq!(
            outcome.bindings,
            vec![Binding::Subscription(SubscriptionBinding {
                topic: "worker-sns".to_string(),
                function: "worker".to_string(),
            })]
        );
        assert_eq!(outcome.permissions[0].principal, "sns.amazonaws.com");

        let shared = TopicHandle {
            logical_name: "worker-sns".to_string(),
            arn: "arn:aws:sns:eu-west-1:123456789012:worker-sns".to_string(),
        };
        let second = HandlerConfig::new("other").with_trigger(TriggerKind::PubSub);
        let outcome = bind(&run(), &second, None, Some(&shared));
        assert!(outcome.new_topic.is_none());
    }

    #[test]
    fn test_every_binding_has_one_permission() {
        let handler = HandlerConfig::new("both")
            .with_trigger(TriggerKind::HttpApi)
            .with_trigger(TriggerKind::PubSub);

        let outcome = bind(&run(), &handler, None, None);
        assert_eq!(outcome.bindings.len(), 2);
        assert_eq!(outcome.permissions.len(), 2);

        let names: Vec<_> = outcome.permissions.iter().map(|p| p.logical_name()).collect();
        assert_eq!(names, vec!["both:apigateway", "both:sns"]);
    }

    #[test]
    fn test_configured_shared_names() {
        let mut run = run();
        run.gateway_name = Some("shared-api".to_string());
        run.topic_name = Some("events".to_string());

        let handler = HandlerConfig::new("both")
            .with_trigger(TriggerKind::HttpApi)
            .with_trigger(TriggerKind::PubSub);

        let outcome = bind(&run, &handler, None, None);
        assert_eq!(outcome.new_gateway.as_deref(), Some("shared-api"));
        assert_eq!(outcome.new_topic.as_deref(), Some("events"));
    }

    #[test]
    fn test_shared_names_follow_input_order() {
        let handlers = vec![
            HandlerConfig::new("worker").with_trigger(TriggerKind::PubSub),
            HandlerConfig::new("a").with_trigger(TriggerKind::HttpApi),
            HandlerConfig::new("b")
                .with_trigger(TriggerKind::HttpApi)
                .with_trigger(TriggerKind::PubSub),
        ];

        let resolved = with_shared_names(&run(), &handlers);
        assert_eq!(resolved.gateway_name.as_deref(), Some("a-api"));
        assert_eq!(resolved.topic_name.as_deref(), Some("worker-sns"));

        // binding a later handler first does not rename anything
        let outcome = bind(&resolved, &handlers[2], None, None);
        assert_eq!(outcome.new_gateway.as_deref(), Some("a-api"));
        assert_eq!(outcome.new_topic.as_deref(), Some("worker-sns"));
    }

    #[test]
    fn test_shared_names_keep_configured_values() {
        let mut run = run();
        run.gateway_name = Some("shared-api".to_string());
        let handlers = vec![HandlerConfig::new("a").with_trigger(TriggerKind::HttpApi)];

        let resolved = with_shared_names(&run, &handlers);
        assert_eq!(resolved.gateway_name.as_deref(), Some("shared-api"));
        assert!(resolved.topic_name.is_none());
    }

    #[test]
    fn test_source_constraint_wildcard() {
        let shared = gateway();
        let constraint = SourceConstraint::GatewayExecution {
            gateway: "first-api".to_string(),
        };
        assert_eq!(
            constraint.resolve(Some(&shared), None).as_deref(),
            Some("arn:aws:execute-api:eu-west-1:123456789012:abc/*/*")
        );

        let other = SourceConstraint::GatewayExecution {
            gateway: "someone-else".to_string(),
        };
        assert!(other.resolve(Some(&shared), None).is_none());
    }
}
