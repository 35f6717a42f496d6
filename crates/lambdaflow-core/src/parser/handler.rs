//! handler ノードのパース

use super::{first_string, parse_string_map, property_string};
use crate::error::{FlowError, Result};
use crate::model::{DEFAULT_METHOD, HandlerConfig, HttpRoute, TriggerKind};
use kdl::KdlNode;

/// handler ノードをパース
///
/// ```kdl
/// handler "apiHandler" {
///     artifact "apiHandler.zip"
///     entry-point "apiHandler.handler"
///     runtime "nodejs18.x"
///     trigger "http-api"
///     route "/hello" method="GET"
///     environment { LOG_LEVEL "debug" }
/// }
/// ```
pub fn parse_handler(node: &KdlNode) -> Result<HandlerConfig> {
    let name = first_string(node)
        .ok_or_else(|| FlowError::InvalidConfig("handler には名前が必要です".to_string()))?;

    let mut handler = HandlerConfig::new(name);

    let Some(children) = node.children() else {
        return Ok(handler);
    };

    for child in children.nodes() {
        match child.name().value() {
            "artifact" | "artifact-key" | "artifact_key" => {
                if let Some(key) = first_string(child) {
                    handler.artifact_key = key;
                }
            }
            "entry-point" | "entry_point" | "handler" => {
                if let Some(entry) = first_string(child) {
                    handler.entry_point = entry;
                }
            }
            "runtime" => {
                if let Some(runtime) = first_string(child) {
                    handler.runtime = runtime;
                }
            }
            // trigger "http-api" "sns" のように複数指定も可
            "trigger" | "triggers" => {
                for entry in child.entries().iter().filter(|e| e.name().is_none()) {
                    let value = entry.value().as_string().ok_or_else(|| {
                        FlowError::InvalidConfig(format!(
                            "handler '{}': trigger は文字列で指定してください",
                            handler.name
                        ))
                    })?;
                    handler.triggers.insert(value.parse::<TriggerKind>()?);
                }
            }
            "route" => {
                let path = first_string(child).ok_or_else(|| {
                    FlowError::InvalidConfig(format!(
                        "handler '{}': route にはパスが必要です",
                        handler.name
                    ))
                })?;
                let method =
                    property_string(child, "method").unwrap_or_else(|| DEFAULT_METHOD.to_string());
                handler.route = Some(HttpRoute::new(path, method));
            }
            "environment" | "env" => {
                handler.environment.extend(parse_string_map(child));
            }
            other => {
                return Err(FlowError::InvalidConfig(format!(
                    "handler '{}': 不明な設定項目 {}",
                    handler.name, other
                )));
            }
        }
    }

    Ok(handler)
}
