//! スタックの事前検証
//!
//! プロバイダーを呼び出す前に実行し、不正な入力でリモートの状態が
//! 中途半端に変更されないようにする。

use crate::error::ValidationError;
use crate::model::{HandlerConfig, RunConfig, Stack, TriggerKind};
use std::collections::{HashMap, HashSet};

/// 実行設定とハンドラーを検証
pub fn validate(run: &RunConfig, handlers: &[HandlerConfig]) -> Result<(), ValidationError> {
    if run.bucket_name.trim().is_empty() {
        return Err(ValidationError::MissingField("bucket"));
    }
    if run.region.trim().is_empty() {
        return Err(ValidationError::MissingField("region"));
    }
    validate_handlers(handlers)
}

/// ハンドラー定義を検証
///
/// 空または重複した名前、空のトリガー、同じHTTPルートキーを持つ
/// 複数のハンドラーをエラーにする。
pub fn validate_handlers(handlers: &[HandlerConfig]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    let mut routes: HashMap<String, &str> = HashMap::new();
    for handler in handlers {
        if handler.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !seen.insert(handler.name.as_str()) {
            return Err(ValidationError::DuplicateName(handler.name.clone()));
        }
        if handler.triggers.is_empty() {
            return Err(ValidationError::EmptyTriggerSet(handler.name.clone()));
        }
        if handler.has_trigger(TriggerKind::HttpApi) {
            let route = handler.http_route().route_key();
            if let Some(first) = routes.get(&route) {
                return Err(ValidationError::DuplicateRoute {
                    route,
                    first: first.to_string(),
                    second: handler.name.clone(),
                });
            }
            routes.insert(route, handler.name.as_str());
        }
    }
    Ok(())
}

pub fn validate_stack(stack: &Stack) -> Result<(), ValidationError> {
    validate(&stack.run, &stack.handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HttpRoute;

    fn run() -> RunConfig {
        RunConfig::new("hello", "artifacts", "eu-west-1")
    }

    #[test]
    fn test_valid_stack() {
        let handlers = vec![
            HandlerConfig::new("a").with_trigger(TriggerKind::HttpApi),
            HandlerConfig::new("b").with_trigger(TriggerKind::PubSub),
        ];
        assert!(validate(&run(), &handlers).is_ok());
    }

    #[test]
    fn test_duplicate_name() {
        let handlers = vec![
            HandlerConfig::new("a").with_trigger(TriggerKind::HttpApi),
            HandlerConfig::new("a").with_trigger(TriggerKind::PubSub),
        ];
        assert_eq!(
            validate(&run(), &handlers),
            Err(ValidationError::DuplicateName("a".to_string()))
        );
    }

    #[test]
    fn test_empty_triggers() {
        let handlers = vec![HandlerConfig::new("lonely")];
        assert_eq!(
            validate(&run(), &handlers),
            Err(ValidationError::EmptyTriggerSet("lonely".to_string()))
        );
    }

    #[test]
    fn test_missing_bucket_and_region() {
        let handlers = vec![HandlerConfig::new("a").with_trigger(TriggerKind::HttpApi)];

        let no_bucket = RunConfig::new("hello", "", "eu-west-1");
        assert_eq!(
            validate(&no_bucket, &handlers),
            Err(ValidationError::MissingField("bucket"))
        );

        let no_region = RunConfig::new("hello", "artifacts", " ");
        assert_eq!(
            validate(&no_region, &handlers),
            Err(ValidationError::MissingField("region"))
        );
    }

    #[test]
    fn test_empty_name() {
        let handlers = vec![HandlerConfig::new("").with_trigger(TriggerKind::HttpApi)];
        assert_eq!(validate(&run(), &handlers), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_duplicate_route() {
        let handlers = vec![
            HandlerConfig::new("a")
                .with_trigger(TriggerKind::HttpApi)
                .with_route(HttpRoute::new("/hello", "get")),
            HandlerConfig::new("b")
                .with_trigger(TriggerKind::HttpApi)
                .with_route(HttpRoute::new("hello", "GET")),
        ];
        assert_eq!(
            validate(&run(), &handlers),
            Err(ValidationError::DuplicateRoute {
                route: "GET /hello".to_string(),
                first: "a".to_string(),
                second: "b".to_string(),
            })
        );
    }

    #[test]
    fn test_same_path_with_other_method_is_valid() {
        let handlers = vec![
            HandlerConfig::new("read")
                .with_trigger(TriggerKind::HttpApi)
                .with_route(HttpRoute::new("/items", "GET")),
            HandlerConfig::new("write")
                .with_trigger(TriggerKind::HttpApi)
                .with_route(HttpRoute::new("/items", "POST")),
            // pub/sub だけのハンドラーはルートを持たない
            HandlerConfig::new("items")
                .with_trigger(TriggerKind::PubSub)
                .with_route(HttpRoute::new("/items", "GET")),
        ];
        assert!(validate(&run(), &handlers).is_ok());
    }

    #[test]
    fn test_empty_handler_list_is_valid() {
        assert!(validate(&run(), &[]).is_ok());
    }
}
