//! モデル定義
//!
//! lambdaflowで使用されるデータモデルを定義します。

mod handler;
mod stack;

// 再エクスポート
pub use handler::*;
pub use stack::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_creation() {
        let stack = Stack {
            run: RunConfig::new("hello", "artifacts", "eu-west-1"),
            handlers: vec![
                HandlerConfig::new("apiHandler").with_trigger(TriggerKind::HttpApi),
                HandlerConfig::new("snsHandler").with_trigger(TriggerKind::PubSub),
            ],
        };

        assert_eq!(stack.run.project, "hello");
        assert_eq!(stack.handlers.len(), 2);
        assert!(stack.handler("apiHandler").is_some());
        assert!(stack.handler("missing").is_none());
    }

    #[test]
    fn test_merge_replaces_handler_in_place() {
        let mut base = Stack {
            run: RunConfig::new("hello", "artifacts", "eu-west-1").with_tag("team", "core"),
            handlers: vec![
                HandlerConfig::new("a").with_trigger(TriggerKind::HttpApi),
                HandlerConfig::new("b").with_trigger(TriggerKind::PubSub),
            ],
        };

        let overlay = Stack {
            run: RunConfig::new("", "", "us-east-1").with_tag("owner", "me"),
            handlers: vec![
                HandlerConfig::new("a").with_trigger(TriggerKind::PubSub),
                HandlerConfig::new("c").with_trigger(TriggerKind::HttpApi),
            ],
        };

        base.merge(overlay);

        assert_eq!(base.run.project, "hello");
        assert_eq!(base.run.bucket_name, "artifacts");
        assert_eq!(base.run.region, "us-east-1");
        assert_eq!(base.run.tags.len(), 2);

        let names: Vec<_> = base.handlers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(base.handlers[0].has_trigger(TriggerKind::PubSub));
        assert!(!base.handlers[0].has_trigger(TriggerKind::HttpApi));
    }
}
