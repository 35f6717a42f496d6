//! Plan and run report types

use crate::provider::{Resource, ResourceKey, ResourceKind};
use serde::{Deserialize, Serialize};

/// Represents a planned action for a cloud resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Type of action to perform
    pub action_type: ActionType,

    pub key: ResourceKey,

    /// Handler the resource belongs to (`None` for run-wide resources)
    pub handler: Option<String>,

    /// Description of the action
    pub description: String,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Resource already exists and is reused
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Plan containing all actions a run would perform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Problems that would make a run fail (e.g. missing artifacts)
    pub warnings: Vec<String>,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            actions,
            warnings: Vec::new(),
        }
    }

    /// Whether applying the plan would create anything
    pub fn has_changes(&self) -> bool {
        self.actions
            .iter()
            .any(|a| a.action_type != ActionType::NoOp)
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} unchanged",
            self.create, self.no_change
        )
    }
}

/// Resources reconciled for one handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerOutcome {
    pub handler: String,
    pub resources: Vec<Resource>,
}

/// A handler whose reconciliation failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerFailure {
    pub handler: String,
    pub error: String,
}

/// Result of a reconciliation run
///
/// Failures do not roll back earlier successes, so a report can carry both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Run-wide resources (the artifact bucket)
    pub shared: Vec<Resource>,

    /// Successfully reconciled handlers, in input order
    pub reconciled: Vec<HandlerOutcome>,

    /// Failed handlers
    pub failed: Vec<HandlerFailure>,

    /// Handlers not attempted because of an earlier failure or cancellation
    pub skipped: Vec<String>,

    pub cancelled: bool,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && !self.cancelled
    }

    pub fn add_failure(&mut self, handler: impl Into<String>, error: impl ToString) {
        self.failed.push(HandlerFailure {
            handler: handler.into(),
            error: error.to_string(),
        });
    }

    /// Every resource touched by the run
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.shared
            .iter()
            .chain(self.reconciled.iter().flat_map(|o| o.resources.iter()))
    }

    /// Number of distinct resources of `kind` touched by the run
    pub fn count(&self, kind: ResourceKind) -> usize {
        let mut keys: Vec<_> = self
            .resources()
            .filter(|r| r.kind == kind)
            .map(|r| r.key())
            .collect();
        keys.sort();
        keys.dedup();
        keys.len()
    }

    /// Resources created (not reused) by this run
    pub fn created(&self) -> impl Iterator<Item = &Resource> {
        self.resources().filter(|r| r.created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(action_type: ActionType, kind: ResourceKind, name: &str) -> Action {
        Action {
            action_type,
            key: ResourceKey::new(kind, name),
            handler: None,
            description: String::new(),
        }
    }

    #[test]
    fn test_plan_summary() {
        let plan = Plan::new(vec![
            action(ActionType::Create, ResourceKind::Function, "a"),
            action(ActionType::Create, ResourceKind::Route, "a"),
            action(ActionType::NoOp, ResourceKind::Bucket, "artifacts"),
        ]);

        assert!(plan.has_changes());
        let summary = plan.summary();
        assert_eq!(summary.create, 2);
        assert_eq!(summary.no_change, 1);
        assert_eq!(summary.to_string(), "2 to create, 1 unchanged");
    }

    #[test]
    fn test_noop_plan_has_no_changes() {
        let plan = Plan::new(vec![action(ActionType::NoOp, ResourceKind::Topic, "t")]);
        assert!(!plan.has_changes());
        assert!(!Plan::default().has_changes());
    }

    #[test]
    fn test_report_counts_distinct_resources() {
        let mut report = RunReport::new();
        report.reconciled.push(HandlerOutcome {
            handler: "a".to_string(),
            resources: vec![
                Resource::new(ResourceKind::Function, "a", "a"),
                Resource::new(ResourceKind::Gateway, "a-api", "gw"),
            ],
        });
        report.reconciled.push(HandlerOutcome {
            handler: "b".to_string(),
            resources: vec![Resource::new(ResourceKind::Function, "b", "b")],
        });

        assert_eq!(report.count(ResourceKind::Function), 2);
        assert_eq!(report.count(ResourceKind::Gateway), 1);
        assert!(report.is_success());

        report.add_failure("c", "boom");
        assert!(!report.is_success());
        assert_eq!(report.failed[0].error, "boom");
    }
}
