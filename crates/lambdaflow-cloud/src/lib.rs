//! lambdaflow cloud
//!
//! Provider abstraction and the idempotent reconciler that turns a stack of
//! handlers into functions, a shared HTTP gateway, a shared topic and the
//! bindings between them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 lambdaflow CLI                   │
//! │             (lambdaflow up / plan)               │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               lambdaflow-cloud                   │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │    Binder    │─▶│  Reconciler  │             │
//! │  └──────────────┘  └──────┬───────┘             │
//! │  ┌──────────────────────────▼───────────────┐   │
//! │  │  trait CloudProvider / ArtifactStore     │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │      aws      │ │    memory     │
//! │   provider    │ │  (simulator)  │
//! └───────────────┘ └───────────────┘
//! ```

pub mod action;
pub mod artifact;
pub mod binder;
pub mod context;
pub mod error;
pub mod memory;
pub mod provider;
pub mod reconciler;
pub mod state;

// Re-exports
pub use action::{
    Action, ActionType, HandlerFailure, HandlerOutcome, Plan, PlanSummary, RunReport,
};
pub use artifact::{ArtifactPublisher, ArtifactStore, ObjectRef, bundle_key};
pub use binder::{
    BindOutcome, Binding, InvokePermission, RouteBinding, SourceConstraint, SubscriptionBinding,
    bind, with_shared_names,
};
pub use context::{GatewayHandle, MANAGED_BY_TAG, PROJECT_TAG, RunContext, TopicHandle};
pub use error::{CloudError, Result};
pub use memory::{MemoryProvider, ProviderCall};
pub use provider::{
    AuthStatus, CloudProvider, Resource, ResourceConfig, ResourceKey, ResourceKind, ResourceSpec,
};
pub use reconciler::{DEFAULT_STAGE, Reconciler, RunOptions};
pub use state::{GlobalState, ResourceState, StateLock, StateManager, state_key};
