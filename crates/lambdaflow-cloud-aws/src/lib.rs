//! lambdaflow AWS provider
//!
//! Implements [`lambdaflow_cloud::CloudProvider`] on top of Lambda, API
//! Gateway v2, SNS and S3, and [`lambdaflow_cloud::ArtifactStore`] on S3.
//!
//! # Usage
//!
//! ```ignore
//! use lambdaflow_cloud::StateManager;
//! use lambdaflow_cloud_aws::{AwsClients, AwsProvider};
//!
//! let clients = AwsClients::load(Some("eu-west-1".to_string())).await;
//! let provider = AwsProvider::connect(clients, StateManager::new(".")).await?;
//! ```

pub mod clients;
pub mod error;
pub mod provider;
pub mod store;

pub use clients::AwsClients;
pub use error::{AwsError, Result};
pub use provider::{AwsProvider, execution_arn, integration_target};
pub use store::S3ArtifactStore;
