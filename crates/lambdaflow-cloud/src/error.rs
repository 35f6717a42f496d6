//! Cloud provider error types

use lambdaflow_core::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource already exists: {0}")]
    ResourceAlreadyExists(String),

    #[error("Provider returned an incomplete resource: {0}")]
    InvalidResource(String),

    #[error("Artifact s3://{bucket}/{key} does not exist; run `lambdaflow deploy` first")]
    ArtifactMissing { bucket: String, key: String },

    #[error("Local bundle not found: {0}")]
    BundleNotFound(PathBuf),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
