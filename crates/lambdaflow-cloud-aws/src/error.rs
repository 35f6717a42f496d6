//! AWS provider error types

use lambdaflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("AWS API call {operation} failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    #[error("AWS response for {0} is missing a required field")]
    IncompleteResponse(&'static str),

    #[error("Function {0} needs an execution role; set `execution-role` in stack.kdl")]
    MissingExecutionRole(String),

    #[error("Could not determine the AWS account id")]
    MissingAccountId,

    #[error("Invalid tag {key}: {message}")]
    InvalidTag { key: String, message: String },

    #[error(
        "{key} was created as {id} but could not be written to the state file ({message}); \
         record or delete it before the next run"
    )]
    Unrecorded {
        key: String,
        id: String,
        message: String,
    },

    #[error("Cloud error: {0}")]
    Cloud(#[from] CloudError),
}

impl AwsError {
    /// Wrap an SDK error, keeping its full source chain in the message
    pub fn api<E>(operation: &'static str, err: E) -> Self
    where
        E: std::error::Error,
    {
        Self::Api {
            operation,
            message: aws_sdk_lambda::error::DisplayErrorContext(err).to_string(),
        }
    }
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::Cloud(inner) => inner,
            e @ AwsError::MissingExecutionRole(_) => CloudError::InvalidConfig(e.to_string()),
            e @ AwsError::MissingAccountId => CloudError::AuthenticationFailed(e.to_string()),
            e @ AwsError::Unrecorded { .. } => CloudError::StateError(e.to_string()),
            other => CloudError::ApiError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
