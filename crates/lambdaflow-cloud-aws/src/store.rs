//! S3-backed artifact store

use crate::error::AwsError;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use lambdaflow_cloud::{ArtifactStore, ObjectRef};

pub struct S3ArtifactStore {
    client: aws_sdk_s3::Client,
}

impl S3ArtifactStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> lambdaflow_cloud::Result<ObjectRef> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                lambdaflow_cloud::CloudError::UploadFailed(
                    AwsError::api("PutObject", e).to_string(),
                )
            })?;
        Ok(ObjectRef::new(bucket, key))
    }

    async fn head(&self, bucket: &str, key: &str) -> lambdaflow_cloud::Result<Option<ObjectRef>> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(Some(ObjectRef::new(bucket, key))),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                tracing::debug!(bucket, key, "Object not found");
                Ok(None)
            }
            Err(e) => Err(AwsError::api("HeadObject", e).into()),
        }
    }
}
