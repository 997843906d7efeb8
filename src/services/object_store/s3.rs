//! S3 (or S3-compatible) object store.

use super::{ObjectStore, StoreError, StoreResult, StoredObject};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client as S3Client,
    config::Builder as S3ConfigBuilder,
    error::{DisplayErrorContext, SdkError},
    primitives::ByteStream,
};
use std::{error::Error as StdError, fmt::Debug};
use tokio::fs::File;
use tracing::info;

#[derive(Clone)]
pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    /// Build a client from the ambient AWS credentials chain.
    ///
    /// `endpoint_url` targets MinIO/LocalStack style deployments and switches
    /// to path-style addressing.
    pub async fn new(region: String, endpoint_url: Option<String>) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .load()
            .await;

        let mut builder = S3ConfigBuilder::from(&aws_config);
        if let Some(ref endpoint_url) = endpoint_url {
            builder = builder.endpoint_url(endpoint_url).force_path_style(true);
        }
        let client = S3Client::from_conf(builder.build());

        info!(region = %region, endpoint = ?endpoint_url, "S3 object store initialized");
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: File,
        content_length: u64,
    ) -> StoreResult<StoredObject> {
        let stream = ByteStream::read_from()
            .file(body)
            .build()
            .await
            .map_err(|e| StoreError::Unavailable(format!("could not read upload body: {}", e)))?;

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(content_length as i64)
            .body(stream)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(StoredObject {
            key: key.to_string(),
            size_bytes: content_length,
            etag: output.e_tag().map(|tag| tag.trim_matches('"').to_string()),
        })
    }
}

/// Service responses are rejections; everything else never reached S3 intact.
fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: StdError + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let detail = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::ServiceError(_) => StoreError::Rejected(detail),
        _ => StoreError::Unavailable(detail),
    }
}
