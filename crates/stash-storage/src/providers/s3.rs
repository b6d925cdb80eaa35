//! S3-compatible object storage provider (requires the `s3` feature).

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use bytes::{Bytes, BytesMut};
use futures::stream::StreamExt;
use tracing::{debug, info};

use stash_core::config::storage::S3StorageConfig;
use stash_core::error::{AppError, ErrorKind};
use stash_core::result::AppResult;
use stash_core::traits::storage::{ByteStream, StorageProvider};

use super::validate_key;

/// S3-compatible storage provider.
#[derive(Debug, Clone)]
pub struct S3StorageProvider {
    client: Client,
    bucket: String,
}

impl S3StorageProvider {
    /// Build a client from configuration. An empty endpoint means AWS; any
    /// other endpoint is addressed path-style (MinIO and friends).
    pub async fn new(config: &S3StorageConfig) -> AppResult<Self> {
        if config.bucket.is_empty() {
            return Err(AppError::configuration("storage.cloud.s3.bucket is required"));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if !config.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "stash-config",
            ));
        }
        let shared = loader.load().await;

        let mut builder = Builder::from(&shared);
        if !config.endpoint.is_empty() {
            builder = builder
                .endpoint_url(config.endpoint.clone())
                .force_path_style(true);
        }

        info!(
            endpoint = %config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            "Initializing S3 storage provider"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        })
    }

    async fn put(&self, key: &str, data: Bytes) -> AppResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(S3ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                AppError::new(
                    ErrorKind::Storage,
                    format!("Failed to write object {key}: {}", DisplayErrorContext(&e)),
                )
            })?;
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for S3StorageProvider {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok())
    }

    async fn read_bytes(&self, key: &str) -> AppResult<Bytes> {
        let key = validate_key(key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    AppError::not_found(format!("Object not found: {key}"))
                } else {
                    AppError::new(
                        ErrorKind::Storage,
                        format!("Failed to read object {key}: {}", DisplayErrorContext(&e)),
                    )
                }
            })?;

        let data = output.body.collect().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to read body of {key}"), e)
        })?;
        Ok(data.into_bytes())
    }

    async fn write(&self, key: &str, data: Bytes) -> AppResult<()> {
        let key = validate_key(key)?;
        let len = data.len();
        self.put(key, data).await?;
        debug!(key, bytes = len, "Wrote object to S3");
        Ok(())
    }

    async fn write_stream(&self, key: &str, mut stream: ByteStream) -> AppResult<u64> {
        let key = validate_key(key)?;

        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AppError::with_source(ErrorKind::Storage, "Stream read error", e))?;
            buffer.extend_from_slice(&chunk);
        }

        let total = buffer.len() as u64;
        self.put(key, buffer.freeze()).await?;
        debug!(key, bytes = total, "Wrote object to S3 from stream");
        Ok(total)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let key = validate_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::new(
                    ErrorKind::Storage,
                    format!("Failed to delete object {key}: {}", DisplayErrorContext(&e)),
                )
            })?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let key = validate_key(key)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(AppError::new(
                ErrorKind::Storage,
                format!("Failed to stat object {key}: {}", DisplayErrorContext(&e)),
            )),
        }
    }
}
