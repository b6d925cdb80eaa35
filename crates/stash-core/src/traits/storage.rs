//! Storage provider trait for pluggable byte-storage backends.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// A byte stream type used for streaming file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for byte-storage backends addressed by tier-relative keys.
///
/// Implementations live in `stash-storage`. Reads of a missing key fail
/// with `ErrorKind::NotFound`; `delete` of a missing key succeeds.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "memory", "s3").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Read an object into memory.
    async fn read_bytes(&self, key: &str) -> AppResult<Bytes>;

    /// Write bytes to an object, replacing any previous content.
    async fn write(&self, key: &str, data: Bytes) -> AppResult<()>;

    /// Write a byte stream to an object. Returns the number of bytes written.
    async fn write_stream(&self, key: &str, stream: ByteStream) -> AppResult<u64>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}
