//! In-process storage provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use futures::stream::StreamExt;
use tracing::debug;

use stash_core::error::{AppError, ErrorKind};
use stash_core::result::AppResult;
use stash_core::traits::storage::{ByteStream, StorageProvider};

use super::validate_key;

/// Storage provider that keeps objects in memory.
///
/// Clones share the same objects. Used for the cloud tier in development
/// setups and in tests; `set_failing` makes every operation return a
/// storage error so failure paths can be exercised.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageProvider {
    objects: Arc<DashMap<String, Bytes>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStorageProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    fn check(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::storage("Memory storage is unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(!self.failing.load(Ordering::SeqCst))
    }

    async fn read_bytes(&self, key: &str) -> AppResult<Bytes> {
        self.check()?;
        let key = validate_key(key)?;
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))
    }

    async fn write(&self, key: &str, data: Bytes) -> AppResult<()> {
        self.check()?;
        let key = validate_key(key)?;
        debug!(key, bytes = data.len(), "Stored object in memory");
        self.objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn write_stream(&self, key: &str, mut stream: ByteStream) -> AppResult<u64> {
        self.check()?;
        let key = validate_key(key)?;

        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AppError::with_source(ErrorKind::Storage, "Stream read error", e))?;
            buffer.extend_from_slice(&chunk);
        }

        let total = buffer.len() as u64;
        self.objects.insert(key.to_string(), buffer.freeze());
        Ok(total)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.check()?;
        self.objects.remove(validate_key(key)?);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.check()?;
        Ok(self.objects.contains_key(validate_key(key)?))
    }
}
