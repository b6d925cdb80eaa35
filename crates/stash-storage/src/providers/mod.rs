//! Storage provider implementations.

pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

pub use local::LocalStorageProvider;
pub use memory::MemoryStorageProvider;
#[cfg(feature = "s3")]
pub use s3::S3StorageProvider;

use stash_core::error::AppError;
use stash_core::result::AppResult;

/// Reject keys that could escape a provider's root.
pub(crate) fn validate_key(key: &str) -> AppResult<&str> {
    let clean = key.trim_start_matches('/');
    if clean.is_empty() {
        return Err(AppError::validation("Storage key must not be empty"));
    }
    if clean.split('/').any(|segment| segment == "..") {
        return Err(AppError::validation(format!(
            "Storage key must not contain '..': {key}"
        )));
    }
    Ok(clean)
}
