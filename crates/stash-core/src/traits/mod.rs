//! Core traits defined in `stash-core` and implemented by other crates.

pub mod notifier;
pub mod storage;

pub use notifier::ShareNotifier;
pub use storage::{ByteStream, StorageProvider};
