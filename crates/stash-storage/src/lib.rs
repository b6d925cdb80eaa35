//! # stash-storage
//!
//! Storage provider implementations for Stash and the tier manager that
//! routes each payload to the local, cloud, or public tier.

pub mod manager;
pub mod providers;

pub use manager::TierManager;
