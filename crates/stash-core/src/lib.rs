//! # stash-core
//!
//! Core crate for Stash. Contains the storage and notification traits,
//! configuration schemas, typed identifiers, storage tiers, domain events,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other Stash crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
