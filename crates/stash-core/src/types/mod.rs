//! Core type definitions used across the Stash workspace.

pub mod id;
pub mod tier;

pub use id::*;
pub use tier::Tier;
