//! Sharing grant entities.

pub mod model;

pub use model::FileShare;
