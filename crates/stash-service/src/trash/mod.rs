//! Trash lifecycle: soft delete, restore, and permanent purge.

pub mod service;

pub use service::{PurgeReport, TrashService};
