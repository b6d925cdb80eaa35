//! Direct per-node sharing.

pub mod service;

pub use service::{ShareOutcome, ShareService};
