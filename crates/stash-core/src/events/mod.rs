//! Domain events emitted by Stash operations and consumed by external
//! collaborators.

pub mod share;

pub use share::{ShareNotice, SharedFileRef};
