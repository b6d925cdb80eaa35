//! # stash-entity
//!
//! Domain entity models for Stash. Every struct in this crate represents a
//! metadata table row or a domain value object. All entities derive
//! `Debug`, `Clone`, `Serialize` and `Deserialize`.

pub mod node;
pub mod share;
pub mod star;
pub mod user;
