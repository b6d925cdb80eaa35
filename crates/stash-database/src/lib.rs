//! # stash-database
//!
//! SQLite metadata storage for Stash: the connection pool, embedded
//! migrations, and the concrete repositories for nodes, grants, stars, and
//! users.

pub mod connection;
pub mod repositories;
mod rows;

pub use connection::Database;
