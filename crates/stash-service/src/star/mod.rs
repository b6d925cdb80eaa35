//! Favorites.

pub mod service;

pub use service::StarService;
