//! Favorite markers.

pub mod model;

pub use model::StarredFile;
