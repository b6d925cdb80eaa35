//! User entities.

pub mod model;

pub use model::{NewUser, User, normalize_email};
