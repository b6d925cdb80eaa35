//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stash_core::types::UserId;

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Email address, stored normalized (see [`normalize_email`]).
    pub email: String,
    /// Display name; also names the user's root folder.
    pub name: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
}

/// Trim and lowercase an email address for lookup and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
