//! Starred file entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stash_core::types::{NodeId, UserId};

/// Marks `file_id` as a favorite of `user_id`. Presence is the whole state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarredFile {
    /// The starred node.
    pub file_id: NodeId,
    /// The user who starred it.
    pub user_id: UserId,
    /// When it was starred.
    pub created_at: DateTime<Utc>,
}
