//! File share (grant) entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stash_core::types::{NodeId, UserId};

/// A grant letting `user_id` read `file_id`.
///
/// At most one row exists per `(file_id, user_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileShare {
    /// The shared node.
    pub file_id: NodeId,
    /// The grantee.
    pub user_id: UserId,
    /// The grantor.
    pub shared_by: UserId,
    /// When the grant was first created.
    pub created_at: DateTime<Utc>,
}

impl FileShare {
    /// The unique key of this grant.
    pub fn key(&self) -> (NodeId, UserId) {
        (self.file_id, self.user_id)
    }
}
