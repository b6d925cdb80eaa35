//! Share-related domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{NodeId, UserId};

/// A file named in a share notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedFileRef {
    /// The shared node.
    pub id: NodeId,
    /// Its display name at share time.
    pub name: String,
}

/// Payload handed to the notification collaborator after a share call.
///
/// `files` lists every requested file, whether the grant was new or
/// already existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareNotice {
    /// The user receiving access.
    pub grantee_id: UserId,
    /// The grantee's email address.
    pub grantee_email: String,
    /// The user granting access.
    pub grantor_id: UserId,
    /// The grantor's display name.
    pub grantor_name: String,
    /// Files covered by this call.
    pub files: Vec<SharedFileRef>,
    /// How many grants were newly inserted.
    pub newly_granted: usize,
    /// When the call completed.
    pub timestamp: DateTime<Utc>,
}
