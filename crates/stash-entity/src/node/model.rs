//! Node entity model.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stash_core::types::{NodeId, Tier, UserId};

use super::interval::Interval;

/// Payload-bearing attributes of a file node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    /// Tier-relative key of the stored bytes.
    pub storage_path: String,
    /// MIME type, if known.
    pub mime: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Set once by the external upload job after migration to the cloud tier.
    pub uploaded_on_cloud: bool,
}

impl FilePayload {
    /// Create a payload that still lives on the local tier.
    pub fn local(storage_path: impl Into<String>, mime: Option<String>, size: u64) -> Self {
        Self {
            storage_path: storage_path.into(),
            mime,
            size,
            uploaded_on_cloud: false,
        }
    }

    /// The tier currently holding the bytes.
    pub fn tier(&self) -> Tier {
        Tier::for_payload(self.uploaded_on_cloud)
    }

    /// Last segment of the storage key.
    pub fn base_name(&self) -> &str {
        self.storage_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.storage_path)
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// A folder; may have children.
    Folder,
    /// A file; never has children.
    File(FilePayload),
}

/// Lifecycle state of a node that still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Visible in listings.
    Live,
    /// Soft-deleted; restorable or purgeable.
    Trashed,
}

/// A file or folder in a user's tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: NodeId,
    /// The creator and owner.
    pub owner_id: UserId,
    /// Parent folder (None only for the owner's root).
    pub parent_id: Option<NodeId>,
    /// Display name; siblings may share it.
    pub name: String,
    /// Whether this is the owner's root folder.
    pub is_root: bool,
    /// Position in the owner's nested-interval numbering.
    pub interval: Interval,
    /// Folder or file payload.
    pub kind: NodeKind,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was trashed (None = live).
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Whether this node is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder)
    }

    /// The file payload, if this node is a file.
    pub fn payload(&self) -> Option<&FilePayload> {
        match &self.kind {
            NodeKind::File(payload) => Some(payload),
            NodeKind::Folder => None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> NodeState {
        if self.deleted_at.is_some() {
            NodeState::Trashed
        } else {
            NodeState::Live
        }
    }

    /// Whether the node is live.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Whether `other` is a descendant of this node.
    pub fn is_ancestor_of(&self, other: &Node) -> bool {
        self.owner_id == other.owner_id && self.interval.contains(&other.interval)
    }

    /// Listing order: folders first, newest first, ties broken by id
    /// descending.
    pub fn listing_order(a: &Node, b: &Node) -> Ordering {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }
}

/// Data required to append a new node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNode {
    /// Pre-assigned identifier (lets callers derive storage keys first).
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Folder or file payload.
    pub kind: NodeKind,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewNode {
    /// A new folder named `name`.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            kind: NodeKind::Folder,
            created_at: Utc::now(),
        }
    }

    /// A new file named `name`.
    pub fn file(name: impl Into<String>, payload: FilePayload) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            kind: NodeKind::File(payload),
            created_at: Utc::now(),
        }
    }

    /// Use a specific identifier.
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// Use a specific creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn node(kind: NodeKind, created_at: DateTime<Utc>) -> Node {
        Node {
            id: NodeId::new(),
            owner_id: UserId::new(),
            parent_id: None,
            name: "n".into(),
            is_root: false,
            interval: Interval::ROOT,
            kind,
            created_at,
            deleted_at: None,
        }
    }

    #[test]
    fn test_base_name() {
        let payload = FilePayload::local("files/u/n/report.pdf", None, 3);
        assert_eq!(payload.base_name(), "report.pdf");
        assert_eq!(payload.tier(), Tier::Local);
        assert_eq!(FilePayload::local("flat.txt", None, 0).base_name(), "flat.txt");
    }

    #[test]
    fn test_listing_order_folders_then_newest() {
        let now = Utc::now();
        let old_file = node(NodeKind::File(FilePayload::local("a", None, 1)), now - Duration::hours(2));
        let new_file = node(NodeKind::File(FilePayload::local("b", None, 1)), now);
        let old_folder = node(NodeKind::Folder, now - Duration::hours(5));

        let mut nodes = vec![old_file.clone(), new_file.clone(), old_folder.clone()];
        nodes.sort_by(Node::listing_order);

        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![old_folder.id, new_file.id, old_file.id]);
    }

    #[test]
    fn test_listing_order_ties_on_id() {
        let now = Utc::now();
        let first = node(NodeKind::Folder, now);
        let second = node(NodeKind::Folder, now);
        let (low, high) = if first.id < second.id {
            (first, second)
        } else {
            (second, first)
        };

        let mut nodes = vec![low.clone(), high.clone()];
        nodes.sort_by(Node::listing_order);
        assert_eq!(nodes[0].id, high.id);
    }

    #[test]
    fn test_kind_serializes_with_tag() {
        let kind = NodeKind::File(FilePayload::local("k", Some("text/plain".into()), 4));
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["storage_path"], "k");
        let back: NodeKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, kind);
    }
}
