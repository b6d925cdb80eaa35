//! Request and result types for downloads.

use serde::{Deserialize, Serialize};

use stash_core::types::NodeId;

/// Message returned when a download names nothing.
pub const NOTHING_SELECTED: &str = "Please select files to download";

/// Where a download request originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ExportContext {
    /// Browsing one of the actor's folders.
    Folder(NodeId),
    /// Browsing the shared-with-me list.
    Shared,
}

/// What to download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Explicitly selected nodes.
    pub ids: Vec<NodeId>,
    /// Select everything visible in `context` instead of `ids`.
    pub all: bool,
    /// The originating view; names multi-node archives.
    pub context: ExportContext,
}

/// Result of resolving a download that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// Nothing was selected.
    NothingSelected {
        /// User-facing message.
        message: String,
    },
    /// The single selected folder has no live children.
    EmptyFolder {
        /// The folder.
        folder_id: NodeId,
        /// Its name.
        name: String,
    },
    /// A single file staged on the public tier.
    File {
        /// Public URL of the staged copy.
        url: String,
        /// Suggested filename.
        filename: String,
        /// Size in bytes.
        size: u64,
    },
    /// A zip archive staged on the public tier.
    Archive {
        /// Public URL of the archive.
        url: String,
        /// Suggested filename.
        filename: String,
        /// Number of file entries written.
        entries: usize,
    },
}

impl DownloadOutcome {
    pub(crate) fn nothing_selected() -> Self {
        Self::NothingSelected {
            message: NOTHING_SELECTED.to_string(),
        }
    }
}
