//! Archive export configuration.

use serde::{Deserialize, Serialize};

/// Compression applied to archive entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveCompression {
    /// Deflate every entry.
    Deflated,
    /// Store entries uncompressed.
    Stored,
}

/// Archive export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Archive base name used when exporting from the shared-with-me view.
    #[serde(default = "default_shared_archive_name")]
    pub shared_archive_name: String,
    /// Entry compression.
    #[serde(default = "default_compression")]
    pub compression: ArchiveCompression,
    /// Number of file payloads buffered between the reader and the
    /// archive writer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            shared_archive_name: default_shared_archive_name(),
            compression: default_compression(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_shared_archive_name() -> String {
    "shared".to_string()
}

fn default_compression() -> ArchiveCompression {
    ArchiveCompression::Deflated
}

fn default_channel_capacity() -> usize {
    4
}
