//! Trash lifecycle configuration.

use serde::{Deserialize, Serialize};

/// Trash lifecycle configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrashConfig {
    /// When `false` (default), restoring a node clears only that node and
    /// leaves descendants trashed by the same cascade in the trash. When
    /// `true`, restore also revives descendants that share the node's
    /// deletion timestamp.
    #[serde(default)]
    pub restore_cascades: bool,
}
