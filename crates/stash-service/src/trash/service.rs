//! Cascading trash, restore, and purge over subtrees.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use stash_core::config::TrashConfig;
use stash_core::error::{AppError, ErrorKind};
use stash_core::result::AppResult;
use stash_core::types::NodeId;
use stash_database::repositories::NodeRepository;
use stash_entity::node::Node;
use stash_storage::TierManager;

use crate::context::RequestContext;

/// Outcome of emptying the trash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Rows removed.
    pub purged: usize,
    /// Trashed folders left in place because they still hold live rows.
    pub skipped: usize,
    /// Rows removed whose payload could not be deleted from storage.
    pub storage_failures: usize,
}

/// Manages the trash.
#[derive(Debug, Clone)]
pub struct TrashService {
    /// Node repository.
    node_repo: Arc<NodeRepository>,
    /// Storage tiers, for payload deletion.
    tiers: Arc<TierManager>,
    /// Trash settings.
    config: TrashConfig,
}

impl TrashService {
    /// Creates a new trash service.
    pub fn new(node_repo: Arc<NodeRepository>, tiers: Arc<TierManager>, config: TrashConfig) -> Self {
        Self {
            node_repo,
            tiers,
            config,
        }
    }

    /// Moves a node and its live descendants to the trash with one shared
    /// timestamp. Returns the affected IDs.
    pub async fn trash(&self, ctx: &RequestContext, id: NodeId) -> AppResult<Vec<NodeId>> {
        let affected = self.node_repo.trash(ctx.user_id, id, Utc::now()).await?;
        info!(user_id = %ctx.user_id, node_id = %id, count = affected.len(), "Node trashed");
        Ok(affected)
    }

    /// Trashes each live child of `parent_id`. Returns how many children
    /// were trashed.
    pub async fn trash_all(&self, ctx: &RequestContext, parent_id: NodeId) -> AppResult<usize> {
        let children = self.node_repo.children(ctx.user_id, parent_id).await?;
        let mut trashed = 0;
        for child in &children {
            self.node_repo.trash(ctx.user_id, child.id, Utc::now()).await?;
            trashed += 1;
        }
        info!(user_id = %ctx.user_id, parent_id = %parent_id, count = trashed, "Folder contents trashed");
        Ok(trashed)
    }

    /// Restores a trashed node. Descendants follow only when
    /// `trash.restore_cascades` is enabled.
    pub async fn restore(&self, ctx: &RequestContext, id: NodeId) -> AppResult<Vec<NodeId>> {
        let restored = self
            .node_repo
            .restore(ctx.user_id, id, self.config.restore_cascades)
            .await?;
        info!(user_id = %ctx.user_id, node_id = %id, count = restored.len(), "Node restored");
        Ok(restored)
    }

    /// Restores everything in the actor's trash.
    pub async fn restore_all(&self, ctx: &RequestContext) -> AppResult<usize> {
        let restored = self.node_repo.restore_all(ctx.user_id).await?;
        info!(user_id = %ctx.user_id, count = restored, "Trash restored");
        Ok(restored)
    }

    /// Lists the actor's trash.
    pub async fn list_trash(&self, ctx: &RequestContext) -> AppResult<Vec<Node>> {
        self.node_repo.trashed(ctx.user_id).await
    }

    /// Permanently removes a trashed node, its grants, and its stars, then
    /// deletes its payload.
    ///
    /// The metadata removal stands even when the payload delete fails; the
    /// failure is logged with the orphaned key and returned.
    pub async fn purge(&self, ctx: &RequestContext, id: NodeId) -> AppResult<Node> {
        let node = self.node_repo.purge(ctx.user_id, id).await?;
        info!(user_id = %ctx.user_id, node_id = %id, name = %node.name, "Node purged");

        self.delete_payload(&node).await?;
        Ok(node)
    }

    /// Purges the whole trash, deepest rows first.
    ///
    /// Each row is handled on its own: folders still holding restored rows
    /// are skipped and payload failures are counted, neither stops the sweep.
    pub async fn purge_all(&self, ctx: &RequestContext) -> AppResult<PurgeReport> {
        let mut trashed = self.node_repo.trashed(ctx.user_id).await?;
        // Purging a leaf shifts bounds uniformly, so the relative order
        // taken here stays valid for the whole sweep.
        trashed.sort_by(|a, b| b.interval.lft.cmp(&a.interval.lft));

        let mut report = PurgeReport::default();
        for node in trashed {
            match self.node_repo.purge(ctx.user_id, node.id).await {
                Ok(removed) => {
                    report.purged += 1;
                    if self.delete_payload(&removed).await.is_err() {
                        report.storage_failures += 1;
                    }
                }
                Err(e) if e.is(ErrorKind::InvalidState) => {
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            user_id = %ctx.user_id,
            purged = report.purged,
            skipped = report.skipped,
            storage_failures = report.storage_failures,
            "Trash emptied"
        );
        Ok(report)
    }

    async fn delete_payload(&self, node: &Node) -> AppResult<()> {
        let Some(payload) = node.payload() else {
            return Ok(());
        };

        let tier = payload.tier();
        self.tiers
            .get(tier)
            .delete(&payload.storage_path)
            .await
            .map_err(|e| {
                warn!(
                    node_id = %node.id,
                    tier = %tier,
                    key = %payload.storage_path,
                    error = %e,
                    "Payload left orphaned after purge"
                );
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete payload of '{}'", node.name),
                    e,
                )
            })
    }
}
