//! Star toggling and listing.

use std::sync::Arc;

use tracing::info;

use stash_core::result::AppResult;
use stash_core::types::NodeId;
use stash_database::repositories::StarRepository;
use stash_entity::node::Node;

use crate::context::RequestContext;

/// Manages the actor's favorites.
#[derive(Debug, Clone)]
pub struct StarService {
    /// Star repository.
    star_repo: Arc<StarRepository>,
}

impl StarService {
    /// Creates a new star service.
    pub fn new(star_repo: Arc<StarRepository>) -> Self {
        Self { star_repo }
    }

    /// Flips the star on a node the actor owns or was shared. Returns
    /// whether the node is now starred.
    pub async fn toggle(&self, ctx: &RequestContext, id: NodeId) -> AppResult<bool> {
        let starred = self.star_repo.toggle(ctx.user_id, id).await?;
        info!(user_id = %ctx.user_id, node_id = %id, starred, "Star toggled");
        Ok(starred)
    }

    /// Lists the actor's live starred nodes.
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<Node>> {
        self.star_repo.starred_nodes(ctx.user_id).await
    }
}
