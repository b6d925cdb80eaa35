//! Node creation, listing, path resolution, and search.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use stash_core::error::AppError;
use stash_core::result::AppResult;
use stash_core::types::{NodeId, Tier};
use stash_database::repositories::{NodeRepository, StarRepository};
use stash_entity::node::{FilePayload, NewNode, Node};
use stash_storage::TierManager;

use crate::context::RequestContext;
use crate::validate;

/// Manages the acting user's tree.
#[derive(Debug, Clone)]
pub struct NodeService {
    /// Node repository.
    node_repo: Arc<NodeRepository>,
    /// Star repository (favorites filter).
    star_repo: Arc<StarRepository>,
    /// Storage tiers.
    tiers: Arc<TierManager>,
}

impl NodeService {
    /// Creates a new node service.
    pub fn new(
        node_repo: Arc<NodeRepository>,
        star_repo: Arc<StarRepository>,
        tiers: Arc<TierManager>,
    ) -> Self {
        Self {
            node_repo,
            star_repo,
            tiers,
        }
    }

    /// Returns the actor's root folder.
    pub async fn get_root(&self, ctx: &RequestContext) -> AppResult<Node> {
        self.node_repo
            .find_root(ctx.user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {} has no root folder", ctx.user_id)))
    }

    /// Gets one of the actor's nodes, in any state.
    pub async fn get(&self, ctx: &RequestContext, id: NodeId) -> AppResult<Node> {
        self.node_repo.get_owned(ctx.user_id, id).await
    }

    /// Resolves a `/`-separated path below the actor's root.
    pub async fn resolve_by_path(&self, ctx: &RequestContext, path: &str) -> AppResult<Node> {
        self.node_repo.resolve_path(ctx.user_id, path).await
    }

    /// Creates a folder under `parent_id`.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        parent_id: NodeId,
        name: &str,
    ) -> AppResult<Node> {
        let name = validate::node_name(name)?;
        let folder = self
            .node_repo
            .append_child(ctx.user_id, parent_id, NewNode::folder(name))
            .await?;

        info!(user_id = %ctx.user_id, node_id = %folder.id, name, "Folder created");
        Ok(folder)
    }

    /// Stores `data` on the local tier and appends a file node for it.
    ///
    /// The payload is written first; if the row cannot be appended the
    /// payload is removed again.
    pub async fn create_file(
        &self,
        ctx: &RequestContext,
        parent_id: NodeId,
        name: &str,
        data: Bytes,
        mime: Option<String>,
    ) -> AppResult<Node> {
        let name = validate::node_name(name)?;
        // Fail fast on a bad parent before touching storage.
        let parent = self.node_repo.get_owned(ctx.user_id, parent_id).await?;
        if !parent.is_folder() {
            return Err(AppError::invalid_state(format!(
                "Cannot add '{name}' under '{}': it is a file",
                parent.name
            )));
        }

        let id = NodeId::new();
        let storage_path = format!("files/{}/{id}/{name}", ctx.user_id);
        let size = data.len() as u64;
        let local = self.tiers.get(Tier::Local);
        local.write(&storage_path, data).await?;

        let new = NewNode::file(name, FilePayload::local(storage_path.clone(), mime, size)).with_id(id);
        match self.node_repo.append_child(ctx.user_id, parent_id, new).await {
            Ok(file) => {
                info!(user_id = %ctx.user_id, node_id = %file.id, name, size, "File created");
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = local.delete(&storage_path).await {
                    warn!(key = %storage_path, error = %cleanup, "Failed to remove orphaned payload");
                }
                Err(e)
            }
        }
    }

    /// Lists live children of one of the actor's folders.
    pub async fn list_children(&self, ctx: &RequestContext, parent_id: NodeId) -> AppResult<Vec<Node>> {
        self.node_repo.children(ctx.user_id, parent_id).await
    }

    /// Returns the folders from the root down to the node's parent.
    pub async fn ancestors(&self, ctx: &RequestContext, id: NodeId) -> AppResult<Vec<Node>> {
        self.node_repo.ancestors(ctx.user_id, id).await
    }

    /// Searches the actor's whole tree by name, optionally restricted to
    /// starred nodes.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        term: &str,
        favorites_only: bool,
    ) -> AppResult<Vec<Node>> {
        let mut found = self.node_repo.search(ctx.user_id, term).await?;
        if favorites_only {
            let starred = self.star_repo.starred_ids(ctx.user_id).await?;
            found.retain(|n| starred.contains(&n.id));
        }
        Ok(found)
    }

    /// Marks a file as migrated to the cloud tier. Called by the external
    /// upload job once it has copied the payload.
    pub async fn complete_cloud_upload(
        &self,
        id: NodeId,
        new_storage_path: Option<String>,
    ) -> AppResult<Node> {
        let file = self.node_repo.mark_uploaded_on_cloud(id, new_storage_path).await?;
        info!(
            node_id = %file.id,
            key = file.payload().map(|p| p.storage_path.as_str()).unwrap_or_default(),
            "Cloud upload completed"
        );
        Ok(file)
    }
}
