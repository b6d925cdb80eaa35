//! Download resolution: single-file fast path, empty-folder detection, and
//! zip export of folders and multi-selections.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use stash_core::config::ExportConfig;
use stash_core::error::{AppError, ErrorKind};
use stash_core::result::AppResult;
use stash_core::types::NodeId;
use stash_database::repositories::{NodeRepository, ShareRepository};
use stash_entity::node::Node;
use stash_storage::TierManager;

use super::archive::{self, EntryPlan};
use super::outcome::{DownloadOutcome, DownloadRequest, ExportContext};
use crate::context::RequestContext;

/// Resolves download requests into staged public URLs.
#[derive(Debug, Clone)]
pub struct ExportService {
    /// Node repository.
    node_repo: Arc<NodeRepository>,
    /// Share repository, for access checks and the shared view.
    share_repo: Arc<ShareRepository>,
    /// Storage tiers.
    tiers: Arc<TierManager>,
    /// Export settings.
    config: ExportConfig,
}

impl ExportService {
    /// Creates a new export service.
    pub fn new(
        node_repo: Arc<NodeRepository>,
        share_repo: Arc<ShareRepository>,
        tiers: Arc<TierManager>,
        config: ExportConfig,
    ) -> Self {
        Self {
            node_repo,
            share_repo,
            tiers,
            config,
        }
    }

    /// Resolves a download request.
    ///
    /// A single file is staged as-is; a single folder becomes a zip of its
    /// contents named after it; several nodes become a zip named after the
    /// originating view. `cancel` aborts an in-progress archive.
    pub async fn resolve_download(
        &self,
        ctx: &RequestContext,
        req: &DownloadRequest,
        cancel: CancellationToken,
    ) -> AppResult<DownloadOutcome> {
        let nodes = if req.all {
            let nodes = self.visible_in(ctx, req.context).await?;
            if nodes.is_empty() {
                return Ok(match req.context {
                    ExportContext::Folder(id) => {
                        let folder = self.accessible(ctx, id).await?;
                        DownloadOutcome::EmptyFolder {
                            folder_id: folder.id,
                            name: folder.name,
                        }
                    }
                    ExportContext::Shared => DownloadOutcome::nothing_selected(),
                });
            }
            nodes
        } else {
            let mut seen = HashSet::new();
            let ids: Vec<NodeId> = req.ids.iter().copied().filter(|id| seen.insert(*id)).collect();
            if ids.is_empty() {
                return Ok(DownloadOutcome::nothing_selected());
            }
            let mut nodes = Vec::with_capacity(ids.len());
            for id in ids {
                nodes.push(self.accessible_live(ctx, id).await?);
            }
            nodes
        };

        if let [node] = nodes.as_slice() {
            if !node.is_folder() {
                return self.stage_file(ctx, node).await;
            }
            let children = self.node_repo.children(node.owner_id, node.id).await?;
            if children.is_empty() {
                return Ok(DownloadOutcome::EmptyFolder {
                    folder_id: node.id,
                    name: node.name.clone(),
                });
            }

            let mut plan = EntryPlan::default();
            let descendants = self.node_repo.descendants(node.owner_id, node.id).await?;
            plan.add_tree(node, "", descendants);
            let filename = format!("{}.zip", node.name);
            return self.export_archive(ctx, plan, filename, cancel).await;
        }

        let mut plan = EntryPlan::default();
        for node in nodes {
            if node.is_folder() {
                let descendants = self.node_repo.descendants(node.owner_id, node.id).await?;
                let root_path = node.name.clone();
                plan.add_tree(&node, &root_path, descendants);
            } else {
                let path = node.name.clone();
                plan.add_file(&path, node);
            }
        }
        let label = match req.context {
            ExportContext::Folder(id) => self.accessible(ctx, id).await?.name,
            ExportContext::Shared => self.config.shared_archive_name.clone(),
        };
        self.export_archive(ctx, plan, format!("{label}.zip"), cancel)
            .await
    }

    /// Everything "all" selects in a view.
    async fn visible_in(&self, ctx: &RequestContext, context: ExportContext) -> AppResult<Vec<Node>> {
        match context {
            ExportContext::Folder(id) => {
                let folder = self.accessible_live(ctx, id).await?;
                if !folder.is_folder() {
                    return Err(AppError::invalid_state(format!(
                        "'{}' is not a folder",
                        folder.name
                    )));
                }
                self.node_repo.children(folder.owner_id, folder.id).await
            }
            ExportContext::Shared => self.share_repo.shared_with(ctx.user_id).await,
        }
    }

    /// A node the actor owns or holds a direct grant on.
    async fn accessible(&self, ctx: &RequestContext, id: NodeId) -> AppResult<Node> {
        let not_found = || AppError::not_found(format!("Node {id} not found"));
        let node = self.node_repo.find_by_id(id).await?.ok_or_else(not_found)?;
        if node.owner_id == ctx.user_id || self.share_repo.exists(id, ctx.user_id).await? {
            Ok(node)
        } else {
            Err(not_found())
        }
    }

    async fn accessible_live(&self, ctx: &RequestContext, id: NodeId) -> AppResult<Node> {
        let node = self.accessible(ctx, id).await?;
        if !node.is_live() {
            return Err(AppError::invalid_state(format!(
                "'{}' is in the trash",
                node.name
            )));
        }
        Ok(node)
    }

    /// Copy one file to `downloads/<id>/<base name>` on the public tier.
    async fn stage_file(&self, ctx: &RequestContext, node: &Node) -> AppResult<DownloadOutcome> {
        let payload = node
            .payload()
            .ok_or_else(|| AppError::internal(format!("'{}' is not a file", node.name)))?;

        let tier = payload.tier();
        let data = self
            .tiers
            .get(tier)
            .read_bytes(&payload.storage_path)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Cannot read '{}' for download", node.name),
                    e,
                )
            })?;
        let size = data.len() as u64;
        let key = format!("downloads/{}/{}", node.id, payload.base_name());
        self.tiers.public().write(&key, data).await?;

        info!(
            user_id = %ctx.user_id,
            node_id = %node.id,
            tier = %tier,
            key = %key,
            "File staged for download"
        );
        Ok(DownloadOutcome::File {
            url: self.tiers.public_url(&key),
            filename: node.name.clone(),
            size,
        })
    }

    async fn export_archive(
        &self,
        ctx: &RequestContext,
        plan: EntryPlan,
        filename: String,
        cancel: CancellationToken,
    ) -> AppResult<DownloadOutcome> {
        let entries = plan.into_entries();
        let (file, written) =
            archive::write_archive(&self.tiers, &entries, &self.config, &cancel).await?;
        let key = archive::upload_archive(&self.tiers, file, &cancel).await?;

        info!(
            user_id = %ctx.user_id,
            key = %key,
            entries = written,
            filename = %filename,
            "Archive exported"
        );
        Ok(DownloadOutcome::Archive {
            url: self.tiers.public_url(&key),
            filename,
            entries: written,
        })
    }
}
