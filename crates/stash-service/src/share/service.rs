//! Grant creation, revocation, and shared listings.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use stash_core::error::AppError;
use stash_core::events::{ShareNotice, SharedFileRef};
use stash_core::result::AppResult;
use stash_core::traits::ShareNotifier;
use stash_core::types::{NodeId, UserId};
use stash_database::repositories::{NodeRepository, ShareRepository, UserRepository};
use stash_entity::node::Node;

use crate::context::RequestContext;

/// Message returned when a share call names no files.
pub const NOTHING_SELECTED: &str = "Please select files to share";

/// Result of a share call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ShareOutcome {
    /// No files were named.
    NothingSelected {
        /// User-facing message.
        message: String,
    },
    /// The email did not resolve to a user; nothing was recorded.
    UnknownGrantee {
        /// The email as given.
        email: String,
    },
    /// Grants are in place for every requested file.
    Shared {
        /// The grantee.
        grantee_id: UserId,
        /// Distinct files requested.
        requested: usize,
        /// Grants that did not exist before this call.
        newly_granted: usize,
    },
}

/// Manages grants between users.
#[derive(Debug, Clone)]
pub struct ShareService {
    /// Share repository.
    share_repo: Arc<ShareRepository>,
    /// User repository, for grantee lookup.
    user_repo: Arc<UserRepository>,
    /// Node repository.
    node_repo: Arc<NodeRepository>,
    /// Receives one notice per successful call.
    notifier: Arc<dyn ShareNotifier>,
}

impl ShareService {
    /// Creates a new share service.
    pub fn new(
        share_repo: Arc<ShareRepository>,
        user_repo: Arc<UserRepository>,
        node_repo: Arc<NodeRepository>,
        notifier: Arc<dyn ShareNotifier>,
    ) -> Self {
        Self {
            share_repo,
            user_repo,
            node_repo,
            notifier,
        }
    }

    /// Shares `file_ids` with the user registered under `grantee_email`.
    ///
    /// Calling again with the same arguments leaves the grant set unchanged.
    /// An email that matches no user is a successful no-op.
    pub async fn share(
        &self,
        ctx: &RequestContext,
        file_ids: &[NodeId],
        grantee_email: &str,
    ) -> AppResult<ShareOutcome> {
        let file_ids = dedup(file_ids);
        if file_ids.is_empty() {
            return Ok(ShareOutcome::NothingSelected {
                message: NOTHING_SELECTED.to_string(),
            });
        }

        let Some(grantee) = self.user_repo.find_by_email(grantee_email).await? else {
            info!(
                user_id = %ctx.user_id,
                email = %grantee_email,
                "Share target does not resolve to a user; nothing granted"
            );
            return Ok(ShareOutcome::UnknownGrantee {
                email: grantee_email.to_string(),
            });
        };
        if grantee.id == ctx.user_id {
            return Err(AppError::validation("Files cannot be shared with their owner"));
        }

        let mut files = Vec::with_capacity(file_ids.len());
        for id in &file_ids {
            let node = self.node_repo.get_owned(ctx.user_id, *id).await?;
            files.push(SharedFileRef {
                id: node.id,
                name: node.name,
            });
        }

        let newly_granted = self
            .share_repo
            .grant_many(ctx.user_id, grantee.id, &file_ids)
            .await?;

        info!(
            user_id = %ctx.user_id,
            grantee_id = %grantee.id,
            requested = file_ids.len(),
            newly_granted,
            "Files shared"
        );

        let grantor_name = self
            .user_repo
            .find_by_id(ctx.user_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| ctx.user_id.to_string());
        self.notifier
            .notify_share(ShareNotice {
                grantee_id: grantee.id,
                grantee_email: grantee.email,
                grantor_id: ctx.user_id,
                grantor_name,
                files,
                newly_granted,
                timestamp: Utc::now(),
            })
            .await;

        Ok(ShareOutcome::Shared {
            grantee_id: grantee.id,
            requested: file_ids.len(),
            newly_granted,
        })
    }

    /// Revokes one grant. Returns `false` when there was nothing to revoke,
    /// including when the email matches no user.
    pub async fn unshare(
        &self,
        ctx: &RequestContext,
        file_id: NodeId,
        grantee_email: &str,
    ) -> AppResult<bool> {
        let Some(grantee) = self.user_repo.find_by_email(grantee_email).await? else {
            return Ok(false);
        };

        let revoked = self.share_repo.revoke(ctx.user_id, file_id, grantee.id).await?;
        if revoked {
            info!(user_id = %ctx.user_id, node_id = %file_id, grantee_id = %grantee.id, "Share revoked");
        }
        Ok(revoked)
    }

    /// Live nodes shared with the actor.
    pub async fn shared_with_me(&self, ctx: &RequestContext) -> AppResult<Vec<Node>> {
        self.share_repo.shared_with(ctx.user_id).await
    }

    /// Live nodes the actor has shared with anyone.
    pub async fn shared_by_me(&self, ctx: &RequestContext) -> AppResult<Vec<Node>> {
        self.share_repo.shared_by(ctx.user_id).await
    }
}

/// Drop repeated IDs, keeping first occurrences in order.
fn dedup(ids: &[NodeId]) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
