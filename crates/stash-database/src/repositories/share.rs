//! Share grant repository.

use chrono::Utc;

use stash_core::error::AppError;
use stash_core::result::AppResult;
use stash_core::types::{NodeId, UserId};
use stash_entity::node::Node;
use stash_entity::share::FileShare;

use crate::connection::{Database, commit, query_failed};
use crate::rows;

/// Repository for direct per-node grants.
#[derive(Debug, Clone)]
pub struct ShareRepository {
    db: Database,
}

impl ShareRepository {
    /// Create a new share repository.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Grant `grantee` access to every node in `file_ids`.
    ///
    /// All nodes are validated before anything is written: each must be a
    /// live, non-root node owned by `grantor`. Existing grants are kept as
    /// they are. Returns how many grants were newly created.
    pub async fn grant_many(
        &self,
        grantor: UserId,
        grantee: UserId,
        file_ids: &[NodeId],
    ) -> AppResult<usize> {
        let mut tx = self.db.begin().await?;

        for id in file_ids {
            let node = rows::owned_node(&mut tx, grantor, *id).await?;
            if node.is_root {
                return Err(AppError::invalid_state("The root folder cannot be shared"));
            }
            if !node.is_live() {
                return Err(AppError::invalid_state(format!(
                    "'{}' is in the trash and cannot be shared",
                    node.name
                )));
            }
        }

        let now = Utc::now();
        let mut created = 0;
        for id in file_ids {
            let result = sqlx::query(
                r#"
                INSERT INTO shares (file_id, user_id, shared_by, created_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (file_id, user_id) DO NOTHING
                "#,
            )
            .bind(id.to_string())
            .bind(grantee.to_string())
            .bind(grantor.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(query_failed("Failed to create share"))?;
            created += result.rows_affected() as usize;
        }
        commit(tx).await?;

        Ok(created)
    }

    /// Remove the grant of `file_id` to `grantee`. Only the node's owner may
    /// revoke. Returns whether a grant existed.
    pub async fn revoke(&self, grantor: UserId, file_id: NodeId, grantee: UserId) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;
        rows::owned_node(&mut tx, grantor, file_id).await?;
        let result = sqlx::query("DELETE FROM shares WHERE file_id = ? AND user_id = ?")
            .bind(file_id.to_string())
            .bind(grantee.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_failed("Failed to revoke share"))?;
        commit(tx).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether `user` holds a direct grant on `file_id`.
    pub async fn exists(&self, file_id: NodeId, user: UserId) -> AppResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM shares WHERE file_id = ? AND user_id = ?")
                .bind(file_id.to_string())
                .bind(user.to_string())
                .fetch_optional(self.db.pool())
                .await
                .map_err(query_failed("Failed to check share"))?;
        Ok(found.is_some())
    }

    /// All grants on a node.
    pub async fn find_for_file(&self, file_id: NodeId) -> AppResult<Vec<FileShare>> {
        let found = sqlx::query("SELECT * FROM shares WHERE file_id = ? ORDER BY user_id")
            .bind(file_id.to_string())
            .fetch_all(self.db.pool())
            .await
            .map_err(query_failed("Failed to list shares"))?;
        found.iter().map(rows::share_from_row).collect()
    }

    /// Live nodes directly shared with `user`, in listing order.
    pub async fn shared_with(&self, user: UserId) -> AppResult<Vec<Node>> {
        let found = sqlx::query(
            r#"
            SELECT * FROM nodes
            WHERE id IN (SELECT file_id FROM shares WHERE user_id = ?)
              AND deleted_at IS NULL
            "#,
        )
        .bind(user.to_string())
        .fetch_all(self.db.pool())
        .await
        .map_err(query_failed("Failed to list shared-with"))?;
        rows::listed(&found)
    }

    /// Live nodes `user` has shared with anyone, each listed once.
    pub async fn shared_by(&self, user: UserId) -> AppResult<Vec<Node>> {
        let found = sqlx::query(
            r#"
            SELECT * FROM nodes
            WHERE id IN (SELECT file_id FROM shares WHERE shared_by = ?)
              AND deleted_at IS NULL
            "#,
        )
        .bind(user.to_string())
        .fetch_all(self.db.pool())
        .await
        .map_err(query_failed("Failed to list shared-by"))?;
        rows::listed(&found)
    }
}
