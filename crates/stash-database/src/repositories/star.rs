//! Favorites repository.

use std::collections::HashSet;

use chrono::Utc;

use stash_core::error::AppError;
use stash_core::result::AppResult;
use stash_core::types::{NodeId, UserId};
use stash_entity::node::Node;

use crate::connection::{Database, commit, query_failed};
use crate::rows;

/// Repository for per-user stars.
#[derive(Debug, Clone)]
pub struct StarRepository {
    db: Database,
}

impl StarRepository {
    /// Create a new star repository.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Flip the star of `user` on `file_id` and return the new state.
    ///
    /// The node must be live, not a root, and either owned by `user` or
    /// directly shared with them.
    pub async fn toggle(&self, user: UserId, file_id: NodeId) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;
        let missing = || AppError::not_found(format!("Node {file_id} not found"));

        let node = rows::find_node(&mut tx, file_id).await?.ok_or_else(missing)?;
        if node.owner_id != user {
            let granted: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM shares WHERE file_id = ? AND user_id = ?")
                    .bind(file_id.to_string())
                    .bind(user.to_string())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(query_failed("Failed to check share"))?;
            if granted.is_none() {
                return Err(missing());
            }
        }
        if node.is_root {
            return Err(AppError::invalid_state("The root folder cannot be starred"));
        }
        if !node.is_live() {
            return Err(AppError::invalid_state(format!(
                "'{}' is in the trash and cannot be starred",
                node.name
            )));
        }

        let removed = sqlx::query("DELETE FROM stars WHERE file_id = ? AND user_id = ?")
            .bind(file_id.to_string())
            .bind(user.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_failed("Failed to remove star"))?;
        let starred = if removed.rows_affected() > 0 {
            false
        } else {
            sqlx::query(
                r#"
                INSERT INTO stars (file_id, user_id, created_at)
                VALUES (?, ?, ?)
                ON CONFLICT (file_id, user_id) DO NOTHING
                "#,
            )
            .bind(file_id.to_string())
            .bind(user.to_string())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(query_failed("Failed to add star"))?;
            true
        };
        commit(tx).await?;

        Ok(starred)
    }

    /// Whether `user` starred `file_id`.
    pub async fn is_starred(&self, user: UserId, file_id: NodeId) -> AppResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM stars WHERE file_id = ? AND user_id = ?")
                .bind(file_id.to_string())
                .bind(user.to_string())
                .fetch_optional(self.db.pool())
                .await
                .map_err(query_failed("Failed to check star"))?;
        Ok(found.is_some())
    }

    /// IDs of everything `user` starred.
    pub async fn starred_ids(&self, user: UserId) -> AppResult<HashSet<NodeId>> {
        let raw: Vec<String> = sqlx::query_scalar("SELECT file_id FROM stars WHERE user_id = ?")
            .bind(user.to_string())
            .fetch_all(self.db.pool())
            .await
            .map_err(query_failed("Failed to list stars"))?;
        raw.iter().map(|id| rows::parse(id)).collect()
    }

    /// Live starred nodes of `user` in listing order.
    pub async fn starred_nodes(&self, user: UserId) -> AppResult<Vec<Node>> {
        let found = sqlx::query(
            r#"
            SELECT * FROM nodes
            WHERE id IN (SELECT file_id FROM stars WHERE user_id = ?)
              AND deleted_at IS NULL
            "#,
        )
        .bind(user.to_string())
        .fetch_all(self.db.pool())
        .await
        .map_err(query_failed("Failed to list starred nodes"))?;
        rows::listed(&found)
    }
}
