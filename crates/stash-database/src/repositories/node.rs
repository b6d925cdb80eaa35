//! Node repository: the per-user tree.

use chrono::{DateTime, Utc};
use tracing::debug;

use stash_core::error::AppError;
use stash_core::result::AppResult;
use stash_core::types::{NodeId, UserId};
use stash_entity::node::{Interval, NewNode, Node, NodeKind};

use crate::connection::{Database, commit, query_failed};
use crate::rows;

/// Repository for node structure, lifecycle, and tree queries.
///
/// Every method takes the acting owner explicitly; nodes belonging to
/// someone else are reported as missing.
#[derive(Debug, Clone)]
pub struct NodeRepository {
    db: Database,
}

impl NodeRepository {
    /// Create a new node repository.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Find a node by ID regardless of owner or state.
    pub async fn find_by_id(&self, id: NodeId) -> AppResult<Option<Node>> {
        let mut conn = self.db.acquire().await?;
        rows::find_node(&mut conn, id).await
    }

    /// Fetch a node owned by `owner`.
    pub async fn get_owned(&self, owner: UserId, id: NodeId) -> AppResult<Node> {
        let mut conn = self.db.acquire().await?;
        rows::owned_node(&mut conn, owner, id).await
    }

    /// Find the owner's root folder.
    pub async fn find_root(&self, owner: UserId) -> AppResult<Option<Node>> {
        let mut conn = self.db.acquire().await?;
        rows::root_of(&mut conn, owner).await
    }

    /// Provision the owner's root folder.
    pub async fn create_root(&self, owner: UserId, name: &str) -> AppResult<Node> {
        let mut tx = self.db.begin().await?;
        let root = rows::insert_root(&mut tx, owner, name, Utc::now()).await?;
        commit(tx).await?;

        debug!(owner = %owner, root_id = %root.id, "Root folder created");
        Ok(root)
    }

    /// Append `new` under `parent_id`, renumbering the parent and its
    /// ancestors.
    ///
    /// The new node takes the slot just inside the parent's right bound;
    /// every bound of the owner's tree at or past that slot moves right by
    /// two, inside one transaction.
    pub async fn append_child(
        &self,
        owner: UserId,
        parent_id: NodeId,
        new: NewNode,
    ) -> AppResult<Node> {
        let mut tx = self.db.begin().await?;
        let parent = rows::owned_node(&mut tx, owner, parent_id).await?;
        if !parent.is_folder() {
            return Err(AppError::invalid_state(format!(
                "Cannot add '{}' under '{}': it is a file",
                new.name, parent.name
            )));
        }
        if !parent.is_live() {
            return Err(AppError::invalid_state(format!(
                "Cannot add '{}' under '{}': it is in the trash",
                new.name, parent.name
            )));
        }
        if rows::find_node(&mut tx, new.id).await?.is_some() {
            return Err(AppError::conflict(format!("Node {} already exists", new.id)));
        }

        let slot = parent.interval.rgt;
        rows::open_gap(&mut tx, owner, slot).await?;

        let node = Node {
            id: new.id,
            owner_id: owner,
            parent_id: Some(parent_id),
            name: new.name,
            is_root: false,
            interval: Interval::new(slot, slot + 1),
            kind: new.kind,
            created_at: new.created_at,
            deleted_at: None,
        };
        rows::insert_node(&mut tx, &node).await?;
        commit(tx).await?;

        debug!(
            owner = %owner,
            node_id = %node.id,
            parent_id = %parent_id,
            lft = node.interval.lft,
            "Node appended"
        );
        Ok(node)
    }

    /// Live children of a folder, folders first, newest first.
    pub async fn children(&self, owner: UserId, parent_id: NodeId) -> AppResult<Vec<Node>> {
        let mut conn = self.db.acquire().await?;
        rows::owned_node(&mut conn, owner, parent_id).await?;
        rows::live_children(&mut conn, parent_id).await
    }

    /// Ancestors from the root down to the immediate parent.
    pub async fn ancestors(&self, owner: UserId, id: NodeId) -> AppResult<Vec<Node>> {
        let mut conn = self.db.acquire().await?;
        let node = rows::owned_node(&mut conn, owner, id).await?;
        let found = sqlx::query(
            "SELECT * FROM nodes WHERE owner_id = ? AND lft < ? AND rgt > ? ORDER BY lft",
        )
        .bind(owner.to_string())
        .bind(node.interval.lft as i64)
        .bind(node.interval.rgt as i64)
        .fetch_all(&mut *conn)
        .await
        .map_err(query_failed("Failed to list ancestors"))?;
        rows::nodes_from_rows(&found)
    }

    /// Every row inside the node's interval, in pre-order, whatever its state.
    pub async fn descendants(&self, owner: UserId, id: NodeId) -> AppResult<Vec<Node>> {
        let mut conn = self.db.acquire().await?;
        let node = rows::owned_node(&mut conn, owner, id).await?;
        rows::descendants_of(&mut conn, &node).await
    }

    /// Resolve a `/`-separated path of names below the owner's root.
    ///
    /// Sibling names are not unique; each segment picks the first live
    /// match in listing order.
    pub async fn resolve_path(&self, owner: UserId, path: &str) -> AppResult<Node> {
        let mut conn = self.db.acquire().await?;
        let mut current = rows::root_of(&mut conn, owner)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Owner {owner} has no root folder")))?;

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = rows::live_children(&mut conn, current.id)
                .await?
                .into_iter()
                .find(|child| child.name == segment)
                .ok_or_else(|| AppError::not_found(format!("No such path: {path}")))?;
        }

        Ok(current)
    }

    /// Live, non-root nodes of `owner` whose name contains `term`, ignoring
    /// case and folder boundaries.
    pub async fn search(&self, owner: UserId, term: &str) -> AppResult<Vec<Node>> {
        let needle = term.to_lowercase();
        let candidates = sqlx::query(
            "SELECT * FROM nodes WHERE owner_id = ? AND is_root = 0 AND deleted_at IS NULL",
        )
        .bind(owner.to_string())
        .fetch_all(self.db.pool())
        .await
        .map_err(query_failed("Failed to search nodes"))?;

        // SQLite's LIKE folds ASCII only; match in Rust for full Unicode.
        let mut found: Vec<Node> = rows::nodes_from_rows(&candidates)?
            .into_iter()
            .filter(|n| n.name.to_lowercase().contains(&needle))
            .collect();
        found.sort_by(Node::listing_order);
        Ok(found)
    }

    /// All rows of an owner, in pre-order.
    pub async fn find_by_owner(&self, owner: UserId) -> AppResult<Vec<Node>> {
        let found = sqlx::query("SELECT * FROM nodes WHERE owner_id = ? ORDER BY lft")
            .bind(owner.to_string())
            .fetch_all(self.db.pool())
            .await
            .map_err(query_failed("Failed to list owner nodes"))?;
        rows::nodes_from_rows(&found)
    }

    /// Trashed nodes of an owner in listing order.
    pub async fn trashed(&self, owner: UserId) -> AppResult<Vec<Node>> {
        let found = sqlx::query("SELECT * FROM nodes WHERE owner_id = ? AND deleted_at IS NOT NULL")
            .bind(owner.to_string())
            .fetch_all(self.db.pool())
            .await
            .map_err(query_failed("Failed to list trash"))?;
        rows::listed(&found)
    }

    /// Mark a live node and every live descendant as trashed at `at`.
    ///
    /// Returns the IDs that changed state, the node itself first.
    pub async fn trash(
        &self,
        owner: UserId,
        id: NodeId,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<NodeId>> {
        let mut tx = self.db.begin().await?;
        let node = rows::owned_node(&mut tx, owner, id).await?;
        if node.is_root {
            return Err(AppError::invalid_state("The root folder cannot be trashed"));
        }
        if !node.is_live() {
            return Err(AppError::invalid_state(format!(
                "'{}' is already in the trash",
                node.name
            )));
        }

        let mut affected = vec![id];
        affected.extend(
            rows::descendants_of(&mut tx, &node)
                .await?
                .into_iter()
                .filter(|d| d.is_live())
                .map(|d| d.id),
        );

        sqlx::query(
            r#"
            UPDATE nodes SET deleted_at = ?
            WHERE owner_id = ? AND lft >= ? AND rgt <= ? AND deleted_at IS NULL
            "#,
        )
        .bind(at)
        .bind(owner.to_string())
        .bind(node.interval.lft as i64)
        .bind(node.interval.rgt as i64)
        .execute(&mut *tx)
        .await
        .map_err(query_failed("Failed to trash nodes"))?;
        commit(tx).await?;

        Ok(affected)
    }

    /// Bring a trashed node back.
    ///
    /// With `cascade` unset only the node itself is restored. With it set,
    /// descendants trashed by the same operation (same timestamp) come back
    /// too.
    pub async fn restore(&self, owner: UserId, id: NodeId, cascade: bool) -> AppResult<Vec<NodeId>> {
        let mut tx = self.db.begin().await?;
        let node = rows::owned_node(&mut tx, owner, id).await?;
        let Some(deleted_at) = node.deleted_at else {
            return Err(AppError::invalid_state(format!(
                "'{}' is not in the trash",
                node.name
            )));
        };

        let mut affected = vec![id];
        if cascade {
            affected.extend(
                rows::descendants_of(&mut tx, &node)
                    .await?
                    .into_iter()
                    .filter(|d| d.deleted_at == Some(deleted_at))
                    .map(|d| d.id),
            );
        }

        for node_id in &affected {
            sqlx::query("UPDATE nodes SET deleted_at = NULL WHERE id = ?")
                .bind(node_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(query_failed("Failed to restore node"))?;
        }
        commit(tx).await?;

        Ok(affected)
    }

    /// Restore every trashed node of an owner.
    pub async fn restore_all(&self, owner: UserId) -> AppResult<usize> {
        let result = sqlx::query(
            "UPDATE nodes SET deleted_at = NULL WHERE owner_id = ? AND deleted_at IS NOT NULL",
        )
        .bind(owner.to_string())
        .execute(self.db.pool())
        .await
        .map_err(query_failed("Failed to restore trash"))?;
        Ok(result.rows_affected() as usize)
    }

    /// Permanently remove a trashed node that contains nothing, closing the
    /// gap it leaves in the numbering. Its grants and stars go with it.
    /// Returns the removed row.
    pub async fn purge(&self, owner: UserId, id: NodeId) -> AppResult<Node> {
        let mut tx = self.db.begin().await?;
        let node = rows::owned_node(&mut tx, owner, id).await?;
        if node.is_live() {
            return Err(AppError::invalid_state(format!(
                "'{}' must be trashed before it can be purged",
                node.name
            )));
        }
        if node.is_root {
            return Err(AppError::invalid_state("The root folder cannot be removed"));
        }
        if !node.interval.is_leaf() {
            return Err(AppError::invalid_state(format!(
                "'{}' still contains {} node(s)",
                node.name,
                node.interval.descendant_count()
            )));
        }

        for table in ["shares", "stars"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE file_id = ?"))
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(query_failed("Failed to drop grants and stars"))?;
        }
        sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_failed("Failed to delete node"))?;
        rows::close_gap(&mut tx, owner, node.interval.rgt).await?;
        commit(tx).await?;

        debug!(owner = %owner, node_id = %id, "Node purged");
        Ok(node)
    }

    /// Record that the external upload job migrated a file to the cloud
    /// tier, optionally under a new key. Allowed once per file.
    pub async fn mark_uploaded_on_cloud(
        &self,
        id: NodeId,
        new_storage_path: Option<String>,
    ) -> AppResult<Node> {
        let mut tx = self.db.begin().await?;
        let mut node = rows::find_node(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))?;

        let NodeKind::File(payload) = &mut node.kind else {
            return Err(AppError::invalid_state(format!(
                "'{}' is a folder and has no payload",
                node.name
            )));
        };
        if payload.uploaded_on_cloud {
            return Err(AppError::invalid_state(format!(
                "'{}' is already on the cloud tier",
                node.name
            )));
        }

        payload.uploaded_on_cloud = true;
        if let Some(path) = new_storage_path {
            payload.storage_path = path;
        }
        sqlx::query("UPDATE nodes SET uploaded_on_cloud = 1, storage_path = ? WHERE id = ?")
            .bind(&payload.storage_path)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_failed("Failed to mark upload"))?;
        commit(tx).await?;

        Ok(node)
    }

    /// Check the structural invariants of an owner's tree.
    pub async fn verify(&self, owner: UserId) -> AppResult<()> {
        let nodes = self.find_by_owner(owner).await?;
        rows::verify_tree(owner, &nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash_core::error::ErrorKind;
    use stash_entity::node::FilePayload;

    async fn setup() -> (NodeRepository, UserId, Node) {
        let repo = NodeRepository::new(Database::in_memory().await.unwrap());
        let owner = UserId::new();
        let root = repo.create_root(owner, "alice").await.unwrap();
        (repo, owner, root)
    }

    fn file(name: &str) -> NewNode {
        NewNode::file(name, FilePayload::local(format!("k/{name}"), None, 1))
    }

    #[tokio::test]
    async fn test_second_root_conflicts() {
        let (repo, owner, _) = setup().await;
        let err = repo.create_root(owner, "again").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_append_widens_every_ancestor() {
        let (repo, owner, root) = setup().await;
        let docs = repo.append_child(owner, root.id, NewNode::folder("docs")).await.unwrap();
        let deep = repo.append_child(owner, docs.id, NewNode::folder("deep")).await.unwrap();
        let leaf = repo.append_child(owner, deep.id, file("a.txt")).await.unwrap();
        let music = repo.append_child(owner, root.id, NewNode::folder("music")).await.unwrap();

        let root = repo.get_owned(owner, root.id).await.unwrap();
        let docs = repo.get_owned(owner, docs.id).await.unwrap();
        let deep = repo.get_owned(owner, deep.id).await.unwrap();
        let leaf = repo.get_owned(owner, leaf.id).await.unwrap();
        let music = repo.get_owned(owner, music.id).await.unwrap();
        assert!(root.is_ancestor_of(&leaf));
        assert!(docs.is_ancestor_of(&leaf));
        assert!(deep.is_ancestor_of(&leaf));
        assert!(!docs.is_ancestor_of(&music));
        assert_eq!(root.interval, Interval::new(1, 10));
        repo.verify(owner).await.unwrap();
    }

    #[tokio::test]
    async fn test_append_under_file_or_trash_is_rejected() {
        let (repo, owner, root) = setup().await;
        let f = repo.append_child(owner, root.id, file("a.txt")).await.unwrap();
        let err = repo
            .append_child(owner, f.id, NewNode::folder("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);

        let old = repo.append_child(owner, root.id, NewNode::folder("old")).await.unwrap();
        repo.trash(owner, old.id, Utc::now()).await.unwrap();
        let err = repo
            .append_child(owner, old.id, NewNode::folder("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);

        let err = repo
            .append_child(owner, root.id, NewNode::folder("dup").with_id(f.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        repo.verify(owner).await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_closes_gap() {
        let (repo, owner, root) = setup().await;
        let a = repo.append_child(owner, root.id, NewNode::folder("a")).await.unwrap();
        let b = repo.append_child(owner, root.id, NewNode::folder("b")).await.unwrap();
        repo.append_child(owner, b.id, NewNode::folder("c")).await.unwrap();

        let err = repo.purge(owner, a.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);

        repo.trash(owner, a.id, Utc::now()).await.unwrap();
        repo.purge(owner, a.id).await.unwrap();
        assert_eq!(
            repo.get_owned(owner, root.id).await.unwrap().interval,
            Interval::new(1, 6)
        );
        assert!(repo.find_by_id(a.id).await.unwrap().is_none());
        repo.verify(owner).await.unwrap();

        repo.trash(owner, b.id, Utc::now()).await.unwrap();
        let err = repo.purge(owner, b.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_trash_and_cascading_restore() {
        let (repo, owner, root) = setup().await;
        let docs = repo.append_child(owner, root.id, NewNode::folder("docs")).await.unwrap();
        let early = repo.append_child(owner, docs.id, file("early.txt")).await.unwrap();
        let late = repo.append_child(owner, docs.id, file("late.txt")).await.unwrap();

        let first = Utc::now();
        repo.trash(owner, early.id, first).await.unwrap();
        let second = first + chrono::Duration::seconds(5);
        let trashed = repo.trash(owner, docs.id, second).await.unwrap();
        assert_eq!(trashed, vec![docs.id, late.id]);
        assert_eq!(repo.trashed(owner).await.unwrap().len(), 3);

        let restored = repo.restore(owner, docs.id, true).await.unwrap();
        assert_eq!(restored, vec![docs.id, late.id]);
        let early = repo.get_owned(owner, early.id).await.unwrap();
        assert_eq!(early.deleted_at, Some(first));

        assert_eq!(repo.restore_all(owner).await.unwrap(), 1);
        assert!(repo.trashed(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_path_and_ancestors() {
        let (repo, owner, root) = setup().await;
        let docs = repo.append_child(owner, root.id, NewNode::folder("docs")).await.unwrap();
        let work = repo.append_child(owner, docs.id, NewNode::folder("work")).await.unwrap();
        let report = repo.append_child(owner, work.id, file("report.txt")).await.unwrap();

        let found = repo.resolve_path(owner, "/docs/work/report.txt").await.unwrap();
        assert_eq!(found.id, report.id);
        assert_eq!(repo.resolve_path(owner, "/").await.unwrap().id, root.id);

        let chain: Vec<NodeId> = repo
            .ancestors(owner, report.id)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(chain, vec![root.id, docs.id, work.id]);

        let other = UserId::new();
        repo.create_root(other, "bob").await.unwrap();
        let err = repo.resolve_path(other, "/docs").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = repo.get_owned(other, report.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_trees_of_different_owners_are_independent() {
        let (repo, alice, alice_root) = setup().await;
        let bob = UserId::new();
        let bob_root = repo.create_root(bob, "bob").await.unwrap();

        repo.append_child(alice, alice_root.id, NewNode::folder("x")).await.unwrap();
        assert_eq!(
            repo.get_owned(bob, bob_root.id).await.unwrap().interval,
            Interval::ROOT
        );
        let err = repo
            .append_child(alice, bob_root.id, NewNode::folder("y"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        repo.verify(alice).await.unwrap();
        repo.verify(bob).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_sibling_names_allowed() {
        let (repo, owner, root) = setup().await;
        repo.append_child(owner, root.id, file("same.txt")).await.unwrap();
        repo.append_child(owner, root.id, file("same.txt")).await.unwrap();
        assert_eq!(repo.children(owner, root.id).await.unwrap().len(), 2);
        repo.verify(owner).await.unwrap();
    }

    #[tokio::test]
    async fn test_search_is_flat_and_case_insensitive() {
        let (repo, owner, root) = setup().await;
        let docs = repo.append_child(owner, root.id, NewNode::folder("Docs")).await.unwrap();
        repo.append_child(owner, docs.id, file("Report-2024.pdf")).await.unwrap();
        let old = repo.append_child(owner, root.id, file("old report.txt")).await.unwrap();
        repo.append_child(owner, root.id, file("photo.png")).await.unwrap();
        repo.trash(owner, old.id, Utc::now()).await.unwrap();

        let hits = repo.search(owner, "REPORT").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Report-2024.pdf");
        assert!(repo.search(owner, "alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_uploaded_once() {
        let (repo, owner, root) = setup().await;
        let f = repo.append_child(owner, root.id, file("a.bin")).await.unwrap();

        let moved = repo
            .mark_uploaded_on_cloud(f.id, Some("cloud/a.bin".into()))
            .await
            .unwrap();
        let payload = moved.payload().unwrap();
        assert!(payload.uploaded_on_cloud);
        assert_eq!(payload.storage_path, "cloud/a.bin");
        let stored = repo.find_by_id(f.id).await.unwrap().unwrap();
        assert_eq!(stored.payload(), Some(payload));

        let err = repo.mark_uploaded_on_cloud(f.id, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
        let err = repo.mark_uploaded_on_cloud(root.id, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_intervals_consistent() {
        let (repo, owner, root) = setup().await;
        let a = repo.append_child(owner, root.id, NewNode::folder("a")).await.unwrap();
        let b = repo.append_child(owner, root.id, NewNode::folder("b")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..64 {
            let repo = repo.clone();
            let parent = if i % 2 == 0 { a.id } else { b.id };
            handles.push(tokio::spawn(async move {
                repo.append_child(owner, parent, file(&format!("f{i}")))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        repo.verify(owner).await.unwrap();
        assert_eq!(repo.descendants(owner, a.id).await.unwrap().len(), 32);
        assert_eq!(repo.descendants(owner, root.id).await.unwrap().len(), 66);
    }
}
