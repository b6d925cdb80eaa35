//! Row mapping and the tree statements shared by several repositories.
//!
//! Identifiers are stored as hyphenated UUID text and interval bounds as
//! signed integers; everything here converts between those columns and the
//! entity types.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use stash_core::error::{AppError, ErrorKind};
use stash_core::result::AppResult;
use stash_core::types::{NodeId, UserId};
use stash_entity::node::{FilePayload, Interval, Node, NodeKind};
use stash_entity::share::FileShare;
use stash_entity::user::User;

use crate::connection::query_failed;

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> AppResult<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| {
        AppError::with_source(ErrorKind::Database, format!("Failed to decode column '{name}'"), e)
    })
}

pub(crate) fn parse<T>(raw: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| AppError::new(ErrorKind::Database, format!("Malformed identifier '{raw}': {e}")))
}

fn bound(value: i64) -> AppResult<u64> {
    u64::try_from(value)
        .map_err(|_| AppError::new(ErrorKind::Database, format!("Negative interval bound {value}")))
}

pub(crate) fn user_from_row(row: &SqliteRow) -> AppResult<User> {
    Ok(User {
        id: parse(&column::<String>(row, "id")?)?,
        email: column(row, "email")?,
        name: column(row, "name")?,
        created_at: column(row, "created_at")?,
    })
}

pub(crate) fn node_from_row(row: &SqliteRow) -> AppResult<Node> {
    let kind = if column::<bool>(row, "is_folder")? {
        NodeKind::Folder
    } else {
        NodeKind::File(FilePayload {
            storage_path: column(row, "storage_path")?,
            mime: column(row, "mime")?,
            size: column::<i64>(row, "size")? as u64,
            uploaded_on_cloud: column(row, "uploaded_on_cloud")?,
        })
    };
    let parent_id = column::<Option<String>>(row, "parent_id")?
        .map(|raw| parse::<NodeId>(&raw))
        .transpose()?;

    Ok(Node {
        id: parse(&column::<String>(row, "id")?)?,
        owner_id: parse(&column::<String>(row, "owner_id")?)?,
        parent_id,
        name: column(row, "name")?,
        is_root: column(row, "is_root")?,
        interval: Interval::new(bound(column(row, "lft")?)?, bound(column(row, "rgt")?)?),
        kind,
        created_at: column(row, "created_at")?,
        deleted_at: column(row, "deleted_at")?,
    })
}

pub(crate) fn share_from_row(row: &SqliteRow) -> AppResult<FileShare> {
    Ok(FileShare {
        file_id: parse(&column::<String>(row, "file_id")?)?,
        user_id: parse(&column::<String>(row, "user_id")?)?,
        shared_by: parse(&column::<String>(row, "shared_by")?)?,
        created_at: column(row, "created_at")?,
    })
}

pub(crate) fn nodes_from_rows(rows: &[SqliteRow]) -> AppResult<Vec<Node>> {
    rows.iter().map(node_from_row).collect()
}

/// Map rows and put them in listing order.
pub(crate) fn listed(rows: &[SqliteRow]) -> AppResult<Vec<Node>> {
    let mut nodes = nodes_from_rows(rows)?;
    nodes.sort_by(Node::listing_order);
    Ok(nodes)
}

pub(crate) async fn find_node(conn: &mut SqliteConnection, id: NodeId) -> AppResult<Option<Node>> {
    sqlx::query("SELECT * FROM nodes WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_failed("Failed to find node"))?
        .as_ref()
        .map(node_from_row)
        .transpose()
}

/// Fetch a node owned by `owner`, treating foreign nodes as missing.
pub(crate) async fn owned_node(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: NodeId,
) -> AppResult<Node> {
    find_node(conn, id)
        .await?
        .filter(|n| n.owner_id == owner)
        .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))
}

pub(crate) async fn root_of(conn: &mut SqliteConnection, owner: UserId) -> AppResult<Option<Node>> {
    sqlx::query("SELECT * FROM nodes WHERE owner_id = ? AND is_root = 1")
        .bind(owner.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_failed("Failed to find root folder"))?
        .as_ref()
        .map(node_from_row)
        .transpose()
}

/// Rows strictly inside `node`'s interval, in pre-order.
pub(crate) async fn descendants_of(conn: &mut SqliteConnection, node: &Node) -> AppResult<Vec<Node>> {
    let rows = sqlx::query(
        "SELECT * FROM nodes WHERE owner_id = ? AND lft > ? AND rgt < ? ORDER BY lft",
    )
    .bind(node.owner_id.to_string())
    .bind(node.interval.lft as i64)
    .bind(node.interval.rgt as i64)
    .fetch_all(&mut *conn)
    .await
    .map_err(query_failed("Failed to list descendants"))?;
    nodes_from_rows(&rows)
}

/// Live children of `parent_id` in listing order.
pub(crate) async fn live_children(
    conn: &mut SqliteConnection,
    parent_id: NodeId,
) -> AppResult<Vec<Node>> {
    let rows = sqlx::query("SELECT * FROM nodes WHERE parent_id = ? AND deleted_at IS NULL")
        .bind(parent_id.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(query_failed("Failed to list children"))?;
    listed(&rows)
}

/// Insert a fully numbered node row.
pub(crate) async fn insert_node(conn: &mut SqliteConnection, node: &Node) -> AppResult<()> {
    let payload = node.payload();
    sqlx::query(
        r#"
        INSERT INTO nodes (id, owner_id, parent_id, name, is_root, lft, rgt, is_folder,
                           storage_path, mime, size, uploaded_on_cloud, created_at, deleted_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(node.id.to_string())
    .bind(node.owner_id.to_string())
    .bind(node.parent_id.map(|p| p.to_string()))
    .bind(&node.name)
    .bind(node.is_root)
    .bind(node.interval.lft as i64)
    .bind(node.interval.rgt as i64)
    .bind(node.is_folder())
    .bind(payload.map(|p| p.storage_path.clone()))
    .bind(payload.and_then(|p| p.mime.clone()))
    .bind(payload.map(|p| p.size as i64))
    .bind(payload.is_some_and(|p| p.uploaded_on_cloud))
    .bind(node.created_at)
    .bind(node.deleted_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::conflict(format!("Node {} already exists", node.id))
        } else {
            AppError::with_source(ErrorKind::Database, "Failed to insert node", e)
        }
    })?;
    Ok(())
}

/// Insert the owner's root folder. Fails with a conflict when one exists.
pub(crate) async fn insert_root(
    conn: &mut SqliteConnection,
    owner: UserId,
    name: &str,
    created_at: DateTime<Utc>,
) -> AppResult<Node> {
    if root_of(conn, owner).await?.is_some() {
        return Err(AppError::conflict(format!(
            "Owner {owner} already has a root folder"
        )));
    }
    let stray: Option<i64> = sqlx::query_scalar("SELECT 1 FROM nodes WHERE owner_id = ? LIMIT 1")
        .bind(owner.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_failed("Failed to check owner nodes"))?;
    if stray.is_some() {
        return Err(AppError::invalid_state(format!(
            "Owner {owner} has nodes but no root folder"
        )));
    }

    let root = Node {
        id: NodeId::new(),
        owner_id: owner,
        parent_id: None,
        name: name.to_string(),
        is_root: true,
        interval: Interval::ROOT,
        kind: NodeKind::Folder,
        created_at,
        deleted_at: None,
    };
    insert_node(conn, &root).await?;
    Ok(root)
}

/// Open a two-value gap at `slot` in the owner's numbering: every bound at
/// or past it moves right by two.
pub(crate) async fn open_gap(conn: &mut SqliteConnection, owner: UserId, slot: u64) -> AppResult<()> {
    // Right bounds first so that lft < rgt holds after every row update.
    sqlx::query("UPDATE nodes SET rgt = rgt + 2 WHERE owner_id = ? AND rgt >= ?")
        .bind(owner.to_string())
        .bind(slot as i64)
        .execute(&mut *conn)
        .await
        .map_err(query_failed("Failed to shift right bounds"))?;
    sqlx::query("UPDATE nodes SET lft = lft + 2 WHERE owner_id = ? AND lft > ?")
        .bind(owner.to_string())
        .bind(slot as i64)
        .execute(&mut *conn)
        .await
        .map_err(query_failed("Failed to shift left bounds"))?;
    Ok(())
}

/// Close the gap left by a removed leaf whose right bound was `rgt`.
pub(crate) async fn close_gap(conn: &mut SqliteConnection, owner: UserId, rgt: u64) -> AppResult<()> {
    // Left bounds first, mirroring `open_gap`.
    sqlx::query("UPDATE nodes SET lft = lft - 2 WHERE owner_id = ? AND lft > ?")
        .bind(owner.to_string())
        .bind(rgt as i64)
        .execute(&mut *conn)
        .await
        .map_err(query_failed("Failed to shift left bounds"))?;
    sqlx::query("UPDATE nodes SET rgt = rgt - 2 WHERE owner_id = ? AND rgt > ?")
        .bind(owner.to_string())
        .bind(rgt as i64)
        .execute(&mut *conn)
        .await
        .map_err(query_failed("Failed to shift right bounds"))?;
    Ok(())
}

/// Check the structural invariants of one owner's tree, given all of its
/// rows.
pub(crate) fn verify_tree(owner: UserId, nodes: &[Node]) -> AppResult<()> {
    if nodes.is_empty() {
        return Ok(());
    }

    let roots: Vec<&Node> = nodes.iter().filter(|n| n.is_root).collect();
    if roots.len() != 1 {
        return Err(AppError::internal(format!(
            "Owner {owner} has {} root folders",
            roots.len()
        )));
    }
    if roots[0].parent_id.is_some() || roots[0].deleted_at.is_some() {
        return Err(AppError::internal(format!(
            "Root folder of owner {owner} is attached or trashed"
        )));
    }

    let mut bounds: Vec<u64> = nodes
        .iter()
        .flat_map(|n| [n.interval.lft, n.interval.rgt])
        .collect();
    bounds.sort_unstable();
    if bounds.iter().copied().ne(1..=(nodes.len() as u64 * 2)) {
        return Err(AppError::internal(format!(
            "Interval bounds of owner {owner} are not contiguous"
        )));
    }

    for node in nodes.iter().filter(|n| !n.is_root) {
        let parent_id = node
            .parent_id
            .ok_or_else(|| AppError::internal(format!("Node {} has no parent", node.id)))?;
        let innermost = nodes
            .iter()
            .filter(|candidate| candidate.interval.contains(&node.interval))
            .max_by_key(|candidate| candidate.interval.lft)
            .ok_or_else(|| AppError::internal(format!("Node {} lies outside the root", node.id)))?;
        if innermost.id != parent_id {
            return Err(AppError::internal(format!(
                "Node {} is numbered under {} but parented to {parent_id}",
                node.id, innermost.id
            )));
        }
        if !innermost.is_folder() {
            return Err(AppError::internal(format!(
                "Node {} is nested under file {}",
                node.id, innermost.id
            )));
        }
    }

    Ok(())
}
