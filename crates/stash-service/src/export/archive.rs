//! Zip archive assembly.
//!
//! Payloads are read on the async side and handed over a bounded channel to
//! a blocking task that owns the `ZipWriter`. The archive is built in an
//! anonymous temporary file, so an aborted export leaves nothing behind.

use std::collections::{HashMap, HashSet};
use std::io::{Seek, SeekFrom, Write};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

use stash_core::config::{ArchiveCompression, ExportConfig};
use stash_core::error::{AppError, ErrorKind};
use stash_core::result::AppResult;
use stash_core::traits::storage::ByteStream;
use stash_core::types::{NodeId, Tier};
use stash_entity::node::Node;
use stash_storage::TierManager;

/// One file to be written, with its path inside the archive.
#[derive(Debug, Clone)]
pub(crate) struct ArchiveEntry {
    pub path: String,
    pub node: Node,
}

/// Ordered, collision-free list of archive entries.
#[derive(Debug, Default)]
pub(crate) struct EntryPlan {
    entries: Vec<ArchiveEntry>,
    used: HashSet<String>,
}

impl EntryPlan {
    /// Add a single file at `path`.
    pub fn add_file(&mut self, path: &str, node: Node) {
        let path = self.unique_path(path);
        self.entries.push(ArchiveEntry { path, node });
    }

    /// Add every file under `root`, which is placed at `root_path` (empty
    /// for the archive's top level). `descendants` must be in pre-order.
    ///
    /// Only live rows whose whole chain up to `root` is live are included.
    pub fn add_tree(&mut self, root: &Node, root_path: &str, descendants: Vec<Node>) {
        let mut folders: HashMap<NodeId, String> = HashMap::new();
        folders.insert(root.id, root_path.to_string());

        for node in descendants {
            if !node.is_live() {
                continue;
            }
            let Some(parent_path) = node.parent_id.and_then(|p| folders.get(&p)) else {
                continue;
            };
            let path = join(parent_path, &node.name);
            if node.is_folder() {
                folders.insert(node.id, path);
            } else {
                self.add_file(&path, node);
            }
        }
    }

    pub fn into_entries(self) -> Vec<ArchiveEntry> {
        self.entries
    }

    /// Sibling names may repeat; later duplicates get a ` (n)` suffix.
    fn unique_path(&mut self, path: &str) -> String {
        if self.used.insert(path.to_string()) {
            return path.to_string();
        }

        let (dir, file) = match path.rsplit_once('/') {
            Some((dir, file)) => (Some(dir), file),
            None => (None, path),
        };
        let (stem, ext) = match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (file, None),
        };

        let mut n = 1;
        loop {
            let name = match ext {
                Some(ext) => format!("{stem} ({n}).{ext}"),
                None => format!("{stem} ({n})"),
            };
            let candidate = match dir {
                Some(dir) => join(dir, &name),
                None => name,
            };
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn zip_error(e: ZipError) -> AppError {
    AppError::with_source(ErrorKind::Storage, "Failed to write archive", e)
}

fn unreadable(node: &Node, e: AppError) -> AppError {
    AppError::with_source(
        ErrorKind::Storage,
        format!("Cannot read '{}' for export", node.name),
        e,
    )
}

/// Read a file's bytes from the tier that holds them. Cloud payloads are
/// staged on the public tier first and read back from there; the staged
/// copy stays at `staging/<id>/<base>` afterwards.
pub(crate) async fn read_payload(tiers: &TierManager, node: &Node) -> AppResult<Bytes> {
    let payload = node
        .payload()
        .ok_or_else(|| AppError::internal(format!("'{}' is not a file", node.name)))?;

    match payload.tier() {
        Tier::Cloud => {
            let data = tiers
                .get(Tier::Cloud)
                .read_bytes(&payload.storage_path)
                .await
                .map_err(|e| unreadable(node, e))?;

            let staging_key = format!("staging/{}/{}", node.id, payload.base_name());
            let public = tiers.public();
            public
                .write(&staging_key, data)
                .await
                .map_err(|e| unreadable(node, e))?;
            let staged = public
                .read_bytes(&staging_key)
                .await
                .map_err(|e| unreadable(node, e))?;
            Ok(staged)
        }
        tier => tiers
            .get(tier)
            .read_bytes(&payload.storage_path)
            .await
            .map_err(|e| unreadable(node, e)),
    }
}

/// Write `entries` into a zip held in an anonymous temporary file, rewound
/// and ready to read. Returns the file and the number of entries written.
pub(crate) async fn write_archive(
    tiers: &TierManager,
    entries: &[ArchiveEntry],
    config: &ExportConfig,
    cancel: &CancellationToken,
) -> AppResult<(std::fs::File, usize)> {
    let method = match config.compression {
        ArchiveCompression::Deflated => CompressionMethod::Deflated,
        ArchiveCompression::Stored => CompressionMethod::Stored,
    };
    let (tx, mut rx) = mpsc::channel::<(String, Bytes)>(config.channel_capacity.max(1));

    let writer = tokio::task::spawn_blocking(move || -> AppResult<(std::fs::File, usize)> {
        let mut zip = ZipWriter::new(tempfile::tempfile()?);
        let mut written = 0;
        while let Some((path, data)) = rx.blocking_recv() {
            let options = SimpleFileOptions::default().compression_method(method);
            zip.start_file(path, options).map_err(zip_error)?;
            zip.write_all(&data)?;
            written += 1;
        }
        let mut file = zip.finish().map_err(zip_error)?;
        file.seek(SeekFrom::Start(0))?;
        Ok((file, written))
    });

    let fed = async {
        for entry in entries {
            if cancel.is_cancelled() {
                return Err(AppError::cancelled("Export cancelled"));
            }
            let data = read_payload(tiers, &entry.node).await?;
            debug!(path = %entry.path, bytes = data.len(), "Archive entry read");
            if tx.send((entry.path.clone(), data)).await.is_err() {
                // The writer stopped early; its error is reported below.
                break;
            }
        }
        Ok(())
    }
    .await;
    drop(tx);

    let written = writer
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Archive writer panicked", e))?;
    fed?;
    written
}

/// Upload a finished archive to the public tier under a fresh key.
///
/// If the upload fails or is cancelled, whatever reached the key is deleted.
pub(crate) async fn upload_archive(
    tiers: &TierManager,
    file: std::fs::File,
    cancel: &CancellationToken,
) -> AppResult<String> {
    if cancel.is_cancelled() {
        return Err(AppError::cancelled("Export cancelled"));
    }

    let key = format!("archives/{}.zip", Uuid::new_v4());
    let public = tiers.public();
    let stream: ByteStream = Box::pin(ReaderStream::new(tokio::fs::File::from_std(file)));

    let uploaded = tokio::select! {
        result = public.write_stream(&key, stream) => result,
        () = cancel.cancelled() => Err(AppError::cancelled("Export cancelled")),
    };

    match uploaded {
        Ok(bytes) => {
            debug!(key = %key, bytes, "Archive uploaded");
            Ok(key)
        }
        Err(e) => {
            if let Err(cleanup) = public.delete(&key).await {
                warn!(key = %key, error = %cleanup, "Failed to remove partial archive");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stash_core::types::UserId;
    use stash_entity::node::{FilePayload, Interval, NodeKind};

    fn node(name: &str, parent: Option<NodeId>, kind: NodeKind) -> Node {
        Node {
            id: NodeId::new(),
            owner_id: UserId::new(),
            parent_id: parent,
            name: name.into(),
            is_root: false,
            interval: Interval::ROOT,
            kind,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn file(name: &str, parent: NodeId) -> Node {
        node(name, Some(parent), NodeKind::File(FilePayload::local(name, None, 1)))
    }

    #[test]
    fn test_plan_paths_and_skips_trashed_chains() {
        let top = node("top", None, NodeKind::Folder);
        let a = node("A", Some(top.id), NodeKind::Folder);
        let x = file("x.txt", a.id);
        let mut gone = node("gone", Some(top.id), NodeKind::Folder);
        gone.deleted_at = Some(Utc::now());
        let hidden = file("hidden.txt", gone.id);
        let y = file("y.txt", top.id);

        let mut plan = EntryPlan::default();
        plan.add_tree(&top, "", vec![a, x, gone, hidden, y]);
        let paths: Vec<String> = plan.into_entries().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["A/x.txt".to_string(), "y.txt".to_string()]);
    }

    #[test]
    fn test_duplicate_names_get_suffixes() {
        let top = node("top", None, NodeKind::Folder);
        let mut plan = EntryPlan::default();
        plan.add_file("docs/a.txt", file("a.txt", top.id));
        plan.add_file("docs/a.txt", file("a.txt", top.id));
        plan.add_file("docs/a.txt", file("a.txt", top.id));
        plan.add_file("README", file("README", top.id));
        plan.add_file("README", file("README", top.id));

        let paths: Vec<String> = plan.into_entries().into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec!["docs/a.txt", "docs/a (1).txt", "docs/a (2).txt", "README", "README (1)"]
        );
    }
}
