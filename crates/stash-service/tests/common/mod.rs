//! Shared fixture for the service integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use stash_core::config::{ExportConfig, TrashConfig};
use stash_core::events::ShareNotice;
use stash_core::traits::{ShareNotifier, StorageProvider};
use stash_database::Database;
use stash_database::repositories::{NodeRepository, ShareRepository, StarRepository, UserRepository};
use stash_entity::node::Node;
use stash_entity::user::NewUser;
use stash_service::{
    ExportService, NodeService, RequestContext, ShareService, StarService, TrashService,
    UserService,
};
use stash_storage::TierManager;
use stash_storage::providers::{LocalStorageProvider, MemoryStorageProvider};

pub const BASE_URL: &str = "http://files.test/public";

/// Collects every notice instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<ShareNotice>>,
}

#[async_trait]
impl ShareNotifier for RecordingNotifier {
    async fn notify_share(&self, notice: ShareNotice) {
        self.notices.lock().await.push(notice);
    }
}

/// Use a memory store as a tier unchanged.
pub fn plain(provider: MemoryStorageProvider) -> Arc<dyn StorageProvider> {
    Arc::new(provider)
}

pub struct Harness {
    _dir: tempfile::TempDir,
    pub db: Database,
    pub node_repo: Arc<NodeRepository>,
    pub local: LocalStorageProvider,
    pub cloud: MemoryStorageProvider,
    pub public: MemoryStorageProvider,
    pub notifier: Arc<RecordingNotifier>,
    pub users: UserService,
    pub nodes: NodeService,
    pub trash: TrashService,
    pub stars: StarService,
    pub shares: ShareService,
    pub export: ExportService,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(TrashConfig::default(), ExportConfig::default()).await
    }

    pub async fn with_config(trash: TrashConfig, export: ExportConfig) -> Self {
        Self::with_providers(trash, export, plain, plain).await
    }

    /// Build the fixture with the cloud and public tiers wrapped by the
    /// given functions. `cloud` and `public` still expose the inner stores.
    pub async fn with_providers(
        trash: TrashConfig,
        export: ExportConfig,
        wrap_cloud: impl FnOnce(MemoryStorageProvider) -> Arc<dyn StorageProvider>,
        wrap_public: impl FnOnce(MemoryStorageProvider) -> Arc<dyn StorageProvider>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalStorageProvider::new(dir.path().join("local").to_str().unwrap())
            .await
            .unwrap();
        let cloud = MemoryStorageProvider::new();
        let public = MemoryStorageProvider::new();
        let tiers = Arc::new(TierManager::new(
            Arc::new(local.clone()),
            wrap_cloud(cloud.clone()),
            wrap_public(public.clone()),
            BASE_URL,
        ));

        let db = Database::in_memory().await.unwrap();
        let node_repo = Arc::new(NodeRepository::new(db.clone()));
        let share_repo = Arc::new(ShareRepository::new(db.clone()));
        let star_repo = Arc::new(StarRepository::new(db.clone()));
        let user_repo = Arc::new(UserRepository::new(db.clone()));
        let notifier = Arc::new(RecordingNotifier::default());

        Self {
            _dir: dir,
            users: UserService::new(user_repo.clone()),
            nodes: NodeService::new(node_repo.clone(), star_repo.clone(), tiers.clone()),
            trash: TrashService::new(node_repo.clone(), tiers.clone(), trash),
            stars: StarService::new(star_repo),
            shares: ShareService::new(
                share_repo.clone(),
                user_repo,
                node_repo.clone(),
                notifier.clone(),
            ),
            export: ExportService::new(node_repo.clone(), share_repo, tiers, export),
            db,
            node_repo,
            local,
            cloud,
            public,
            notifier,
        }
    }

    /// Register a user named `name` with email `<name>@example.com`.
    pub async fn user(&self, name: &str) -> (RequestContext, Node) {
        let (user, root) = self
            .users
            .register(NewUser {
                email: format!("{name}@example.com"),
                name: name.to_string(),
            })
            .await
            .unwrap();
        (RequestContext::new(user.id), root)
    }

    pub async fn folder(&self, ctx: &RequestContext, parent: &Node, name: &str) -> Node {
        self.nodes.create_folder(ctx, parent.id, name).await.unwrap()
    }

    pub async fn file(&self, ctx: &RequestContext, parent: &Node, name: &str, body: &str) -> Node {
        self.nodes
            .create_file(ctx, parent.id, name, Bytes::from(body.to_string()), None)
            .await
            .unwrap()
    }

    /// Move a file's payload to the cloud tier the way the upload job does.
    pub async fn migrate_to_cloud(&self, file: &Node) -> Node {
        let payload = file.payload().unwrap();
        let data = self.local.read_bytes(&payload.storage_path).await.unwrap();
        let cloud_key = format!("cloud/{}", payload.storage_path);
        self.cloud.write(&cloud_key, data).await.unwrap();
        self.local.delete(&payload.storage_path).await.unwrap();
        self.nodes
            .complete_cloud_upload(file.id, Some(cloud_key))
            .await
            .unwrap()
    }

    /// Public-tier key behind a URL returned by the exporter.
    pub fn key_of(url: &str) -> &str {
        url.strip_prefix(BASE_URL)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap()
    }

    pub fn archive_keys(&self) -> Vec<String> {
        self.public
            .keys()
            .into_iter()
            .filter(|k| k.starts_with("archives/"))
            .collect()
    }

    /// Entry names and contents of an archive on the public tier.
    pub async fn read_archive(&self, url: &str) -> Vec<(String, String)> {
        let bytes = self.public.read_bytes(Self::key_of(url)).await.unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let names: BTreeSet<String> = archive.file_names().map(String::from).collect();

        let mut entries = Vec::new();
        for name in names {
            let mut body = String::new();
            archive.by_name(&name).unwrap().read_to_string(&mut body).unwrap();
            entries.push((name, body));
        }
        entries
    }
}
