//! CLI command definitions and dispatch.

pub mod export;
pub mod node;
pub mod share;
pub mod trash;
pub mod user;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use stash_core::config::AppConfig;
use stash_core::error::AppError;
use stash_core::result::AppResult;
use stash_core::types::NodeId;
use stash_database::Database;
use stash_database::repositories::{NodeRepository, ShareRepository, StarRepository, UserRepository};
use stash_entity::node::Node;
use stash_service::{
    ExportService, LoggingNotifier, NodeService, RequestContext, ShareService, StarService,
    TrashService, UserService,
};
use stash_storage::TierManager;

use crate::output::OutputFormat;

/// Stash: per-user file trees over tiered storage
#[derive(Debug, Parser)]
#[command(name = "stash", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/stash.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Email of the user to act as
    #[arg(short = 'u', long = "as", global = true)]
    pub as_user: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// User management
    User(user::UserArgs),
    /// List a folder
    Ls(node::LsArgs),
    /// Create a folder
    Mkdir(node::MkdirArgs),
    /// Add a local file to a folder
    Put(node::PutArgs),
    /// Search by name
    Search(node::SearchArgs),
    /// Star or unstar a file
    Star(node::StarArgs),
    /// Mark a file as migrated to the cloud tier
    CompleteUpload(node::CompleteUploadArgs),
    /// Move nodes to the trash
    Trash(trash::TrashArgs),
    /// List the trash
    TrashList,
    /// Restore trashed nodes
    Restore(trash::RestoreArgs),
    /// Permanently delete trashed nodes
    Purge(trash::PurgeArgs),
    /// Share files with another user
    Share(share::ShareArgs),
    /// Revoke a share
    Unshare(share::UnshareArgs),
    /// List shared files
    Shared(share::SharedArgs),
    /// Stage a file or archive for download
    Export(export::ExportArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        let app = App::open(config).await?;
        let who = self.as_user.as_deref();

        let result = match &self.command {
            Commands::User(args) => user::execute(args, &app, self.format).await,
            Commands::Ls(args) => node::ls(args, &app, who, self.format).await,
            Commands::Mkdir(args) => node::mkdir(args, &app, who).await,
            Commands::Put(args) => node::put(args, &app, who).await,
            Commands::Search(args) => node::search(args, &app, who, self.format).await,
            Commands::Star(args) => node::star(args, &app, who).await,
            Commands::CompleteUpload(args) => node::complete_upload(args, &app).await,
            Commands::Trash(args) => trash::trash(args, &app, who).await,
            Commands::TrashList => trash::list(&app, who, self.format).await,
            Commands::Restore(args) => trash::restore(args, &app, who).await,
            Commands::Purge(args) => trash::purge(args, &app, who, self.format).await,
            Commands::Share(args) => share::share(args, &app, who, self.format).await,
            Commands::Unshare(args) => share::unshare(args, &app, who).await,
            Commands::Shared(args) => share::shared(args, &app, who, self.format).await,
            Commands::Export(args) => export::execute(args, &app, who, self.format).await,
        };
        app.db.close().await;
        result
    }
}

/// Services wired over the configured database and storage tiers.
pub struct App {
    db: Database,
    pub users: UserService,
    pub nodes: NodeService,
    pub trash: TrashService,
    pub stars: StarService,
    pub shares: ShareService,
    pub export: ExportService,
}

impl App {
    /// Open the metadata database and storage tiers and build every service.
    pub async fn open(config: AppConfig) -> AppResult<Self> {
        let db = Database::open(&config.database).await?;
        let tiers = Arc::new(TierManager::from_config(&config.storage).await?);

        let node_repo = Arc::new(NodeRepository::new(db.clone()));
        let share_repo = Arc::new(ShareRepository::new(db.clone()));
        let star_repo = Arc::new(StarRepository::new(db.clone()));
        let user_repo = Arc::new(UserRepository::new(db.clone()));

        Ok(Self {
            users: UserService::new(user_repo.clone()),
            nodes: NodeService::new(node_repo.clone(), star_repo.clone(), tiers.clone()),
            trash: TrashService::new(node_repo.clone(), tiers.clone(), config.trash),
            stars: StarService::new(star_repo),
            shares: ShareService::new(
                share_repo.clone(),
                user_repo,
                node_repo.clone(),
                Arc::new(LoggingNotifier),
            ),
            export: ExportService::new(node_repo, share_repo, tiers, config.export),
            db,
        })
    }

    /// Context for the user named by `--as`.
    pub async fn context(&self, email: Option<&str>) -> AppResult<RequestContext> {
        let email = email.ok_or_else(|| {
            AppError::validation("This command needs a user: pass --as <email>")
        })?;
        let user = self.users.get_by_email(email).await?;
        Ok(RequestContext::new(user.id))
    }

    /// Resolve a node reference: a node id, or a `/`-separated path below
    /// the actor's root (empty or `/` for the root itself).
    pub async fn node(&self, ctx: &RequestContext, reference: &str) -> AppResult<Node> {
        match reference.parse::<NodeId>() {
            Ok(id) => self.nodes.get(ctx, id).await,
            Err(_) => self.nodes.resolve_by_path(ctx, reference).await,
        }
    }

    /// Resolve several node references into ids.
    pub async fn node_ids(&self, ctx: &RequestContext, references: &[String]) -> AppResult<Vec<NodeId>> {
        let mut ids = Vec::with_capacity(references.len());
        for reference in references {
            ids.push(self.node(ctx, reference).await?.id);
        }
        Ok(ids)
    }
}

/// Parse a bare node id, for nodes the actor does not own.
pub fn parse_id(value: &str) -> AppResult<NodeId> {
    value
        .parse()
        .map_err(|e| AppError::validation(format!("Invalid node id '{value}': {e}")))
}
