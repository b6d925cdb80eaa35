//! Tree browsing and editing commands.

use std::path::PathBuf;

use bytes::Bytes;
use clap::Args;

use stash_core::error::{AppError, ErrorKind};
use stash_core::result::AppResult;

use super::{App, parse_id};
use crate::output::{self, OutputFormat};

/// Arguments for `ls`
#[derive(Debug, Args)]
pub struct LsArgs {
    /// Folder path or id
    #[arg(default_value = "/")]
    pub folder: String,
}

/// Arguments for `mkdir`
#[derive(Debug, Args)]
pub struct MkdirArgs {
    /// Parent folder path or id
    pub parent: String,
    /// New folder name
    pub name: String,
}

/// Arguments for `put`
#[derive(Debug, Args)]
pub struct PutArgs {
    /// Local file to add
    pub file: PathBuf,
    /// Target folder path or id
    #[arg(default_value = "/")]
    pub folder: String,
    /// Override file name
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for `search`
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Case-insensitive name fragment
    pub term: String,
    /// Only starred files
    #[arg(long)]
    pub starred: bool,
}

/// Arguments for `star`
#[derive(Debug, Args)]
pub struct StarArgs {
    /// File id; owned files may also be given by path
    pub file: String,
}

/// Arguments for `complete-upload`
#[derive(Debug, Args)]
pub struct CompleteUploadArgs {
    /// File id
    pub file: String,
    /// Key of the payload on the cloud tier, if it differs
    #[arg(long)]
    pub key: Option<String>,
}

pub async fn ls(args: &LsArgs, app: &App, who: Option<&str>, format: OutputFormat) -> AppResult<()> {
    let ctx = app.context(who).await?;
    let folder = app.node(&ctx, &args.folder).await?;
    let children = app.nodes.list_children(&ctx, folder.id).await?;
    output::print_nodes(&children, format);
    Ok(())
}

pub async fn mkdir(args: &MkdirArgs, app: &App, who: Option<&str>) -> AppResult<()> {
    let ctx = app.context(who).await?;
    let parent = app.node(&ctx, &args.parent).await?;
    let folder = app.nodes.create_folder(&ctx, parent.id, &args.name).await?;

    output::print_success(&format!("Folder '{}' created (id: {})", folder.name, folder.id));
    Ok(())
}

pub async fn put(args: &PutArgs, app: &App, who: Option<&str>) -> AppResult<()> {
    let ctx = app.context(who).await?;
    let folder = app.node(&ctx, &args.folder).await?;

    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .ok_or_else(|| {
                AppError::validation(format!("Cannot name '{}'; pass --name", args.file.display()))
            })?,
    };
    let content = tokio::fs::read(&args.file).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Validation,
            format!("Cannot read {}", args.file.display()),
            e,
        )
    })?;
    let mime = mime_guess::from_path(&name)
        .first()
        .map(|m| m.essence_str().to_string());

    let file = app
        .nodes
        .create_file(&ctx, folder.id, &name, Bytes::from(content), mime)
        .await?;

    let size = file.payload().map(|p| p.size).unwrap_or_default();
    output::print_success(&format!(
        "File '{}' added (id: {}, size: {} bytes)",
        file.name, file.id, size
    ));
    Ok(())
}

pub async fn search(
    args: &SearchArgs,
    app: &App,
    who: Option<&str>,
    format: OutputFormat,
) -> AppResult<()> {
    let ctx = app.context(who).await?;
    let found = app.nodes.search(&ctx, &args.term, args.starred).await?;
    output::print_nodes(&found, format);
    Ok(())
}

pub async fn star(args: &StarArgs, app: &App, who: Option<&str>) -> AppResult<()> {
    let ctx = app.context(who).await?;
    // Shared files are not resolvable by path, only by id.
    let id = match parse_id(&args.file) {
        Ok(id) => id,
        Err(_) => app.node(&ctx, &args.file).await?.id,
    };

    let starred = app.stars.toggle(&ctx, id).await?;

    if starred {
        output::print_success("Starred");
    } else {
        output::print_success("Unstarred");
    }
    Ok(())
}

/// Not scoped to a user: the upload job acts on any file.
pub async fn complete_upload(args: &CompleteUploadArgs, app: &App) -> AppResult<()> {
    let id = parse_id(&args.file)?;
    let file = app.nodes.complete_cloud_upload(id, args.key.clone()).await?;

    output::print_success(&format!("'{}' is now served from the cloud tier", file.name));
    Ok(())
}
