//! Download staging command.

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use stash_core::result::AppResult;
use stash_service::{DownloadOutcome, DownloadRequest, ExportContext};

use super::{App, parse_id};
use crate::output::{self, OutputFormat};

/// Arguments for `export`
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Nodes to export: paths or ids in a folder view, ids in the shared view
    pub nodes: Vec<String>,
    /// Folder the selection was made in
    #[arg(long = "in", value_name = "FOLDER", default_value = "/", conflicts_with = "shared")]
    pub folder: String,
    /// Select from the files shared with me
    #[arg(long)]
    pub shared: bool,
    /// Export everything in the view
    #[arg(long)]
    pub all: bool,
}

pub async fn execute(args: &ExportArgs, app: &App, who: Option<&str>, format: OutputFormat) -> AppResult<()> {
    let ctx = app.context(who).await?;

    let (context, ids) = if args.shared {
        let ids = args
            .nodes
            .iter()
            .map(|n| parse_id(n))
            .collect::<AppResult<Vec<_>>>()?;
        (ExportContext::Shared, ids)
    } else {
        let folder = app.node(&ctx, &args.folder).await?;
        (ExportContext::Folder(folder.id), app.node_ids(&ctx, &args.nodes).await?)
    };
    let request = DownloadRequest {
        ids,
        all: args.all,
        context,
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling export");
            on_interrupt.cancel();
        }
    });
    let outcome = app.export.resolve_download(&ctx, &request, cancel).await;
    watcher.abort();
    let outcome = outcome?;

    if format == OutputFormat::Json {
        output::print_item(&outcome, format);
        return Ok(());
    }

    match outcome {
        DownloadOutcome::NothingSelected { message } => output::print_warning(&message),
        DownloadOutcome::EmptyFolder { name, .. } => {
            output::print_warning(&format!("Folder '{name}' is empty; nothing to download"));
        }
        DownloadOutcome::File { url, filename, size } => {
            output::print_success(&format!("'{filename}' staged ({size} bytes)"));
            output::print_kv("URL", &url);
        }
        DownloadOutcome::Archive {
            url,
            filename,
            entries,
        } => {
            output::print_success(&format!("'{filename}' built with {entries} file(s)"));
            output::print_kv("URL", &url);
        }
    }
    Ok(())
}
