//! Trash lifecycle commands.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use stash_core::error::AppError;
use stash_core::result::AppResult;
use stash_service::PurgeReport;

use super::App;
use crate::output::{self, OutputFormat};

/// Arguments for `trash`
#[derive(Debug, Args)]
pub struct TrashArgs {
    /// Node paths or ids
    #[arg(required_unless_present = "all")]
    pub nodes: Vec<String>,
    /// Trash every live child of this folder instead
    #[arg(long, value_name = "FOLDER", conflicts_with = "nodes")]
    pub all: Option<String>,
}

/// Arguments for `restore`
#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Trashed node ids
    #[arg(required_unless_present = "all")]
    pub nodes: Vec<String>,
    /// Restore everything in the trash
    #[arg(long, conflicts_with = "nodes")]
    pub all: bool,
}

/// Arguments for `purge`
#[derive(Debug, Args)]
pub struct PurgeArgs {
    /// Trashed node ids
    #[arg(required_unless_present = "all")]
    pub nodes: Vec<String>,
    /// Empty the whole trash
    #[arg(long, conflicts_with = "nodes")]
    pub all: bool,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Purge summary row
#[derive(Debug, Serialize, Tabled)]
struct PurgeRow {
    /// Nodes removed
    purged: usize,
    /// Nodes left in place
    skipped: usize,
    /// Payloads that could not be deleted
    storage_failures: usize,
}

impl From<&PurgeReport> for PurgeRow {
    fn from(report: &PurgeReport) -> Self {
        Self {
            purged: report.purged,
            skipped: report.skipped,
            storage_failures: report.storage_failures,
        }
    }
}

pub async fn trash(args: &TrashArgs, app: &App, who: Option<&str>) -> AppResult<()> {
    let ctx = app.context(who).await?;

    let count = match &args.all {
        Some(folder) => {
            let folder = app.node(&ctx, folder).await?;
            app.trash.trash_all(&ctx, folder.id).await?
        }
        None => {
            let mut count = 0;
            for id in app.node_ids(&ctx, &args.nodes).await? {
                count += app.trash.trash(&ctx, id).await?.len();
            }
            count
        }
    };

    output::print_success(&format!("{count} node(s) moved to the trash"));
    Ok(())
}

pub async fn list(app: &App, who: Option<&str>, format: OutputFormat) -> AppResult<()> {
    let ctx = app.context(who).await?;
    let trashed = app.trash.list_trash(&ctx).await?;
    output::print_nodes(&trashed, format);
    Ok(())
}

pub async fn restore(args: &RestoreArgs, app: &App, who: Option<&str>) -> AppResult<()> {
    let ctx = app.context(who).await?;

    let count = if args.all {
        app.trash.restore_all(&ctx).await?
    } else {
        let mut count = 0;
        for id in app.node_ids(&ctx, &args.nodes).await? {
            count += app.trash.restore(&ctx, id).await?.len();
        }
        count
    };

    output::print_success(&format!("{count} node(s) restored"));
    Ok(())
}

pub async fn purge(args: &PurgeArgs, app: &App, who: Option<&str>, format: OutputFormat) -> AppResult<()> {
    let ctx = app.context(who).await?;

    if !args.yes {
        let prompt = if args.all {
            "Permanently delete everything in the trash?".to_string()
        } else {
            format!("Permanently delete {} node(s)?", args.nodes.len())
        };
        let confirm = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if args.all {
        let report = app.trash.purge_all(&ctx).await?;

        match format {
            OutputFormat::Table => output::print_list(&[PurgeRow::from(&report)], format),
            OutputFormat::Json => output::print_item(&report, format),
        }
        if report.storage_failures > 0 {
            output::print_warning("Some payloads could not be deleted; see the log for keys");
        }
        return Ok(());
    }

    let ids = app.node_ids(&ctx, &args.nodes).await?;
    let mut purged = 0;
    let mut failure = None;
    for id in ids {
        match app.trash.purge(&ctx, id).await {
            Ok(_) => purged += 1,
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    output::print_success(&format!("{purged} node(s) purged"));
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
