//! Sharing commands.

use clap::Args;

use stash_core::result::AppResult;
use stash_service::ShareOutcome;

use super::App;
use crate::output::{self, OutputFormat};

/// Arguments for `share`
#[derive(Debug, Args)]
pub struct ShareArgs {
    /// Grantee email
    #[arg(short, long)]
    pub with: String,
    /// File paths or ids
    pub files: Vec<String>,
}

/// Arguments for `unshare`
#[derive(Debug, Args)]
pub struct UnshareArgs {
    /// Grantee email
    #[arg(short, long)]
    pub with: String,
    /// File path or id
    pub file: String,
}

/// Arguments for `shared`
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct SharedArgs {
    /// Files other users shared with me
    #[arg(long)]
    pub with_me: bool,
    /// Files I shared with others
    #[arg(long)]
    pub by_me: bool,
}

pub async fn share(args: &ShareArgs, app: &App, who: Option<&str>, format: OutputFormat) -> AppResult<()> {
    let ctx = app.context(who).await?;
    let ids = app.node_ids(&ctx, &args.files).await?;
    let outcome = app.shares.share(&ctx, &ids, &args.with).await?;

    if format == OutputFormat::Json {
        output::print_item(&outcome, format);
        return Ok(());
    }

    match outcome {
        ShareOutcome::NothingSelected { message } => output::print_warning(&message),
        ShareOutcome::UnknownGrantee { email } => {
            output::print_warning(&format!("No user is registered as '{email}'; nothing shared"));
        }
        ShareOutcome::Shared {
            requested,
            newly_granted,
            ..
        } => output::print_success(&format!(
            "Shared {requested} file(s) with {} ({newly_granted} new)",
            args.with
        )),
    }
    Ok(())
}

pub async fn unshare(args: &UnshareArgs, app: &App, who: Option<&str>) -> AppResult<()> {
    let ctx = app.context(who).await?;
    let file = app.node(&ctx, &args.file).await?;

    if app.shares.unshare(&ctx, file.id, &args.with).await? {
        output::print_success(&format!("'{}' is no longer shared with {}", file.name, args.with));
    } else {
        output::print_warning(&format!("'{}' was not shared with {}", file.name, args.with));
    }
    Ok(())
}

pub async fn shared(args: &SharedArgs, app: &App, who: Option<&str>, format: OutputFormat) -> AppResult<()> {
    let ctx = app.context(who).await?;
    let nodes = if args.with_me {
        app.shares.shared_with_me(&ctx).await?
    } else {
        app.shares.shared_by_me(&ctx).await?
    };
    output::print_nodes(&nodes, format);
    Ok(())
}
