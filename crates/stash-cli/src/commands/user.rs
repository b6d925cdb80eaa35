//! User management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use stash_core::error::AppError;
use stash_core::result::AppResult;
use stash_entity::user::{NewUser, User};

use super::App;
use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Register a user and create their root folder
    Add {
        /// Email
        #[arg(short, long)]
        email: String,
        /// Display name (will prompt if not provided)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List all users
    List,
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    /// User ID
    id: String,
    /// Email
    email: String,
    /// Name
    name: String,
    /// Created at
    created_at: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            created_at: user.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute user commands
pub async fn execute(args: &UserArgs, app: &App, format: OutputFormat) -> AppResult<()> {
    match &args.command {
        UserCommand::Add { email, name } => {
            let name = match name {
                Some(n) => n.clone(),
                None => dialoguer::Input::new()
                    .with_prompt("Display name")
                    .interact_text()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?,
            };

            let (user, root) = app
                .users
                .register(NewUser {
                    email: email.clone(),
                    name,
                })
                .await?;

            output::print_success(&format!("User '{}' registered (id: {})", user.email, user.id));
            output::print_kv("Root folder", &root.id.to_string());
        }
        UserCommand::List => {
            let users = app.users.list().await?;
            let rows: Vec<UserRow> = users.iter().map(UserRow::from).collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
