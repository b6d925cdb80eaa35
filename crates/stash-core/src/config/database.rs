//! Metadata database configuration.

use serde::{Deserialize, Serialize};

/// SQLite metadata database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file, created on first open.
    /// `None` keeps the database purely in memory.
    #[serde(default = "default_path")]
    pub path: Option<String>,
    /// How long to wait for the connection, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

fn default_path() -> Option<String> {
    Some("./data/stash.db".to_string())
}

fn default_connect_timeout() -> u64 {
    10
}
