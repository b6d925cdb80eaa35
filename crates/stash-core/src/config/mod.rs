//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from an
//! optional TOML file overlaid with `STASH__`-prefixed environment variables.
//! Each sub-module represents a logical configuration section, and every
//! field carries a default so an empty source yields a usable configuration.

pub mod database;
pub mod export;
pub mod logging;
pub mod storage;
pub mod trash;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::export::{ArchiveCompression, ExportConfig};
pub use self::logging::LoggingConfig;
pub use self::storage::{CloudProviderKind, StorageConfig};
pub use self::trash::TrashConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Storage tier settings.
    pub storage: StorageConfig,
    /// Metadata database settings.
    pub database: DatabaseConfig,
    /// Trash lifecycle settings.
    pub trash: TrashConfig,
    /// Archive export settings.
    pub export: ExportConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// The file is optional. Values are overlaid with environment variables
    /// prefixed with `STASH__`, using `__` as the section separator
    /// (e.g. `STASH__STORAGE__PUBLIC__BASE_URL`).
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from(Path::new(path)).required(false))
            .add_source(
                config::Environment::with_prefix("STASH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert!(!config.trash.restore_cascades);
        assert_eq!(config.export.shared_archive_name, "shared");
        assert_eq!(config.storage.cloud.provider, CloudProviderKind::Local);
        assert_eq!(config.database.path.as_deref(), Some("./data/stash.db"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("stash-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stash.toml");
        std::fs::write(
            &path,
            "[database]\npath = \"/var/lib/stash/meta.db\"\n\n[trash]\nrestore_cascades = true\n\n[export]\ncompression = \"stored\"\n\n[storage.public]\nbase_url = \"https://cdn.example.com/pub\"\n",
        )
        .unwrap();

        let config = AppConfig::load(path.to_str().unwrap()).unwrap();
        assert!(config.trash.restore_cascades);
        assert_eq!(config.database.path.as_deref(), Some("/var/lib/stash/meta.db"));
        assert_eq!(config.database.connect_timeout_seconds, 10);
        assert_eq!(config.export.compression, ArchiveCompression::Stored);
        assert_eq!(config.storage.public.base_url, "https://cdn.example.com/pub");
        assert_eq!(config.storage.local.root_path, "./data/storage/local");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
