//! Storage tier configuration.

use serde::{Deserialize, Serialize};

/// Top-level storage configuration: one section per tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Fast, ephemeral tier where uploads land first.
    pub local: LocalTierConfig,
    /// Durable tier the external upload job migrates payloads to.
    pub cloud: CloudTierConfig,
    /// Staging tier whose objects are fetchable by URL.
    pub public: PublicTierConfig,
}

/// Local tier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalTierConfig {
    /// Root path for local file storage.
    #[serde(default = "default_local_root")]
    pub root_path: String,
}

impl Default for LocalTierConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
        }
    }
}

/// Which provider backs the cloud tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudProviderKind {
    /// A directory on the local filesystem (development setups).
    Local,
    /// Process memory; contents are lost on exit.
    Memory,
    /// An S3-compatible bucket (requires the `s3` feature of `stash-storage`).
    S3,
}

/// Cloud tier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudTierConfig {
    /// Provider backing the tier.
    #[serde(default = "default_cloud_provider")]
    pub provider: CloudProviderKind,
    /// Root path when `provider = "local"`.
    #[serde(default = "default_cloud_root")]
    pub root_path: String,
    /// S3 settings when `provider = "s3"`.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for CloudTierConfig {
    fn default() -> Self {
        Self {
            provider: default_cloud_provider(),
            root_path: default_cloud_root(),
            s3: S3StorageConfig::default(),
        }
    }
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StorageConfig {
    /// S3 endpoint URL (for non-AWS services like MinIO). Empty = AWS.
    #[serde(default)]
    pub endpoint: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// S3 bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
        }
    }
}

/// Public staging tier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicTierConfig {
    /// Root path the public tier writes into.
    #[serde(default = "default_public_root")]
    pub root_path: String,
    /// Base URL under which `root_path` is served.
    #[serde(default = "default_public_base_url")]
    pub base_url: String,
}

impl Default for PublicTierConfig {
    fn default() -> Self {
        Self {
            root_path: default_public_root(),
            base_url: default_public_base_url(),
        }
    }
}

fn default_local_root() -> String {
    "./data/storage/local".to_string()
}

fn default_cloud_provider() -> CloudProviderKind {
    CloudProviderKind::Local
}

fn default_cloud_root() -> String {
    "./data/storage/cloud".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_public_root() -> String {
    "./data/storage/public".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080/public".to_string()
}
