//! Tier manager: routes operations to the provider backing each tier.

use std::sync::Arc;

use tracing::info;

use stash_core::config::{CloudProviderKind, StorageConfig};
use stash_core::error::AppError;
use stash_core::result::AppResult;
use stash_core::traits::storage::StorageProvider;
use stash_core::types::Tier;

use crate::providers::{LocalStorageProvider, MemoryStorageProvider};

/// Holds the three storage tiers and knows how public keys map to URLs.
#[derive(Debug, Clone)]
pub struct TierManager {
    local: Arc<dyn StorageProvider>,
    cloud: Arc<dyn StorageProvider>,
    public: Arc<dyn StorageProvider>,
    base_url: String,
}

impl TierManager {
    /// Assemble a manager from already-built providers.
    pub fn new(
        local: Arc<dyn StorageProvider>,
        cloud: Arc<dyn StorageProvider>,
        public: Arc<dyn StorageProvider>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            local,
            cloud,
            public,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build every tier from configuration.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let local: Arc<dyn StorageProvider> =
            Arc::new(LocalStorageProvider::new(&config.local.root_path).await?);
        let public: Arc<dyn StorageProvider> =
            Arc::new(LocalStorageProvider::new(&config.public.root_path).await?);

        let cloud: Arc<dyn StorageProvider> = match config.cloud.provider {
            CloudProviderKind::Local => {
                Arc::new(LocalStorageProvider::new(&config.cloud.root_path).await?)
            }
            CloudProviderKind::Memory => Arc::new(MemoryStorageProvider::new()),
            #[cfg(feature = "s3")]
            CloudProviderKind::S3 => {
                Arc::new(crate::providers::S3StorageProvider::new(&config.cloud.s3).await?)
            }
            #[cfg(not(feature = "s3"))]
            CloudProviderKind::S3 => {
                return Err(AppError::configuration(
                    "storage.cloud.provider = \"s3\" requires the `s3` feature",
                ));
            }
        };

        info!(
            local = %config.local.root_path,
            cloud = cloud.provider_type(),
            public = %config.public.root_path,
            "Storage tiers initialized"
        );

        Ok(Self::new(local, cloud, public, &config.public.base_url))
    }

    /// Provider for a tier.
    pub fn get(&self, tier: Tier) -> &Arc<dyn StorageProvider> {
        match tier {
            Tier::Local => &self.local,
            Tier::Cloud => &self.cloud,
            Tier::Public => &self.public,
        }
    }

    /// The public tier.
    pub fn public(&self) -> &Arc<dyn StorageProvider> {
        &self.public
    }

    /// URL at which a public-tier key can be fetched.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }

    /// Report the health of every tier.
    pub async fn health_check(&self) -> AppResult<()> {
        for tier in [Tier::Local, Tier::Cloud, Tier::Public] {
            if !self.get(tier).health_check().await? {
                return Err(AppError::storage(format!("Storage tier {tier} is unhealthy")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_routes_by_tier() {
        let local = MemoryStorageProvider::new();
        let cloud = MemoryStorageProvider::new();
        let public = MemoryStorageProvider::new();
        let tiers = TierManager::new(
            Arc::new(local.clone()),
            Arc::new(cloud.clone()),
            Arc::new(public.clone()),
            "https://cdn.example.com/pub/",
        );

        tiers
            .get(Tier::Cloud)
            .write("files/x", Bytes::from("c"))
            .await
            .unwrap();
        assert_eq!(cloud.len(), 1);
        assert!(local.is_empty());
        assert!(public.is_empty());

        assert_eq!(
            tiers.public_url("archives/a.zip"),
            "https://cdn.example.com/pub/archives/a.zip"
        );
        tiers.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_from_config_with_memory_cloud() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StorageConfig::default();
        config.local.root_path = dir.path().join("local").to_string_lossy().into_owned();
        config.public.root_path = dir.path().join("public").to_string_lossy().into_owned();
        config.cloud.provider = CloudProviderKind::Memory;

        let tiers = TierManager::from_config(&config).await.unwrap();
        assert_eq!(tiers.get(Tier::Local).provider_type(), "local");
        assert_eq!(tiers.get(Tier::Cloud).provider_type(), "memory");
        assert!(dir.path().join("public").is_dir());
    }
}
