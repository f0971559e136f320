//! Configuration store seam
//!
//! The engine never owns configuration records; it reads them through this trait.

use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use verdict_common::ApiConfig;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, name: &str) -> Option<ApiConfig>;

    /// Insert a new record; fails if the name is taken.
    async fn insert(&self, config: ApiConfig) -> Result<(), StoreError>;

    async fn remove(&self, name: &str) -> Result<ApiConfig, StoreError>;

    /// All records, sorted by name
    async fn list(&self) -> Vec<ApiConfig>;

    async fn contains(&self, name: &str) -> bool {
        self.get(name).await.is_some()
    }

    async fn len(&self) -> usize {
        self.list().await.len()
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    configs: RwLock<HashMap<String, ApiConfig>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get(&self, name: &str) -> Option<ApiConfig> {
        self.configs.read().await.get(name).cloned()
    }

    async fn insert(&self, config: ApiConfig) -> Result<(), StoreError> {
        let mut configs = self.configs.write().await;
        if configs.contains_key(&config.name) {
            return Err(StoreError::AlreadyExists(config.name));
        }
        configs.insert(config.name.clone(), config);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<ApiConfig, StoreError> {
        self.configs
            .write()
            .await
            .remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn list(&self) -> Vec<ApiConfig> {
        let mut configs: Vec<ApiConfig> = self.configs.read().await.values().cloned().collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    async fn contains(&self, name: &str) -> bool {
        self.configs.read().await.contains_key(name)
    }

    async fn len(&self) -> usize {
        self.configs.read().await.len()
    }
}
