//! Validation service - main entry point
//!
//! Wires the configuration store, the execution engine and its stats together the way a
//! calling layer (an HTTP handler, the CLI) needs them.

use crate::engine::ExecutionEngine;
use crate::error::{ServiceError, StoreError};
use crate::store::{ConfigStore, InMemoryConfigStore};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use verdict_common::{
    ApiConfig, ExecutionInput, ExecutionResponse, StatsReport, ENTRY_POINT, SUPPORTED_METHOD,
};

static ENTRY_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^function\s+{}\s*\(", ENTRY_POINT)).expect("pattern is a valid literal")
});

/// Registration and execution of named validations
pub struct ValidationService {
    engine: ExecutionEngine,
    store: Arc<dyn ConfigStore>,
}

impl ValidationService {
    pub fn new(engine: ExecutionEngine, store: Arc<dyn ConfigStore>) -> Self {
        Self { engine, store }
    }

    /// Service backed by a process-local store
    pub fn in_memory(engine: ExecutionEngine) -> Self {
        Self::new(engine, Arc::new(InMemoryConfigStore::new()))
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn runtime_name(&self) -> &str {
        self.engine.runtime_name()
    }

    /// Accept a new validation after running it once in the sandbox.
    pub async fn register(&self, mut config: ApiConfig) -> Result<ApiConfig, ServiceError> {
        config.name = config.name.trim().to_string();
        if config.name.is_empty() {
            return Err(ServiceError::InvalidConfig("API name is required".to_string()));
        }
        if !config.method.eq_ignore_ascii_case(SUPPORTED_METHOD) {
            return Err(ServiceError::InvalidConfig(format!(
                "Only {} is supported, got {}",
                SUPPORTED_METHOD, config.method
            )));
        }
        config.method = SUPPORTED_METHOD.to_string();

        if self.store.contains(&config.name).await {
            return Err(ServiceError::Conflict(config.name));
        }
        if !ENTRY_DECLARATION.is_match(config.custom_validation.trim()) {
            return Err(ServiceError::InvalidScript(format!(
                "script must declare function {}(data)",
                ENTRY_POINT
            )));
        }

        let outcome = self
            .engine
            .check(&config.custom_validation)
            .await
            .map_err(|e| ServiceError::InvalidScript(e.0))?;
        tracing::debug!(
            api = %config.name,
            is_valid = outcome.is_valid,
            "Registration check passed"
        );

        self.store.insert(config.clone()).await?;
        tracing::info!(api = %config.name, "Registered validation");
        Ok(config)
    }

    /// Run the validation registered as `name` against a request body.
    pub async fn execute(
        &self,
        name: &str,
        body: serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<ExecutionResponse, ServiceError> {
        let input = ExecutionInput::new(body).with_headers(headers.iter().copied());
        let config = match self.store.get(name).await {
            Some(config) => config,
            None => return Err(self.not_found(name).await),
        };

        let result = self
            .engine
            .run(&config.name, &config.custom_validation, &input)
            .await;
        Ok(ExecutionResponse::from_result(config.name, result))
    }

    /// Delete a validation and reset its stats.
    pub async fn remove(&self, name: &str) -> Result<ApiConfig, ServiceError> {
        match self.store.remove(name).await {
            Ok(config) => {
                self.engine.stats().reset(name);
                tracing::info!(api = %name, "Removed validation");
                Ok(config)
            }
            Err(StoreError::NotFound(_)) => Err(self.not_found(name).await),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, name: &str) -> Result<ApiConfig, ServiceError> {
        match self.store.get(name).await {
            Some(config) => Ok(config),
            None => Err(self.not_found(name).await),
        }
    }

    pub async fn list(&self) -> Vec<ApiConfig> {
        self.store.list().await
    }

    pub fn stats(&self, name: Option<&str>) -> StatsReport {
        self.engine.stats().get_stats(name)
    }

    async fn not_found(&self, name: &str) -> ServiceError {
        ServiceError::NotFound {
            name: name.to_string(),
            available: self.store.list().await.into_iter().map(|c| c.name).collect(),
        }
    }
}
