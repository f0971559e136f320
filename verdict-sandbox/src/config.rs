//! Engine configuration

use crate::error::ConfigError;
use crate::limits::SandboxLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV: &str = "VERDICT_CONFIG";

/// Smallest heap ceiling an isolate can start with.
pub const MIN_HEAP_BYTES: usize = 8 * 1024 * 1024;

/// Engine configuration
///
/// ```toml
/// maxConcurrentSandboxes = 4
///
/// [sandbox]
/// timeoutMs = 250
/// maxHeapBytes = 33554432
/// allowedCapabilities = ["structuredData", "math", "strings"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Limits applied to every call
    #[serde(default)]
    pub sandbox: SandboxLimits,

    /// Isolates allowed to be alive at once
    #[serde(default = "EngineConfig::default_max_concurrent_sandboxes")]
    pub max_concurrent_sandboxes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sandbox: SandboxLimits::default(),
            max_concurrent_sandboxes: Self::default_max_concurrent_sandboxes(),
        }
    }
}

impl EngineConfig {
    fn default_max_concurrent_sandboxes() -> usize {
        8
    }

    /// Load from `path`, else from `$VERDICT_CONFIG`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        };
        match path {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("No engine config given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sandbox.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "sandbox.timeoutMs must be greater than zero".to_string(),
            ));
        }
        if self.sandbox.max_heap_bytes < MIN_HEAP_BYTES {
            return Err(ConfigError::Invalid(format!(
                "sandbox.maxHeapBytes must be at least {} bytes",
                MIN_HEAP_BYTES
            )));
        }
        if self.max_concurrent_sandboxes == 0 {
            return Err(ConfigError::Invalid(
                "maxConcurrentSandboxes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Engine on the V8 runtime with a fresh stats store
    #[cfg(feature = "v8")]
    pub fn build_engine(&self) -> crate::ExecutionEngine {
        crate::ExecutionEngine::with_stats(
            std::sync::Arc::new(crate::V8Runtime::with_max_concurrent(
                self.max_concurrent_sandboxes,
            )),
            std::sync::Arc::new(crate::StatsRecorder::new()),
            self.sandbox.clone(),
        )
    }

    /// In-memory validation service on the V8 runtime
    #[cfg(feature = "v8")]
    pub fn build_service(&self) -> crate::ValidationService {
        crate::ValidationService::in_memory(self.build_engine())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Capability;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_parse_full() {
        let config = EngineConfig::from_toml_str(
            r#"
            maxConcurrentSandboxes = 2

            [sandbox]
            timeoutMs = 250
            maxHeapBytes = 16777216
            allowedCapabilities = ["structuredData", "regExp"]
            "#,
        )
        .unwrap();
        assert_eq!(config.max_concurrent_sandboxes, 2);
        assert_eq!(config.sandbox.timeout_ms, 250);
        assert_eq!(config.sandbox.max_heap_bytes, 16 * 1024 * 1024);
        assert!(config.sandbox.allows(Capability::RegExp));
        assert!(!config.sandbox.allows(Capability::Logging));
    }

    #[test]
    fn test_partial_sandbox_keeps_defaults() {
        let config = EngineConfig::from_toml_str("[sandbox]\ntimeoutMs = 50\n").unwrap();
        assert_eq!(config.sandbox.timeout_ms, 50);
        assert_eq!(config.sandbox.max_heap_bytes, SandboxLimits::default().max_heap_bytes);
        assert_eq!(config.max_concurrent_sandboxes, 8);
    }

    #[test]
    fn test_invalid_values() {
        assert_matches!(
            EngineConfig::from_toml_str("[sandbox]\ntimeoutMs = 0\n"),
            Err(ConfigError::Invalid(_))
        );
        assert_matches!(
            EngineConfig::from_toml_str("[sandbox]\nmaxHeapBytes = 1024\n"),
            Err(ConfigError::Invalid(_))
        );
        assert_matches!(
            EngineConfig::from_toml_str("maxConcurrentSandboxes = 0\n"),
            Err(ConfigError::Invalid(_))
        );
        assert_matches!(
            EngineConfig::from_toml_str("[sandbox]\nallowedCapabilities = [\"network\"]\n"),
            Err(ConfigError::Parse(_))
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "maxConcurrentSandboxes = 3").unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.max_concurrent_sandboxes, 3);
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/verdict.toml")).unwrap_err();
        assert_matches!(err, ConfigError::Read { .. });
    }
}
