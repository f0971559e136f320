//! Runtime trait and implementations

#[cfg(feature = "v8")]
pub mod v8;

use crate::error::SandboxResult;
use crate::limits::SandboxLimits;
use crate::value::ScriptValue;
use async_trait::async_trait;

#[cfg(feature = "v8")]
pub use v8::V8Runtime;

/// Isolated execution of one validation script against one input
///
/// Implementations build a fresh context per call, bind `input` as the single argument of the
/// script's entry point, call it once and hand back whatever it returned. Nothing survives
/// between calls.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Execute `script` and return its raw result
    async fn execute(
        &self,
        script: &str,
        input: &serde_json::Value,
        limits: &SandboxLimits,
    ) -> SandboxResult<ScriptValue>;

    /// Get runtime name
    fn name(&self) -> &str;
}
