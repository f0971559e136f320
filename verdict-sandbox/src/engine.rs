//! Execution engine
//!
//! Drives a [`Runtime`] and turns whatever happens into a [`ValidatedResult`]. Nothing escapes
//! as an error: sandbox failures become `isValid: false` with a fixed message, script text is
//! redacted, and every call made through [`ExecutionEngine::run`] is recorded in the stats.

use crate::error::{ContractError, SandboxError};
use crate::limits::SandboxLimits;
use crate::redact::redact;
use crate::runtime::Runtime;
use crate::sanitize::sanitize;
use crate::stats::StatsRecorder;
use crate::validator::validate;
use std::sync::Arc;
use std::time::Instant;
use verdict_common::{ExecutionInput, ValidatedResult};

const SECURITY_VIOLATION: &str = "Security violation: attempted to access restricted resources";

pub struct ExecutionEngine {
    runtime: Arc<dyn Runtime>,
    stats: Arc<StatsRecorder>,
    limits: SandboxLimits,
}

impl ExecutionEngine {
    /// Create an engine with default limits and its own stats store
    pub fn new(runtime: impl Runtime + 'static) -> Self {
        Self::with_stats(
            Arc::new(runtime),
            Arc::new(StatsRecorder::new()),
            SandboxLimits::default(),
        )
    }

    pub fn with_stats(
        runtime: Arc<dyn Runtime>,
        stats: Arc<StatsRecorder>,
        limits: SandboxLimits,
    ) -> Self {
        Self {
            runtime,
            stats,
            limits,
        }
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    pub fn stats(&self) -> &Arc<StatsRecorder> {
        &self.stats
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Run `script` for the registered `name` and record the outcome.
    ///
    /// A call counts as a success when the script judged the input valid.
    pub async fn run(&self, name: &str, script: &str, input: &ExecutionInput) -> ValidatedResult {
        let started = Instant::now();
        tracing::debug!(
            api = %name,
            request_id = %input.request_id,
            runtime = self.runtime.name(),
            "Executing validation"
        );

        let result = self.evaluate(script, input).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.stats.record(name, elapsed_ms, result.is_valid);

        tracing::debug!(
            api = %name,
            request_id = %input.request_id,
            is_valid = result.is_valid,
            elapsed_ms,
            "Validation finished"
        );
        result
    }

    /// Registration check: run `script` against a synthetic empty input through the same
    /// runtime, validator and sanitizer as [`run`](Self::run). Stats are not touched.
    ///
    /// A script that rejects the empty input is still accepted; only failures to produce a
    /// well-formed result are reported.
    pub async fn check(&self, script: &str) -> Result<ValidatedResult, ContractError> {
        let input = ExecutionInput::synthetic();
        match self.attempt(script, &input).await {
            Ok(result) => Ok(result),
            Err(Failure::Sandbox(err)) => Err(ContractError(self.describe(&err))),
            Err(Failure::Contract(err)) => Err(err),
        }
    }

    async fn evaluate(&self, script: &str, input: &ExecutionInput) -> ValidatedResult {
        match self.attempt(script, input).await {
            Ok(result) => result,
            Err(Failure::Contract(err)) => {
                tracing::warn!(error = %err, "Validation result rejected");
                ValidatedResult::invalid(err.0)
            }
            Err(Failure::Sandbox(err)) => {
                let message = self.describe(&err);
                tracing::warn!(error = %message, "Validation script failed");
                ValidatedResult::invalid(message)
            }
        }
    }

    async fn attempt(
        &self,
        script: &str,
        input: &ExecutionInput,
    ) -> Result<ValidatedResult, Failure> {
        let argument = serde_json::to_value(input)
            .map_err(|e| Failure::Sandbox(SandboxError::Unavailable(e.to_string())))?;
        let raw = self
            .runtime
            .execute(script, &argument, &self.limits)
            .await
            .map_err(Failure::Sandbox)?;
        let checked = validate(raw).map_err(Failure::Contract)?;

        Ok(ValidatedResult {
            is_valid: checked.is_valid,
            message: checked.message,
            data: checked.extra.as_ref().and_then(sanitize),
        })
    }

    /// Fixed, user-safe text for a sandbox failure. Only the runtime detail is script-derived,
    /// and it is redacted.
    fn describe(&self, err: &SandboxError) -> String {
        match err {
            SandboxError::Timeout { timeout_ms } => format!(
                "Execution timeout: code took too long to execute (max {}ms)",
                timeout_ms
            ),
            SandboxError::MemoryExceeded { max_heap_bytes } => format!(
                "Memory limit exceeded: execution used more than {} bytes",
                max_heap_bytes
            ),
            SandboxError::ResultTooLarge { max_nodes } => format!(
                "Memory limit exceeded: validation result holds more than {} values",
                max_nodes
            ),
            SandboxError::CapabilityViolation { name } => {
                tracing::warn!(global = %name, "Script reached for a restricted global");
                SECURITY_VIOLATION.to_string()
            }
            SandboxError::SyntaxOrRuntime { message } => {
                format!("Runtime error: {}", redact(message))
            }
            SandboxError::Unavailable(detail) => {
                tracing::error!(detail = %detail, "Sandbox unavailable");
                "Runtime error: sandbox unavailable".to_string()
            }
        }
    }
}

enum Failure {
    Sandbox(SandboxError),
    Contract(ContractError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScriptValue;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a canned outcome and remembers what it was called with
    struct StubRuntime {
        outcome: Result<ScriptValue, SandboxError>,
        seen: Mutex<Vec<serde_json::Value>>,
    }

    impl StubRuntime {
        fn returning(value: serde_json::Value) -> Self {
            Self {
                outcome: Ok(value.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: SandboxError) -> Self {
            Self {
                outcome: Err(err),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Runtime for StubRuntime {
        async fn execute(
            &self,
            _script: &str,
            input: &serde_json::Value,
            _limits: &SandboxLimits,
        ) -> Result<ScriptValue, SandboxError> {
            self.seen.lock().unwrap().push(input.clone());
            self.outcome.clone()
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn input() -> ExecutionInput {
        ExecutionInput::new(json!({}))
    }

    #[tokio::test]
    async fn test_valid_result_without_data() {
        let engine = ExecutionEngine::new(StubRuntime::returning(
            json!({"isValid": true, "message": "ok"}),
        ));
        let result = engine.run("api", "", &input()).await;
        assert_eq!(result, ValidatedResult::valid("ok"));
        assert!(result.data.is_none());

        let stats = engine.stats().get("api");
        assert_eq!(stats.total_executions, 1);
        assert_eq!(stats.success_count, 1);
    }

    #[tokio::test]
    async fn test_extra_keys_become_data() {
        let engine = ExecutionEngine::new(StubRuntime::returning(json!({
            "isValid": true,
            "message": "ok",
            "count": 42,
            "nested": {"value": "safe", "numbers": [1, 2, 3]}
        })));
        let result = engine.run("api", "", &input()).await;
        assert_eq!(
            result.data,
            Some(json!({"count": 42, "nested": {"value": "safe", "numbers": [1, 2, 3]}}))
        );
    }

    #[tokio::test]
    async fn test_denied_only_data_is_absent() {
        let engine = ExecutionEngine::new(StubRuntime::returning(json!({
            "isValid": false,
            "message": "no",
            "constructor": {"prototype": {"x": 1}}
        })));
        let result = engine.run("api", "", &input()).await;
        assert!(!result.is_valid);
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn test_contract_message_is_verbatim() {
        let engine = ExecutionEngine::new(StubRuntime::returning(json!({"isValid": "yes"})));
        let result = engine.run("api", "", &input()).await;
        assert!(!result.is_valid);
        assert_eq!(
            result.message,
            "Validation result must include \"isValid\" as a boolean"
        );
        assert_eq!(engine.stats().get("api").failure_count, 1);
    }

    #[tokio::test]
    async fn test_failure_templates() {
        let cases = [
            (
                SandboxError::Timeout { timeout_ms: 100 },
                "Execution timeout: code took too long to execute (max 100ms)",
            ),
            (
                SandboxError::MemoryExceeded {
                    max_heap_bytes: 1024,
                },
                "Memory limit exceeded: execution used more than 1024 bytes",
            ),
            (
                SandboxError::ResultTooLarge { max_nodes: 10 },
                "Memory limit exceeded: validation result holds more than 10 values",
            ),
            (
                SandboxError::CapabilityViolation {
                    name: "require".to_string(),
                },
                SECURITY_VIOLATION,
            ),
        ];
        for (err, expected) in cases {
            let engine = ExecutionEngine::new(StubRuntime::failing(err));
            let result = engine.run("api", "", &input()).await;
            assert!(!result.is_valid);
            assert_eq!(result.message, expected);
        }
    }

    #[tokio::test]
    async fn test_runtime_error_is_redacted() {
        let engine = ExecutionEngine::new(StubRuntime::failing(SandboxError::runtime(
            "Error: path /etc/passwd contacted 10.0.0.1 from a@b.com",
        )));
        let result = engine.run("api", "", &input()).await;
        assert_eq!(
            result.message,
            "Runtime error: Error: path [path] contacted [ip] from [email]"
        );
    }

    #[tokio::test]
    async fn test_script_receives_input() {
        let runtime = Arc::new(StubRuntime::returning(
            json!({"isValid": true, "message": "ok"}),
        ));
        let engine = ExecutionEngine::with_stats(
            runtime.clone(),
            Arc::new(StatsRecorder::new()),
            SandboxLimits::default(),
        );
        let input = ExecutionInput::new(json!({"email": "x"}));
        engine.run("api", "", &input).await;

        let seen = runtime.seen.lock().unwrap();
        assert_eq!(seen[0]["body"], json!({"email": "x"}));
        assert_eq!(seen[0]["requestId"], json!(input.request_id));
    }

    #[tokio::test]
    async fn test_check_does_not_touch_stats() {
        let engine = ExecutionEngine::new(StubRuntime::returning(
            json!({"isValid": false, "message": "Email is required"}),
        ));
        let result = engine.check("").await.unwrap();
        assert!(!result.is_valid);
        assert!(engine.stats().names().is_empty());
    }

    #[tokio::test]
    async fn test_check_reports_failures() {
        let engine = ExecutionEngine::new(StubRuntime::failing(SandboxError::runtime(
            "SyntaxError: Unexpected token '}'",
        )));
        let err = engine.check("").await.unwrap_err();
        assert_eq!(err.0, "Runtime error: SyntaxError: Unexpected token '}'");

        let engine = ExecutionEngine::new(StubRuntime::returning(json!([1])));
        let err = engine.check("").await.unwrap_err();
        assert!(err.0.contains("must return an object"));
    }
}
