//! Common test utilities shared across the sandbox integration tests

#![allow(dead_code)]

use std::sync::Arc;
use verdict_common::ExecutionInput;
use verdict_sandbox::{ExecutionEngine, SandboxLimits, StatsRecorder, V8Runtime};

/// Generous deadline so slow CI machines don't turn ordinary scripts into timeouts
pub const RELAXED_TIMEOUT_MS: u64 = 5_000;

/// Setup logging for tests
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

pub fn relaxed_limits() -> SandboxLimits {
    SandboxLimits::default().with_timeout_ms(RELAXED_TIMEOUT_MS)
}

/// Engine on a real V8 runtime
pub fn engine(limits: SandboxLimits) -> ExecutionEngine {
    setup_test_logging();
    ExecutionEngine::with_stats(
        Arc::new(V8Runtime::with_max_concurrent(4)),
        Arc::new(StatsRecorder::new()),
        limits,
    )
}

/// Wrap a function body in the required entry point declaration
pub fn script(body: &str) -> String {
    format!("function customValidation(data) {{\n{}\n}}", body)
}

pub fn empty_input() -> ExecutionInput {
    ExecutionInput::new(serde_json::json!({}))
}
