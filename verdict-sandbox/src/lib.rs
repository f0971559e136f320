//! Verdict Sandbox - untrusted validation script execution
//!
//! Runs author-supplied `customValidation(data)` functions in a fresh, capability-restricted
//! V8 isolate per call, with a wall-clock deadline and a heap ceiling. Results are checked
//! against the `{ isValid, message }` contract, sanitized to plain JSON and attributed to the
//! registered name in the execution stats.

mod config;
mod engine;
mod error;
mod limits;
mod redact;
mod runtime;
mod sanitize;
mod service;
mod stats;
mod store;
mod validator;
mod value;

pub use config::{EngineConfig, CONFIG_ENV, MIN_HEAP_BYTES};
pub use engine::ExecutionEngine;
pub use error::{
    ConfigError, ContractError, SandboxError, SandboxResult, ServiceError, StoreError,
};
pub use limits::{Capability, SandboxLimits};
pub use redact::{redact, MAX_MESSAGE_LEN};
pub use runtime::Runtime;
#[cfg(feature = "v8")]
pub use runtime::v8::{
    DEFAULT_MAX_CONCURRENT_SANDBOXES, HOST_GLOBALS, MATH_SUBSET, MAX_DEPTH, MAX_LOG_LINES,
    MAX_LOG_LINE_CHARS, MAX_NODES,
};
#[cfg(feature = "v8")]
pub use runtime::V8Runtime;
pub use sanitize::{sanitize, DENIED_KEYS};
pub use service::ValidationService;
pub use stats::StatsRecorder;
pub use store::{ConfigStore, InMemoryConfigStore};
pub use validator::{validate, ContractResult};
pub use value::ScriptValue;
