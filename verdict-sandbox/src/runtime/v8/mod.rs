//! V8 JavaScript runtime using deno_core
//!
//! Every call gets its own `JsRuntime` (isolate + context) on a blocking worker thread. The
//! isolate is created with a heap ceiling, a near-heap-limit callback and a watchdog thread,
//! all of which terminate execution instead of letting the script run on.

mod bootstrap;
mod extract;
mod ops;

use crate::error::{SandboxError, SandboxResult};
use crate::limits::SandboxLimits;
use crate::value::ScriptValue;
use async_trait::async_trait;
use deno_core::{v8, JsRuntime, RuntimeOptions};
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, LazyLock};
use tokio::sync::Semaphore;
use verdict_common::ENTRY_POINT;

pub use bootstrap::{HOST_GLOBALS, MATH_SUBSET};
pub use extract::{MAX_DEPTH, MAX_NODES};
pub use ops::{MAX_LOG_LINES, MAX_LOG_LINE_CHARS};

/// Sandboxes allowed to exist at the same time unless configured otherwise.
pub const DEFAULT_MAX_CONCURRENT_SANDBOXES: usize = 8;

/// Extra heap granted once the limit is hit, so the termination can unwind.
const HEAP_GRACE_BYTES: usize = 4 * 1024 * 1024;

static UNDEFINED_GLOBAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ReferenceError: (\w+) is not defined").expect("pattern is a valid literal")
});

/// V8 JavaScript runtime
pub struct V8Runtime {
    /// Admission control; one permit per live isolate
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl V8Runtime {
    pub fn new() -> Self {
        Self::with_max_concurrent(DEFAULT_MAX_CONCURRENT_SANDBOXES)
    }

    /// Bound the number of isolates alive at once. Zero is treated as one.
    pub fn with_max_concurrent(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Permits not currently held by a running call
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Default for V8Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl super::Runtime for V8Runtime {
    async fn execute(
        &self,
        script: &str,
        input: &serde_json::Value,
        limits: &SandboxLimits,
    ) -> SandboxResult<ScriptValue> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SandboxError::Unavailable(format!("admission closed: {}", e)))?;

        let script = script.to_string();
        let input = input.clone();
        let limits = limits.clone();

        // Isolates are !Send: build, run and drop one on the same blocking thread
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            run_isolate(&script, &input, &limits)
        })
        .await
        .map_err(|e| SandboxError::Unavailable(format!("sandbox worker failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "v8"
    }
}

fn run_isolate(
    script: &str,
    input: &serde_json::Value,
    limits: &SandboxLimits,
) -> SandboxResult<ScriptValue> {
    let mut runtime = JsRuntime::new(RuntimeOptions {
        extensions: vec![ops::create_sandbox_extension()],
        create_params: Some(v8::CreateParams::default().heap_limits(0, limits.max_heap_bytes)),
        ..Default::default()
    });
    runtime.op_state().borrow_mut().put(ops::LogBudget::default());

    let heap_exceeded = Arc::new(AtomicBool::new(false));
    {
        let heap_exceeded = heap_exceeded.clone();
        let handle = runtime.v8_isolate().thread_safe_handle();
        runtime.add_near_heap_limit_callback(move |current_limit, _initial_limit| {
            if !heap_exceeded.swap(true, Ordering::SeqCst) {
                handle.terminate_execution();
            }
            current_limit + HEAP_GRACE_BYTES
        });
    }

    let bootstrap = bootstrap::bootstrap_script(limits);
    if let Err(e) = runtime.execute_script("[verdict:bootstrap]", bootstrap) {
        if heap_exceeded.load(Ordering::SeqCst) {
            return Err(SandboxError::MemoryExceeded {
                max_heap_bytes: limits.max_heap_bytes,
            });
        }
        return Err(SandboxError::Unavailable(format!("bootstrap failed: {}", e)));
    }

    // The deadline covers user code only; isolate startup is not charged to the script
    let timed_out = Arc::new(AtomicBool::new(false));
    let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
    let watchdog = {
        let timed_out = timed_out.clone();
        let handle = runtime.v8_isolate().thread_safe_handle();
        let timeout = limits.timeout();
        std::thread::Builder::new()
            .name("verdict-watchdog".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(timeout) {
                    timed_out.store(true, Ordering::SeqCst);
                    handle.terminate_execution();
                }
            })
            .map_err(|e| SandboxError::Unavailable(format!("watchdog failed to start: {}", e)))?
    };

    let outcome = call_entry_point(&mut runtime, script, input, limits);

    // The watchdog holds an isolate handle; it must be gone before the runtime is dropped
    let _ = cancel_tx.send(());
    let _ = watchdog.join();

    if let Some(budget) = runtime.op_state().borrow().try_borrow::<ops::LogBudget>() {
        if budget.dropped > 0 {
            tracing::debug!(
                emitted = budget.emitted,
                dropped = budget.dropped,
                "Script log output truncated"
            );
        }
    }

    if heap_exceeded.load(Ordering::SeqCst) {
        return Err(SandboxError::MemoryExceeded {
            max_heap_bytes: limits.max_heap_bytes,
        });
    }
    if timed_out.load(Ordering::SeqCst) {
        return Err(SandboxError::Timeout {
            timeout_ms: limits.timeout_ms,
        });
    }
    outcome
}

/// Load the script, look up the entry point and call it with `input`.
fn call_entry_point(
    runtime: &mut JsRuntime,
    script: &str,
    input: &serde_json::Value,
    limits: &SandboxLimits,
) -> SandboxResult<ScriptValue> {
    let scope = &mut runtime.handle_scope();
    let tc = &mut v8::TryCatch::new(scope);

    // Taken while the intrinsics are still pristine; user code may replace it afterwards.
    let to_source = intrinsic_to_string(tc)?;

    let source = v8::String::new(tc, script)
        .ok_or_else(|| SandboxError::runtime("Script source is too large"))?;
    let compiled = match v8::Script::compile(tc, source, None) {
        Some(compiled) => compiled,
        None => return Err(caught(tc, limits)),
    };
    if compiled.run(tc).is_none() {
        return Err(caught(tc, limits));
    }

    let context = tc.get_current_context();
    let global = context.global(tc);
    let key = v8::String::new(tc, ENTRY_POINT)
        .ok_or_else(|| SandboxError::Unavailable("string allocation failed".to_string()))?;
    let entry = match global.get(tc, key.into()) {
        Some(entry) => entry,
        None => return Err(caught(tc, limits)),
    };
    let function = v8::Local::<v8::Function>::try_from(entry).map_err(|_| {
        SandboxError::runtime(format!("{} is not defined as a function", ENTRY_POINT))
    })?;

    let length_key = v8::String::new(tc, "length")
        .ok_or_else(|| SandboxError::Unavailable("string allocation failed".to_string()))?;
    let arity = function
        .get(tc, length_key.into())
        .and_then(|length| length.integer_value(tc));
    if arity != Some(1) {
        return Err(SandboxError::runtime(format!(
            "{} must declare exactly one parameter",
            ENTRY_POINT
        )));
    }

    // The declaration must be the whole script: no statements before or after it.
    let declared = match to_source.call(tc, function.into(), &[]) {
        Some(declared) => declared.to_rust_string_lossy(tc),
        None => return Err(caught(tc, limits)),
    };
    if declared != script.trim().trim_end_matches(';').trim_end() {
        return Err(SandboxError::runtime(format!(
            "{} must be the only top-level statement",
            ENTRY_POINT
        )));
    }

    let argument = deno_core::serde_v8::to_v8(tc, input)
        .map_err(|e| SandboxError::Unavailable(format!("input conversion failed: {}", e)))?;
    let receiver: v8::Local<v8::Value> = v8::undefined(tc).into();
    let returned = match function.call(tc, receiver, &[argument]) {
        Some(returned) => returned,
        None => return Err(caught(tc, limits)),
    };

    if !returned.is_object() || returned.is_function() {
        return Err(SandboxError::runtime("Validation function must return an object"));
    }

    let mut extractor = extract::Extractor::new(tc)
        .ok_or_else(|| SandboxError::runtime("Validation result could not be read"))?;
    extractor.extract(tc, returned)
}

/// `Function.prototype.toString`, read through a fresh function literal.
fn intrinsic_to_string<'s>(
    scope: &mut v8::HandleScope<'s>,
) -> SandboxResult<v8::Local<'s, v8::Function>> {
    let unavailable =
        || SandboxError::Unavailable("Function.prototype.toString missing".to_string());
    let code = v8::String::new(scope, "Object.getPrototypeOf(function () {}).toString")
        .ok_or_else(unavailable)?;
    let value = v8::Script::compile(scope, code, None)
        .and_then(|compiled| compiled.run(scope))
        .ok_or_else(unavailable)?;
    v8::Local::<v8::Function>::try_from(value).map_err(|_| unavailable())
}

/// Turn the exception held by `tc` into a sandbox error.
fn caught(tc: &mut v8::TryCatch<v8::HandleScope>, limits: &SandboxLimits) -> SandboxError {
    if tc.has_terminated() {
        // The caller reports the flag that caused the termination.
        return SandboxError::runtime("Execution terminated");
    }
    let message = match tc.exception() {
        Some(exception) => exception.to_rust_string_lossy(tc),
        None => "Unknown error".to_string(),
    };
    classify(message, limits)
}

/// A `ReferenceError` naming a host global or a denied capability is a capability violation;
/// anything else is an ordinary script error.
fn classify(message: String, limits: &SandboxLimits) -> SandboxError {
    if let Some(name) = UNDEFINED_GLOBAL
        .captures(&message)
        .and_then(|captures| captures.get(1))
    {
        if bootstrap::is_restricted_name(name.as_str(), limits) {
            return SandboxError::CapabilityViolation {
                name: name.as_str().to_string(),
            };
        }
    }
    SandboxError::runtime(message)
}
