//! Deadline, heap and capability enforcement on the V8 runtime

#[cfg(feature = "v8")]
use verdict_common::ExecutionInput;
#[cfg(feature = "v8")]
use verdict_sandbox::{EngineConfig, SandboxLimits};

#[cfg(feature = "v8")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Verdict Limits Demo ===\n");

    let config = EngineConfig {
        sandbox: SandboxLimits::default()
            .with_timeout_ms(500)
            .with_max_heap_bytes(32 * 1024 * 1024),
        max_concurrent_sandboxes: 2,
    };
    let engine = config.build_engine();
    let input = ExecutionInput::new(serde_json::json!({ "email": "someone@example.org" }));

    let cases = [
        (
            "quick",
            r#"function customValidation(data) {
                let sum = 0;
                for (let i = 0; i < 1000; i++) { sum += i; }
                return { isValid: sum === 499500, message: 'sum checked' };
            }"#,
        ),
        (
            "spin",
            r#"function customValidation(data) {
                while (true) {}
            }"#,
        ),
        (
            "hog",
            r#"function customValidation(data) {
                const chunks = [];
                while (true) { chunks.push('x'.repeat(1024 * 1024) + chunks.length); }
            }"#,
        ),
        (
            "escape",
            r#"function customValidation(data) {
                return { isValid: true, message: String(process.env.HOME) };
            }"#,
        ),
    ];

    for (name, script) in cases {
        let result = engine.run(name, script, &input).await;
        println!(
            "{:>7}: isValid={} message={:?}",
            name, result.is_valid, result.message
        );
    }

    println!("\nStats:");
    for (name, stats) in engine.stats().all() {
        println!(
            "{:>7}: total={} ok={} failed={} avg={:.1}ms",
            name,
            stats.total_executions,
            stats.success_count,
            stats.failure_count,
            stats.average_execution_time_ms
        );
    }

    Ok(())
}

#[cfg(not(feature = "v8"))]
fn main() {
    eprintln!("This example requires the 'v8' feature.");
    eprintln!("Run with: cargo run --example limits_demo --features v8");
    std::process::exit(1);
}
