//! CLI command implementations
//!
//! Each command builds its own engine from the loaded config; nothing outlives the process.

use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use verdict_common::{ApiConfig, ExecutionInput};
use verdict_sandbox::{EngineConfig, ServiceError};

/// Registrations plus the requests to replay against them
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFile {
    #[serde(default)]
    pub configs: Vec<ApiConfig>,
    #[serde(default)]
    pub requests: Vec<BatchRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub api: String,
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    EngineConfig::load(path).context("Failed to load engine config")
}

/// Parse `arg` as JSON, or read it from a file when it starts with `@`.
pub fn read_input(arg: &str) -> Result<serde_json::Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).context("Input is not valid JSON")
}

fn read_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))
}

/// Run a script once and print the validated result followed by its stats.
pub async fn execute_run(
    script: &Path,
    input: &str,
    name: &str,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_engine_config(config)?;
    let script = read_script(script)?;
    let body = read_input(input)?;

    let engine = config.build_engine();
    debug!(runtime = engine.runtime_name(), "Engine ready");

    let result = engine
        .run(name, &script, &ExecutionInput::new(body))
        .await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    let stats = engine.stats().get(name);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Check a script the way registration would. Returns whether it was accepted.
pub async fn execute_check(script: &Path, config: Option<&Path>) -> Result<bool> {
    let config = load_engine_config(config)?;
    let script = read_script(script)?;
    let service = config.build_service();

    match service.register(ApiConfig::new("check", script)).await {
        Ok(_) => {
            println!("OK: script accepted");
            Ok(true)
        }
        Err(e @ (ServiceError::InvalidScript(_) | ServiceError::InvalidConfig(_))) => {
            println!("Rejected: {}", e);
            Ok(false)
        }
        Err(e) => Err(anyhow!(e)),
    }
}

/// Register every config in the file, then replay its requests concurrently.
pub async fn execute_batch(file: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_engine_config(config)?;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file {}", file.display()))?;
    let batch: BatchFile = serde_json::from_str(&text).context("Invalid batch file")?;

    let service = config.build_service();
    for api in batch.configs {
        let name = api.name.clone();
        service
            .register(api)
            .await
            .with_context(|| format!("Failed to register {}", name))?;
    }
    info!(
        apis = service.list().await.len(),
        requests = batch.requests.len(),
        "Replaying batch"
    );

    let calls = batch.requests.iter().map(|request| {
        let service = &service;
        async move {
            let headers: Vec<(&str, &str)> = request
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            service
                .execute(&request.api, request.body.clone(), &headers)
                .await
        }
    });

    for response in join_all(calls).await {
        match response {
            Ok(response) => println!("{}", serde_json::to_string(&response)?),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    println!("{}", serde_json::to_string_pretty(&service.stats(None))?);
    Ok(())
}
