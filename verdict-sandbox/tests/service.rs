//! Registration and execution through the validation service

#![cfg(feature = "v8")]

mod common;

use assert_matches::assert_matches;
use common::{relaxed_limits, script, setup_test_logging};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use verdict_common::{ApiConfig, StatsReport};
use verdict_sandbox::{
    EngineConfig, ExecutionEngine, ServiceError, StatsRecorder, V8Runtime, ValidationService,
};

fn service() -> ValidationService {
    setup_test_logging();
    EngineConfig {
        sandbox: relaxed_limits(),
        max_concurrent_sandboxes: 4,
    }
    .build_service()
}

fn email_check() -> String {
    script(
        r#"
        if (!data.body.email) {
            return { isValid: false, message: 'Email is required' };
        }
        return { isValid: true, message: '', domain: data.body.email.split('@')[1] };
        "#,
    )
}

#[tokio::test]
async fn test_register_and_execute() -> anyhow::Result<()> {
    let service = service();
    let config = service
        .register(ApiConfig::new("signup", email_check()).with_body(json!({"email": "string"})))
        .await?;
    assert_eq!(config.method, "POST");

    let response = service
        .execute("signup", json!({}), &[("User-Agent", "tests")])
        .await?;
    assert!(!response.success);
    assert!(!response.is_valid);
    assert_eq!(response.message, "Email is required");
    assert_eq!(response.api_name, "signup");

    let response = service
        .execute("signup", json!({"email": "a@example.org"}), &[])
        .await?;
    assert!(response.success);
    assert_eq!(response.message, "Validation passed successfully");
    assert_eq!(response.data, Some(json!({"domain": "example.org"})));

    match service.stats(Some("signup")) {
        StatsReport::Single(stats) => {
            assert_eq!(stats.total_executions, 2);
            assert_eq!(stats.success_count, 1);
            assert_eq!(stats.failure_count, 1);
        }
        other => panic!("expected single stats, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_register_rejections() {
    let service = service();

    assert_matches!(
        service.register(ApiConfig::new("  ", email_check())).await,
        Err(ServiceError::InvalidConfig(_))
    );

    let mut get = ApiConfig::new("get", email_check());
    get.method = "GET".to_string();
    assert_matches!(service.register(get).await, Err(ServiceError::InvalidConfig(_)));

    assert_matches!(
        service
            .register(ApiConfig::new("arrow", "const customValidation = (d) => ({});"))
            .await,
        Err(ServiceError::InvalidScript(_))
    );

    let err = service
        .register(ApiConfig::new("throws", script("throw new Error('boom at /srv/app');")))
        .await
        .unwrap_err();
    assert_matches!(&err, ServiceError::InvalidScript(detail) if detail.contains("[path]"));
    assert!(err.to_string().contains("function customValidation(data)"));

    let err = service
        .register(ApiConfig::new("escape", script("return process.env;")))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidScript(detail) if detail.starts_with("Security violation"));

    let trailing = format!("{}\nglobalThis.beacon = 1;", email_check());
    assert_matches!(
        service.register(ApiConfig::new("trailing", trailing)).await,
        Err(ServiceError::InvalidScript(detail)) if detail.contains("only top-level statement")
    );

    // Nothing above may have been stored or counted
    assert!(service.list().await.is_empty());
    assert_eq!(service.stats(None), StatsReport::All(Default::default()));
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let service = service();
    service
        .register(ApiConfig::new("signup", email_check()))
        .await
        .unwrap();
    assert_matches!(
        service.register(ApiConfig::new("signup", email_check())).await,
        Err(ServiceError::Conflict(name)) if name == "signup"
    );
}

#[tokio::test]
async fn test_unknown_name_lists_available() {
    let service = service();
    service
        .register(ApiConfig::new("signup", email_check()))
        .await
        .unwrap();

    let err = service.execute("login", json!({}), &[]).await.unwrap_err();
    assert_matches!(
        err,
        ServiceError::NotFound { name, available } if name == "login" && available == vec!["signup".to_string()]
    );
}

#[tokio::test]
async fn test_remove_resets_stats() {
    let service = service();
    service
        .register(ApiConfig::new("signup", email_check()))
        .await
        .unwrap();
    service.execute("signup", json!({}), &[]).await.unwrap();

    service.remove("signup").await.unwrap();
    assert_matches!(service.get("signup").await, Err(ServiceError::NotFound { .. }));
    assert_matches!(
        service.stats(Some("signup")),
        StatsReport::Single(stats) if stats.total_executions == 0
    );
    assert_matches!(service.remove("signup").await, Err(ServiceError::NotFound { .. }));
}

#[tokio::test]
async fn test_concurrent_calls_share_stats() {
    setup_test_logging();
    let runtime = Arc::new(V8Runtime::with_max_concurrent(2));
    let engine = Arc::new(ExecutionEngine::with_stats(
        runtime.clone(),
        Arc::new(StatsRecorder::new()),
        relaxed_limits(),
    ));
    let body = script("return { isValid: data.body.n % 2 === 0, message: 'parity' };");

    let calls = (0..12).map(|n| {
        let engine = engine.clone();
        let body = body.clone();
        async move {
            let input = verdict_common::ExecutionInput::new(json!({ "n": n }));
            engine.run("parity", &body, &input).await
        }
    });
    let results = join_all(calls).await;

    assert_eq!(results.iter().filter(|r| r.is_valid).count(), 6);
    let stats = engine.stats().get("parity");
    assert_eq!(stats.total_executions, 12);
    assert_eq!(stats.success_count, 6);
    assert_eq!(stats.failure_count, 6);
    assert_eq!(runtime.available_permits(), 2);
}
