use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Name of the function every validation script must declare.
pub const ENTRY_POINT: &str = "customValidation";

/// The only HTTP method a registered validation accepts.
pub const SUPPORTED_METHOD: &str = "POST";

/// A registered validation as the configuration store keeps it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Unique name the validation is invoked by.
    pub name: String,

    /// HTTP method the calling layer routes (always `POST`).
    #[serde(default = "default_method")]
    pub method: String,

    /// Expected request body shape, kept as an authoring hint only.
    #[serde(default)]
    pub body: Value,

    /// Script body declaring `function customValidation(data) { ... }`.
    pub custom_validation: String,
}

fn default_method() -> String {
    SUPPORTED_METHOD.to_string()
}

impl ApiConfig {
    pub fn new(name: impl Into<String>, custom_validation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: default_method(),
            body: Value::Object(Default::default()),
            custom_validation: custom_validation.into(),
        }
    }

    /// Attach the body hint
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

/// The single argument a validation script receives.
///
/// Built fresh for every call; scripts see it as `data`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInput {
    pub body: Value,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// RFC 3339 time the input was built.
    pub timestamp: String,

    /// Correlation id, `req_<uuid>`.
    pub request_id: String,
}

impl ExecutionInput {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            headers: BTreeMap::new(),
            timestamp: Utc::now().to_rfc3339(),
            request_id: generate_request_id(),
        }
    }

    /// Synthetic input used when a script is checked at registration time.
    pub fn synthetic() -> Self {
        Self::new(Value::Object(Default::default()))
    }

    /// Keep only the headers a script may look at.
    pub fn with_headers<'a, I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut kept: BTreeMap<String, String> = BTreeMap::new();
        for (key, value) in headers {
            let key = key.to_ascii_lowercase();
            if FORWARDED_HEADERS.contains(&key.as_str()) {
                kept.insert(key, value.to_string());
            }
        }
        kept.entry("content-type".to_string())
            .or_insert_with(|| "application/json".to_string());
        kept.entry("user-agent".to_string())
            .or_insert_with(|| "unknown".to_string());
        self.headers = kept;
        self
    }
}

/// Headers forwarded into the script input. Credentials are never forwarded.
const FORWARDED_HEADERS: &[&str] = &["content-type", "user-agent"];

pub fn generate_request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}
