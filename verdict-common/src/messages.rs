use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only shape a validation outcome ever takes outside the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedResult {
    pub is_valid: bool,
    pub message: String,

    /// Extra keys the script returned, after sanitization. Absent when nothing safe remained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ValidatedResult {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }
}

/// Response handed to the calling layer after executing a registered validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResponse {
    pub success: bool,
    pub is_valid: bool,
    pub message: String,
    pub timestamp: String,
    pub api_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ExecutionResponse {
    pub fn from_result(api_name: impl Into<String>, result: ValidatedResult) -> Self {
        let message = if result.is_valid && result.message.is_empty() {
            "Validation passed successfully".to_string()
        } else {
            result.message
        };
        Self {
            success: result.is_valid,
            is_valid: result.is_valid,
            message,
            timestamp: Utc::now().to_rfc3339(),
            api_name: api_name.into(),
            data: result.data,
        }
    }
}
