//! Result contract checks
//!
//! A script must return `{ isValid: boolean, message: string, ...extra }`. Messages produced
//! here come from the engine itself and are passed to callers verbatim.

use crate::error::ContractError;
use crate::value::ScriptValue;

/// A raw result that satisfied the contract. `extra` still needs sanitizing.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractResult {
    pub is_valid: bool,
    pub message: String,
    /// Every key except `isValid` and `message`, or `None` if there were none.
    pub extra: Option<ScriptValue>,
}

pub fn validate(raw: ScriptValue) -> Result<ContractResult, ContractError> {
    let entries = match raw {
        ScriptValue::Object(entries) => entries,
        other => {
            return Err(ContractError(format!(
                "Validation function must return an object, got {}",
                other.kind()
            )))
        }
    };

    let mut is_valid = None;
    let mut message = None;
    let mut extra = Vec::new();
    for (key, value) in entries {
        match key.as_str() {
            "isValid" => is_valid = Some(value),
            "message" => message = Some(value),
            _ => extra.push((key, value)),
        }
    }

    let is_valid = match is_valid {
        Some(ScriptValue::Bool(b)) => b,
        _ => {
            return Err(ContractError(
                "Validation result must include \"isValid\" as a boolean".to_string(),
            ))
        }
    };
    let message = match message {
        Some(ScriptValue::String(s)) => s,
        _ => {
            return Err(ContractError(
                "Validation result must include \"message\" as a string".to_string(),
            ))
        }
    };

    Ok(ContractResult {
        is_valid,
        message,
        extra: (!extra.is_empty()).then_some(ScriptValue::Object(extra)),
    })
}
