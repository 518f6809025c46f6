//! Outcome types returned by the orchestration loop

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One executed (or failed) action, kept in decision order for auditability
/// and UI rendering. `result` carries the raw, untruncated backend payload,
/// or `{"error": …}` when the action failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCallRecord {
    pub name: String,
    pub arguments: Value,
    pub result: Value,
}

impl ActionCallRecord {
    pub fn success(name: impl Into<String>, arguments: Value, result: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
            result,
        }
    }

    pub fn failure(name: impl Into<String>, arguments: Value, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments,
            result: serde_json::json!({ "error": error.into() }),
        }
    }
}

/// Final outcome of one orchestration run
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    /// User-facing natural-language answer
    pub message: String,
    /// Ordered list of action calls made during the run
    pub function_calls: Vec<ActionCallRecord>,
}
