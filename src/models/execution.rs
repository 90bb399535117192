//! Execution request and result models.

use crate::models::value::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::time::Duration;

/// A caller-supplied parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    Null,
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    String(String),
    /// Arrays and objects, kept as JSON
    Json(JsonValue),
}

impl QueryParam {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Json(_) => "json",
        }
    }

    /// Text spliced into a SQL template for this value. Null splices as empty text.
    pub fn to_template_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::String(v) => v.clone(),
            Self::Json(v) => v.to_string(),
        }
    }
}

impl From<JsonValue> for QueryParam {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(v) => Self::Bool(v),
            JsonValue::Number(n) => match n.as_i64() {
                Some(v) => Self::Int(v),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::String(n.to_string())),
            },
            JsonValue::String(v) => Self::String(v),
            other => Self::Json(other),
        }
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for QueryParam {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for QueryParam {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for QueryParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Named parameters for one execution.
pub type Params = HashMap<String, QueryParam>;

/// Per-call execution options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Overrides the executor's default deadline for this call.
    pub timeout: Option<Duration>,
}

impl ExecuteOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Uniform result envelope returned by the execution engine.
///
/// On success exactly one of `rows` / `affected_rows` is set; on failure neither is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
    pub elapsed_ms: u64,
}

impl ExecutionResult {
    pub fn query(rows: Vec<Row>, elapsed_ms: u64) -> Self {
        Self {
            success: true,
            error_message: None,
            rows: Some(rows),
            affected_rows: None,
            elapsed_ms,
        }
    }

    pub fn mutation(affected_rows: u64, elapsed_ms: u64) -> Self {
        Self {
            success: true,
            error_message: None,
            rows: None,
            affected_rows: Some(affected_rows),
            elapsed_ms,
        }
    }

    pub fn failure(message: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            rows: None,
            affected_rows: None,
            elapsed_ms,
        }
    }

    /// Number of rows returned, zero for mutations and failures.
    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::value::Value;

    #[test]
    fn test_template_text() {
        assert_eq!(QueryParam::Null.to_template_text(), "");
        assert_eq!(QueryParam::Bool(true).to_template_text(), "true");
        assert_eq!(QueryParam::Int(-7).to_template_text(), "-7");
        assert_eq!(QueryParam::Float(2.5).to_template_text(), "2.5");
        assert_eq!(QueryParam::from("abc").to_template_text(), "abc");
        assert_eq!(
            QueryParam::Json(serde_json::json!([1, 2])).to_template_text(),
            "[1,2]"
        );
    }

    #[test]
    fn test_untagged_deserialize() {
        let params: Params =
            serde_json::from_str(r#"{"a":null,"b":true,"c":5,"d":1.25,"e":"x","f":{"k":1}}"#)
                .unwrap();
        assert_eq!(params["a"], QueryParam::Null);
        assert_eq!(params["b"], QueryParam::Bool(true));
        assert_eq!(params["c"], QueryParam::Int(5));
        assert_eq!(params["d"], QueryParam::Float(1.25));
        assert_eq!(params["e"], QueryParam::String("x".into()));
        assert_eq!(params["f"].type_name(), "json");
    }

    #[test]
    fn test_from_json_value() {
        assert_eq!(QueryParam::from(serde_json::json!(3)), QueryParam::Int(3));
        assert_eq!(QueryParam::from(serde_json::json!(0.5)), QueryParam::Float(0.5));
        assert_eq!(QueryParam::from(serde_json::json!(null)), QueryParam::Null);
    }

    #[test]
    fn test_query_envelope_shape() {
        let mut row = Row::new();
        row.insert("id", Value::Int(5));
        let result = ExecutionResult::query(vec![row], 3);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["rows"][0]["id"], 5);
        assert_eq!(json["elapsedMs"], 3);
        assert!(json.get("affectedRows").is_none());
        assert!(json.get("errorMessage").is_none());
    }

    #[test]
    fn test_mutation_envelope_shape() {
        let json = serde_json::to_value(ExecutionResult::mutation(2, 1)).unwrap();
        assert_eq!(json["affectedRows"], 2);
        assert!(json.get("rows").is_none());
    }

    #[test]
    fn test_failure_envelope_shape() {
        let result = ExecutionResult::failure("boom", 0);
        assert_eq!(result.row_count(), 0);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errorMessage"], "boom");
        assert!(json.get("rows").is_none());
        assert!(json.get("affectedRows").is_none());
    }
}
