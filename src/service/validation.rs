//! Request body shaping and checks ahead of the accessor.

use crate::db::Row;
use crate::error::AppError;
use crate::store::AccessPolicy;
use serde_json::Value;

/// Name of the key field carried in API form bodies.
pub const ID_FIELD: &str = "id";

pub struct RequestValidator;

impl RequestValidator {
    /// A JSON request body must be an object; its keys become column names.
    pub fn body_to_row(body: Value) -> Result<Row, AppError> {
        match body {
            Value::Object(map) => Ok(map),
            other => Err(AppError::Validation(format!(
                "request body must be a JSON object, got {}",
                kind(&other)
            ))),
        }
    }

    /// Split urlencoded form pairs into the `id` value and the remaining column data.
    /// A repeated key keeps its last value.
    pub fn split_id(pairs: Vec<(String, String)>) -> Result<(Value, Row), AppError> {
        let mut id = None;
        let mut data = Row::new();
        for (k, v) in pairs {
            if k == ID_FIELD {
                id = Some(v);
            } else {
                data.insert(k, Value::String(v));
            }
        }
        match id {
            Some(id) if !id.trim().is_empty() => Ok((Value::String(id), data)),
            _ => Err(AppError::Validation(format!("{} is required", ID_FIELD))),
        }
    }

    /// With a non-empty editable set, every key in `data` must be editable.
    pub fn check_editable(data: &Row, policy: &AccessPolicy) -> Result<(), AppError> {
        if policy.editable_columns.is_empty() {
            return Ok(());
        }
        let denied: Vec<&str> = data
            .keys()
            .filter(|k| !policy.editable_columns.contains(k.as_str()))
            .map(String::as_str)
            .collect();
        if denied.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!("columns not editable: {}", denied.join(", "))))
        }
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
