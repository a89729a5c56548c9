use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Why a metadata field could not be read. Distinct from the field being absent.
#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("field `{field}` has unexpected type {found}")]
    UnexpectedType { field: &'static str, found: &'static str },
    #[error("field `{field}` is not a number: {value}")]
    NotANumber { field: &'static str, value: String },
}

/// `Ok(None)` means "not present", `Err` means "present but unusable".
pub type FieldResult = Result<Option<String>, FieldError>;

/// Best-effort parse of one embedded metadata block.
pub fn parse_metadata(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(v) if v.is_object() || v.is_array() => Some(v),
        Ok(_) => {
            debug!("metadata block is not an object or array; ignoring");
            None
        }
        Err(e) => {
            debug!("metadata block did not parse: {}", e);
            None
        }
    }
}

/// Locate the job node inside a JSON-LD document.
pub fn job_node(doc: &Value) -> Option<&Value> {
    match doc {
        Value::Object(map) => {
            if let Some(Value::Array(graph)) = map.get("@graph") {
                if let Some(node) = graph.iter().find(|n| is_job_posting(n)) {
                    return Some(node);
                }
            }
            Some(doc)
        }
        Value::Array(items) => items
            .iter()
            .find(|n| is_job_posting(n))
            .or_else(|| items.iter().find(|n| n.is_object())),
        _ => None,
    }
}

fn is_job_posting(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => t == "JobPosting",
        Some(Value::Array(ts)) => ts.iter().any(|t| t.as_str() == Some("JobPosting")),
        _ => false,
    }
}

pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Trim and drop empty strings so absence is the only "unknown" state.
pub fn clean(s: &str) -> Option<String> {
    let t = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

/// A plain string field. Null counts as absent.
pub fn string_field(node: &Value, field: &'static str) -> FieldResult {
    match node.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(clean(s)),
        Some(other) => Err(FieldError::UnexpectedType {
            field,
            found: type_name(other),
        }),
    }
}

/// A string, or an object carrying `name`.
pub fn name_or_string(v: &Value, field: &'static str) -> FieldResult {
    match v {
        Value::Null => Ok(None),
        Value::String(s) => Ok(clean(s)),
        Value::Object(map) => match map.get("name") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(clean(s)),
            Some(other) => Err(FieldError::UnexpectedType {
                field,
                found: type_name(other),
            }),
        },
        other => Err(FieldError::UnexpectedType {
            field,
            found: type_name(other),
        }),
    }
}

/// A number or numeric string.
pub fn number(v: &Value, field: &'static str) -> Result<Option<f64>, FieldError> {
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| !matches!(c, ',' | '$' | ' ')).collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned
                .parse::<f64>()
                .map(Some)
                .map_err(|_| FieldError::NotANumber {
                    field,
                    value: s.clone(),
                })
        }
        other => Err(FieldError::UnexpectedType {
            field,
            found: type_name(other),
        }),
    }
}

// ── Tests ──
