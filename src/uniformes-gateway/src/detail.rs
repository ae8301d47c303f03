//! Decoding of the `detail` field carried by error responses.
//!
//! The backend reports failures in three shapes: a list of field-level
//! validation entries, a single message string, or an arbitrary JSON value.
//! `ErrorDetail` decodes the shape once so nothing downstream needs to
//! inspect raw JSON again.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// One segment of a validation error location, e.g. `["body", "items", 0]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LocationSegment {
    Name(String),
    Index(i64),
}

impl std::fmt::Display for LocationSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationSegment::Name(name) => f.write_str(name),
            LocationSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    #[serde(default, alias = "loc")]
    pub location: Vec<LocationSegment>,
    #[serde(alias = "msg")]
    pub message: String,
}

impl FieldError {
    pub fn new(location: &[&str], message: impl Into<String>) -> Self {
        Self {
            location: location
                .iter()
                .map(|s| LocationSegment::Name((*s).to_string()))
                .collect(),
            message: message.into(),
        }
    }

    /// Field name: the last location segment.
    pub fn field(&self) -> String {
        self.location
            .last()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// `"<field>: <message>"`.
    pub fn line(&self) -> String {
        format!("{}: {}", self.field(), self.message)
    }
}

/// Decoded `detail` of an error body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ErrorDetail {
    /// No usable detail was present.
    #[default]
    Absent,
    /// Structured validation entries.
    Validation(Vec<FieldError>),
    /// A plain message.
    Message(String),
    /// Any other JSON value.
    Structured(Value),
}

impl ErrorDetail {
    /// Decode the `detail` field of a parsed error body.
    pub fn from_body(body: &Value) -> Self {
        match body.get("detail") {
            None | Some(Value::Null) => ErrorDetail::Absent,
            Some(Value::String(message)) => ErrorDetail::Message(message.clone()),
            Some(Value::Array(entries)) if entries.is_empty() => ErrorDetail::Absent,
            Some(value @ Value::Array(_)) => {
                match serde_json::from_value::<Vec<FieldError>>(value.clone()) {
                    Ok(errors) => ErrorDetail::Validation(errors),
                    Err(_) => ErrorDetail::Structured(value.clone()),
                }
            }
            Some(other) => ErrorDetail::Structured(other.clone()),
        }
    }

    /// One-line-per-entry rendering used as the failure message, falling
    /// back to `HTTP <status>` when there is nothing to show.
    pub fn summary(&self, status: u16) -> String {
        match self {
            ErrorDetail::Validation(errors) => validation_lines(errors),
            ErrorDetail::Message(message) => message.clone(),
            ErrorDetail::Structured(value) => value.to_string(),
            ErrorDetail::Absent => format!("HTTP {status}"),
        }
    }

    /// Field name to message, for validation details. The first message
    /// for a field wins.
    pub fn field_errors(&self) -> IndexMap<String, String> {
        let mut fields = IndexMap::new();
        if let ErrorDetail::Validation(errors) = self {
            for error in errors {
                fields
                    .entry(error.field())
                    .or_insert_with(|| error.message.clone());
            }
        }
        fields
    }
}

pub(crate) fn validation_lines(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_validation_array_with_spec_keys() {
        let body = json!({"detail": [{"location": ["body", "email"], "message": "invalid"}]});
        let detail = ErrorDetail::from_body(&body);
        assert_eq!(
            detail,
            ErrorDetail::Validation(vec![FieldError::new(&["body", "email"], "invalid")])
        );
        assert_eq!(detail.summary(422), "email: invalid");
    }

    #[test]
    fn test_validation_array_with_wire_keys_and_index() {
        let body = json!({"detail": [
            {"loc": ["body", "items", 2], "msg": "required", "type": "missing"},
            {"loc": ["query", "school_id"], "msg": "not a uuid"}
        ]});
        let detail = ErrorDetail::from_body(&body);
        assert_eq!(detail.summary(422), "2: required\nschool_id: not a uuid");

        let fields = detail.field_errors();
        assert_eq!(fields.get("school_id").map(String::as_str), Some("not a uuid"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_string_detail() {
        let detail = ErrorDetail::from_body(&json!({"detail": "Producto agotado"}));
        assert_eq!(detail, ErrorDetail::Message("Producto agotado".to_string()));
        assert_eq!(detail.summary(400), "Producto agotado");
    }

    #[test]
    fn test_object_detail_is_serialized() {
        let detail = ErrorDetail::from_body(&json!({"detail": {"code": "E42"}}));
        assert_eq!(detail.summary(400), r#"{"code":"E42"}"#);
    }

    #[test]
    fn test_unrecognized_array_is_structured() {
        let detail = ErrorDetail::from_body(&json!({"detail": ["a", "b"]}));
        assert!(matches!(detail, ErrorDetail::Structured(_)));
        assert!(detail.field_errors().is_empty());
    }

    #[test]
    fn test_missing_detail_falls_back_to_status() {
        assert_eq!(ErrorDetail::from_body(&json!({})).summary(418), "HTTP 418");
        assert_eq!(ErrorDetail::from_body(&json!({"detail": null})).summary(502), "HTTP 502");
        assert_eq!(ErrorDetail::from_body(&json!({"detail": []})).summary(400), "HTTP 400");
    }
}
