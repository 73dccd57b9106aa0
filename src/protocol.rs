/// Wire contract shared by the cascade engine and remote evaluators
///
/// Referenced parameter state travels as `name=value` entries joined by
/// `SEPARATOR`. Responses are JSON bodies; a value set is encoded as a two
/// element array `[[values...], [keys...]]`.
use serde::Serialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;

use crate::span::Span;
use crate::value_set::ValueSet;

/// Token joining `name=value` entries. Must match the evaluator side exactly.
pub const SEPARATOR: &str = "__LESEP__";

/// Content type sent with every operation call
pub const CONTENT_TYPE: &str = "application/x-stapler-method-invocation;charset=UTF-8";

/// Remote operations a parameter evaluator exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Replace the evaluator's view of the referenced parameters
    Update,
    /// Fetch the value set
    Choices,
    /// Fetch a single scalar result
    ChoicesAsString,
}

impl Operation {
    /// Path segment appended to the evaluator base URL
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Update => "doUpdate",
            Operation::Choices => "getChoicesForUI",
            Operation::ChoicesAsString => "getChoicesAsStringForUI",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The current value of a control, as submitted to an evaluator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Single(String),
    Multiple(Vec<String>),
}

impl ParameterValue {
    pub fn empty() -> Self {
        ParameterValue::Single(String::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ParameterValue::Single(value) => value.is_empty(),
            ParameterValue::Multiple(values) => values.is_empty(),
        }
    }

    /// Individual values; a single empty value yields nothing
    pub fn values(&self) -> Vec<&str> {
        match self {
            ParameterValue::Single(value) if value.is_empty() => Vec::new(),
            ParameterValue::Single(value) => vec![value.as_str()],
            ParameterValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Single(value) => f.write_str(value),
            ParameterValue::Multiple(values) => f.write_str(&values.join(",")),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Single(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Single(value)
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(values: Vec<String>) -> Self {
        ParameterValue::Multiple(values)
    }
}

/// Serialize referenced parameters, in order, as `name=value` entries
///
/// # Example
/// ```
/// use param_cascade::protocol::{serialize_parameters, ParameterValue};
///
/// let text = serialize_parameters([
///     ("city", ParameterValue::from("Sao Paulo")),
///     ("ids", ParameterValue::Multiple(vec!["1".into(), "3".into()])),
/// ]);
/// assert_eq!(text, "city=Sao Paulo__LESEP__ids=1,3");
/// ```
pub fn serialize_parameters<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, ParameterValue)>,
{
    entries
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Evaluator-side decoding of [`serialize_parameters`] output
///
/// Each entry is split on its first `=`, so values may themselves contain `=`.
/// An entry without `=` maps its trimmed name to an empty value; blank entries
/// are dropped. Later entries overwrite earlier ones with the same name.
pub fn parse_parameters(text: &str) -> BTreeMap<String, String> {
    let mut parameters = BTreeMap::new();
    for entry in text.split(SEPARATOR) {
        match entry.split_once('=') {
            Some((name, value)) => {
                parameters.insert(name.to_string(), value.to_string());
            }
            None => {
                let name = entry.trim();
                if !name.is_empty() {
                    parameters.insert(name.to_string(), String::new());
                }
            }
        }
    }
    parameters
}

/// Errors raised while decoding a response body
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The body is not valid JSON
    InvalidJson {
        operation: Operation,
        message: String,
        body: String,
        span: Span,
    },
    /// Valid JSON, but not the shape the operation returns
    UnexpectedShape {
        operation: Operation,
        expected: &'static str,
        body: String,
    },
    /// Values and keys are not index aligned
    LengthMismatch {
        operation: Operation,
        values: usize,
        keys: usize,
    },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::InvalidJson {
                operation,
                message,
                span,
                ..
            } => write!(
                f,
                "Invalid JSON returned by {}: {} at position {}",
                operation, message, span.start
            ),
            DecodeError::UnexpectedShape {
                operation,
                expected,
                ..
            } => write!(f, "Unexpected response from {}: expected {}", operation, expected),
            DecodeError::LengthMismatch {
                operation,
                values,
                keys,
            } => write!(
                f,
                "Response from {} has {} values but {} keys",
                operation, values, keys
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

impl DecodeError {
    /// The raw body the error refers to, when kept
    pub fn body(&self) -> Option<&str> {
        match self {
            DecodeError::InvalidJson { body, .. } => Some(body),
            DecodeError::UnexpectedShape { body, .. } => Some(body),
            DecodeError::LengthMismatch { .. } => None,
        }
    }
}

fn parse_body(operation: Operation, body: &str) -> Result<Json, DecodeError> {
    serde_json::from_str(body).map_err(|e| DecodeError::InvalidJson {
        operation,
        message: e.to_string(),
        body: body.to_string(),
        span: Span::from_line_column(body, e.line(), e.column()),
    })
}

/// Text used for one entry: strings verbatim, `null` as empty, anything else as JSON
fn entry_text(entry: &Json) -> String {
    match entry {
        Json::String(text) => text.clone(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

/// Decode a `[[values...], [keys...]]` body
pub fn decode_value_set(body: &str) -> Result<ValueSet, DecodeError> {
    let operation = Operation::Choices;
    let shape_error = || DecodeError::UnexpectedShape {
        operation,
        expected: "an array of two arrays",
        body: body.to_string(),
    };

    let json = parse_body(operation, body)?;
    let parts = json.as_array().ok_or_else(shape_error)?;
    let (values, keys) = match parts.as_slice() {
        [values, keys, ..] => (
            values.as_array().ok_or_else(shape_error)?,
            keys.as_array().ok_or_else(shape_error)?,
        ),
        _ => return Err(shape_error()),
    };
    if values.len() != keys.len() {
        return Err(DecodeError::LengthMismatch {
            operation,
            values: values.len(),
            keys: keys.len(),
        });
    }

    Ok(ValueSet::new(
        values.iter().map(entry_text).collect(),
        keys.iter().map(entry_text).collect(),
    ))
}

/// Decode a scalar body; non-string JSON is kept as its JSON text
pub fn decode_string(body: &str) -> Result<String, DecodeError> {
    let json = parse_body(Operation::ChoicesAsString, body)?;
    Ok(entry_text(&json))
}

/// Encode a value set the way evaluators answer [`Operation::Choices`]
pub fn encode_value_set(set: &ValueSet) -> String {
    Json::Array(vec![
        Json::Array(set.values.iter().cloned().map(Json::String).collect()),
        Json::Array(set.keys.iter().cloned().map(Json::String).collect()),
    ])
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_single_value() {
        let text = serialize_parameters([("city", ParameterValue::from("Sao Paulo"))]);
        assert_eq!(text, "city=Sao Paulo");
    }

    #[test]
    fn test_serialize_multiple_values() {
        let value = ParameterValue::Multiple(vec!["1".to_string(), "3".to_string()]);
        assert_eq!(serialize_parameters([("name", value)]), "name=1,3");
    }

    #[test]
    fn test_serialize_empty() {
        assert_eq!(serialize_parameters(Vec::<(&str, ParameterValue)>::new()), "");
        assert_eq!(
            serialize_parameters([("a", ParameterValue::empty()), ("b", "x".into())]),
            "a=__LESEP__b=x"
        );
    }

    #[test]
    fn test_parse_parameters_round_trip() {
        let text = "country=Brazil__LESEP__state=SP";
        let parsed = parse_parameters(text);
        assert_eq!(parsed.get("country").map(String::as_str), Some("Brazil"));
        assert_eq!(parsed.get("state").map(String::as_str), Some("SP"));
    }

    #[test]
    fn test_parse_parameters_value_with_equals() {
        let parsed = parse_parameters("expr=a=b=c__LESEP__ bare __LESEP__");
        assert_eq!(parsed.get("expr").map(String::as_str), Some("a=b=c"));
        assert_eq!(parsed.get("bare").map(String::as_str), Some(""));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_decode_value_set() {
        let set = decode_value_set(r#"[["One:selected", "Two"], ["1:selected", "2"]]"#).unwrap();
        assert_eq!(set.values, vec!["One:selected", "Two"]);
        assert_eq!(set.keys, vec!["1:selected", "2"]);
    }

    #[test]
    fn test_decode_value_set_non_string_entries() {
        let set = decode_value_set(r#"[[1, {"a": true}, null], ["1", "2", "3"]]"#).unwrap();
        assert_eq!(set.values, vec!["1", r#"{"a":true}"#, ""]);
    }

    #[test]
    fn test_decode_value_set_errors() {
        assert!(matches!(
            decode_value_set("[[\"a\"], [\"b\"]"),
            Err(DecodeError::InvalidJson { .. })
        ));
        assert!(matches!(
            decode_value_set("{\"a\": 1}"),
            Err(DecodeError::UnexpectedShape { .. })
        ));
        assert!(matches!(
            decode_value_set("[[\"a\", \"b\"], [\"1\"]]"),
            Err(DecodeError::LengthMismatch { values: 2, keys: 1, .. })
        ));
    }

    #[test]
    fn test_decode_string() {
        assert_eq!(decode_string("\"<b>bold</b>\"").unwrap(), "<b>bold</b>");
        assert_eq!(decode_string("42").unwrap(), "42");
        assert!(decode_string("<b>").is_err());
    }

    #[test]
    fn test_encode_value_set() {
        let set = ValueSet::from_pairs([("k", "v")]);
        assert_eq!(decode_value_set(&encode_value_set(&set)).unwrap(), set);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::Update.name(), "doUpdate");
        assert_eq!(Operation::Choices.to_string(), "getChoicesForUI");
    }
}
