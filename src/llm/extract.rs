use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::textutil::strip_control_chars;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadShape {
    Object,
    Array,
}

impl PayloadShape {
    fn delimiters(self) -> (char, char) {
        match self {
            Self::Object => ('{', '}'),
            Self::Array => ('[', ']'),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no JSON {0} start in response")]
    NoStart(char),
    #[error("no JSON {0} end in response")]
    NoEnd(char),
    #[error("JSON parse failed: {0}")]
    Parse(String),
    #[error("JSON payload has the wrong shape: {0}")]
    Shape(String),
}

/// Locate the JSON payload inside free model text.
///
/// The candidate runs from the first opening delimiter to the last closing one.
/// Control characters other than `\n\r\t` are removed before parsing. When the
/// wide slice does not parse (prose after the payload containing a stray
/// bracket), the first complete value after the opening delimiter is used.
pub fn extract_json_payload(text: &str, shape: PayloadShape) -> Result<serde_json::Value, ExtractError> {
    let (open, close) = shape.delimiters();
    let start = text.find(open).ok_or(ExtractError::NoStart(open))?;
    let end = text.rfind(close).ok_or(ExtractError::NoEnd(close))?;
    if end < start {
        return Err(ExtractError::NoEnd(close));
    }
    let candidate = strip_control_chars(&text[start..=end]);

    let wide_err = match serde_json::from_str::<serde_json::Value>(&candidate) {
        Ok(v) => return Ok(v),
        Err(err) => err,
    };

    let mut de = serde_json::Deserializer::from_str(&candidate);
    match serde_json::Value::deserialize(&mut de) {
        Ok(v) => Ok(v),
        Err(_) => Err(ExtractError::Parse(wide_err.to_string())),
    }
}

/// Extract and deserialize in one step.
pub fn extract_json<T: DeserializeOwned>(text: &str, shape: PayloadShape) -> Result<T, ExtractError> {
    let value = extract_json_payload(text, shape)?;
    serde_json::from_value(value).map_err(|e| ExtractError::Shape(e.to_string()))
}

/// A list of strings, ignoring non-string entries and blanks.
pub fn extract_string_list(text: &str) -> Result<Vec<String>, ExtractError> {
    let value = extract_json_payload(text, PayloadShape::Array)?;
    let items = value
        .as_array()
        .ok_or_else(|| ExtractError::Shape("expected an array".to_string()))?;
    Ok(items
        .iter()
        .filter_map(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_inside_prose() {
        let text = "Here you go:\n```json\n{\"a\": 1, \"b\": [\"x\"]}\n```\nThanks!";
        let v = extract_json_payload(text, PayloadShape::Object).expect("payload");
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn trailing_brace_in_prose_falls_back_to_first_value() {
        let text = "{\"a\": 1} and then a note {like this}";
        let v = extract_json_payload(text, PayloadShape::Object).expect("payload");
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn control_chars_are_stripped() {
        let text = "[\"one\u{0001}\", \"two\"]";
        let list = extract_string_list(text).expect("list");
        assert_eq!(list, vec!["one", "two"]);
    }

    #[test]
    fn failures_are_tagged() {
        assert_eq!(
            extract_json_payload("no json here", PayloadShape::Object),
            Err(ExtractError::NoStart('{'))
        );
        assert_eq!(
            extract_json_payload("[ \"open\"", PayloadShape::Array),
            Err(ExtractError::NoEnd(']'))
        );
        assert!(matches!(
            extract_json_payload("{not: json}", PayloadShape::Object),
            Err(ExtractError::Parse(_))
        ));
        assert_eq!(extract_string_list("{\"a\": 1}"), Err(ExtractError::NoStart('[')));
        assert!(matches!(
            extract_json::<Vec<String>>("[1, 2]", PayloadShape::Array),
            Err(ExtractError::Shape(_))
        ));
    }
}
