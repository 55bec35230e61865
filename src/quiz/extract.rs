use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::GenerationError;

static JSON_FENCE_REGEX: OnceLock<Regex> = OnceLock::new();

fn json_fence_regex() -> &'static Regex {
    JSON_FENCE_REGEX.get_or_init(|| {
        Regex::new(r"(?is)```json[ \t]*\r?\n?(.*?)```").expect("Invalid JSON fence regex")
    })
}

/// Which JSON document the caller expects at the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Array,
    Object,
}

impl Shape {
    fn brackets(self) -> (char, char) {
        match self {
            Shape::Array => ('[', ']'),
            Shape::Object => ('{', '}'),
        }
    }
}

/// Pulls the JSON document of the expected shape out of model output.
///
/// A `json` fenced block wins if there is one. Otherwise everything from the
/// first opening bracket to the last closing bracket is taken.
pub fn extract_json(text: &str, shape: Shape) -> Result<Value, GenerationError> {
    let candidate = match json_fence_regex().captures(text) {
        Some(captures) => captures
            .get(1)
            .map(|body| body.as_str().trim())
            .unwrap_or_default(),
        None => bracket_span(text, shape)?,
    };

    serde_json::from_str(candidate).map_err(|e| {
        log::warn!("Model output did not parse as JSON: {e}");
        GenerationError::MalformedResponse(format!("invalid JSON: {e}"))
    })
}

fn bracket_span(text: &str, shape: Shape) -> Result<&str, GenerationError> {
    let (open, close) = shape.brackets();
    let start = text.find(open);
    let end = text.rfind(close);

    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(GenerationError::MalformedResponse(format!(
            "no {open}...{close} pair in model output"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bare_array() {
        let value = extract_json(r#"[{"a": 1}]"#, Shape::Array).unwrap();
        assert_eq!(value, json!([{ "a": 1 }]));
    }

    #[test]
    fn array_inside_prose() {
        let text = "Sure! Here are your questions:\n[{\"q\": \"x\"}, {\"q\": \"y\"}]\nGood luck with your studies.";
        let value = extract_json(text, Shape::Array).unwrap();
        assert_eq!(value, json!([{ "q": "x" }, { "q": "y" }]));
    }

    #[test]
    fn fenced_block_wins_over_brackets_in_prose() {
        let text = "Options [a] and [b] follow.\n```json\n{\"nodes\": [], \"edges\": []}\n```\nThat's all [done].";
        let value = extract_json(text, Shape::Object).unwrap();
        assert_eq!(value, json!({ "nodes": [], "edges": [] }));
    }

    #[test]
    fn fence_label_is_case_insensitive() {
        let text = "```JSON\n[1, 2, 3]\n```";
        assert_eq!(extract_json(text, Shape::Array).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn object_shape_uses_braces() {
        let text = "Roadmap: {\"nodes\": [{\"id\": \"1\"}], \"edges\": []} -- enjoy";
        let value = extract_json(text, Shape::Object).unwrap();
        assert_eq!(value["nodes"][0]["id"], "1");
    }

    #[test]
    fn no_brackets_is_malformed() {
        let err = extract_json("I cannot help with that.", Shape::Array).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn reversed_brackets_are_malformed() {
        let err = extract_json("] nothing here [", Shape::Array).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn broken_json_is_malformed() {
        let err = extract_json("[{\"question\": \"unterminated}]", Shape::Array).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn empty_fence_is_malformed() {
        let err = extract_json("```json\n```", Shape::Array).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }
}
