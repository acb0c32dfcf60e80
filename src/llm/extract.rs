//! Tolerant JSON extraction from free-form model replies

use crate::{AlfredoError, Result};
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

use regex::Regex;

static FENCED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*(\{[\s\S]*?\})\s*```").expect("fenced object pattern is valid")
});

/// Pull the first JSON object candidate out of `reply`.
///
/// A fenced code block wins. Otherwise the span from the first `{` to the
/// last `}` is returned. Braces inside string values are not balanced; a
/// reply like `{"a": "}"} trailing }` yields a span that fails to parse,
/// which the caller treats like any other extraction failure.
pub fn extract_json(reply: &str) -> Result<&str> {
    if let Some(captures) = FENCED_OBJECT.captures(reply) {
        if let Some(object) = captures.get(1) {
            return Ok(object.as_str().trim());
        }
    }

    match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if end > start => Ok(&reply[start..=end]),
        _ => Err(AlfredoError::ExtractionError(
            "no JSON object in model reply".to_string(),
        )),
    }
}

/// Extract and deserialize in one step
pub fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let candidate = extract_json(reply)?;
    Ok(serde_json::from_str(candidate)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_fenced_block_wins() {
        let reply = "Here you go:\n```json\n{\"name\": \"Soup\"}\n```\nEnjoy {not this}";
        assert_eq!(extract_json(reply).unwrap(), "{\"name\": \"Soup\"}");
    }

    #[test]
    fn test_fence_without_language_tag() {
        let reply = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(reply).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_brace_span_with_prose() {
        let reply = "Sure! {\"a\": {\"b\": 2}} hope that helps";
        assert_eq!(extract_json(reply).unwrap(), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_no_object_is_error() {
        assert!(matches!(
            extract_json("I can't help with that."),
            Err(AlfredoError::ExtractionError(_))
        ));
        assert!(extract_json("} backwards {").is_err());
    }

    #[test]
    fn test_unbalanced_braces_fail_to_parse() {
        let reply = "{\"a\": \"}\"} trailing }";
        assert!(extract_json(reply).is_ok());
        assert!(parse_reply::<Value>(reply).is_err());
    }

    #[test]
    fn test_parse_reply_typed() {
        #[derive(serde::Deserialize)]
        struct Shape {
            name: String,
        }
        let shape: Shape = parse_reply("```json\n{\"name\":\"Pasta\"}\n```").unwrap();
        assert_eq!(shape.name, "Pasta");
    }
}
