//! Structured output: the JSON schema handed to the model and recovery of
//! JSON from free text.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// A type the model can be asked to return.
///
/// The schema becomes the parameters of the output tool. `validate` runs after
/// a successful parse; any returned problem rejects the output.
pub trait OutputSchema: DeserializeOwned + JsonSchema {
    const TOOL_DESCRIPTION: &'static str = "The final response which ends this conversation";

    /// Parameters for the output tool: the schemars schema without `$schema`
    fn tool_parameters() -> serde_json::Value {
        let mut value = serde_json::Value::from(schemars::schema_for!(Self));
        if let Some(object) = value.as_object_mut() {
            object.remove("$schema");
        }
        value
    }

    fn validate(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Pull a JSON document out of model text (handles markdown fences).
pub fn extract_json(content: &str) -> &str {
    if content.contains("```json") {
        content
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .unwrap_or(content)
    } else if content.contains("```") {
        content
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .unwrap_or(content)
    } else {
        match (content.find('{'), content.rfind('}')) {
            (Some(start), Some(end)) if start < end => &content[start..=end],
            _ => content.trim(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    /// A small answer type
    #[derive(Debug, Deserialize, JsonSchema)]
    struct Answer {
        /// The answer text.
        text: String,
    }

    impl OutputSchema for Answer {}

    #[test]
    fn test_schema_strips_meta_keyword() {
        let schema = Answer::tool_parameters();
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["text"]["description"], "The answer text.");
        assert_eq!(schema["required"][0], "text");
    }

    #[test]
    fn test_default_validate_accepts() {
        let answer = Answer { text: "ok".into() };
        assert_eq!(answer.text, "ok");
        assert!(answer.validate().is_empty());
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "Here you go:\n```json\n{\"text\": \"hi\"}\n```\nEnjoy.";
        assert_eq!(extract_json(text), "{\"text\": \"hi\"}");

        let text = "```\n{\"text\": \"plain\"}\n```";
        assert_eq!(extract_json(text), "{\"text\": \"plain\"}");
    }

    #[test]
    fn test_extract_json_bare() {
        assert_eq!(extract_json("Sure! {\"text\": \"x\"} Done."), "{\"text\": \"x\"}");
        assert_eq!(extract_json("  no json here  "), "no json here");
    }
}
