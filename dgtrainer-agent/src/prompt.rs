//! Prompt construction for the putting coach.

use crate::model::PracticeRequest;
use dgtrainer_error::{Error, Result};
use serde::Serialize;
use std::io;

/// Instructions sent as the system prompt on every call.
pub const SYSTEM_PROMPT: &str = "You are a disc golf putting coach.

Return a PRACTICE SESSION as JSON matching the provided schema.
Rules:
- Keep total time within the user's requested minutes.
- Use 2 to 5 drills, each with explicit setup, reps, scoring, and a focus cue.
- Do NOT include warm motivational text; be operational.
- If the user provides a list of distances, ONLY use those distances.
- If no distances list is provided, choose sensible distances <= 35ft by default unless the user asks otherwise.
- Make the session realistic for the time and putter count.
";

const USER_PROMPT_HEADER: &str = "Build a putting practice session for this request:\n";

/// Render the per-call user prompt: a header line followed by the request as JSON.
pub fn build_user_prompt(request: &PracticeRequest) -> Result<String> {
    let mut out = String::from(USER_PROMPT_HEADER);
    out.push_str(&to_prompt_json(request)?);
    Ok(out)
}

/// The system and user halves of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticePrompt {
    pub system: &'static str,
    pub user: String,
}

impl PracticePrompt {
    pub fn new(request: &PracticeRequest) -> Result<Self> {
        Ok(Self {
            system: SYSTEM_PROMPT,
            user: build_user_prompt(request)?,
        })
    }

    /// Both halves as one text block, system instructions first
    pub fn render(&self) -> String {
        format!("{}\n{}", self.system, self.user)
    }
}

fn to_prompt_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PromptFormatter::default());
    value.serialize(&mut ser).map_err(|e| {
        Error::serialization_failed("failed to render request for the prompt")
            .with_operation("prompt::to_prompt_json")
            .set_source(e)
    })?;
    String::from_utf8(buf).map_err(|e| {
        Error::serialization_failed("prompt JSON is not UTF-8")
            .with_operation("prompt::to_prompt_json")
            .set_source(e)
    })
}

/// JSON layout for prompts: objects indented two spaces per level, arrays
/// kept on one line (`[15, 20, 30]`) so lists read the way a person types them.
#[derive(Debug, Default)]
struct PromptFormatter {
    depth: usize,
    has_value: bool,
}

impl PromptFormatter {
    fn indent<W: ?Sized + io::Write>(&self, writer: &mut W) -> io::Result<()> {
        for _ in 0..self.depth {
            writer.write_all(b"  ")?;
        }
        Ok(())
    }
}

impl serde_json::ser::Formatter for PromptFormatter {
    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.depth += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.depth -= 1;
        if self.has_value {
            writer.write_all(b"\n")?;
            self.indent(writer)?;
        }
        writer.write_all(b"}")
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        writer.write_all(if first { b"\n" } else { b",\n" })?;
        self.indent(writer)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b"[")
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b"]")
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Environment, PracticeConstraints};

    fn example() -> PracticeRequest {
        PracticeRequest::new(PracticeConstraints::new(10, 10, vec![15, 20, 30]))
    }

    #[test]
    fn test_user_prompt_layout() {
        let prompt = build_user_prompt(&example()).unwrap();
        let expected = "Build a putting practice session for this request:\n\
{
  \"constraints\": {
    \"minutes\": 10,
    \"putters\": 10,
    \"distances\": [15, 20, 30],
    \"environment\": \"indoor\"
  }
}";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_user_prompt_is_valid_json_after_header() {
        let prompt = build_user_prompt(&example()).unwrap();
        let body = prompt.strip_prefix(USER_PROMPT_HEADER).unwrap();
        let parsed: PracticeRequest = serde_json::from_str(body).unwrap();
        assert_eq!(parsed, example());
    }

    #[test]
    fn test_every_field_rendered() {
        let request = PracticeRequest::new(
            PracticeConstraints::new(45, 3, vec![33, 12, 21]).with_environment(Environment::Outdoor),
        );
        let prompt = build_user_prompt(&request).unwrap();
        assert!(prompt.contains("\"minutes\": 45"));
        assert!(prompt.contains("\"putters\": 3"));
        assert!(prompt.contains("\"distances\": [33, 12, 21]"));
        assert!(prompt.contains("\"environment\": \"outdoor\""));
    }

    #[test]
    fn test_no_foreign_distances() {
        let prompt = build_user_prompt(&example()).unwrap();
        let numbers: Vec<u32> = prompt
            .split(|c: char| !c.is_ascii_digit())
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().unwrap())
            .collect();
        // minutes and putters are both 10
        assert_eq!(numbers, vec![10, 10, 15, 20, 30]);
    }

    #[test]
    fn test_empty_distances() {
        let request = PracticeRequest::new(PracticeConstraints::new(10, 1, vec![]));
        let prompt = PracticePrompt::new(&request).unwrap();
        assert!(prompt.user.contains("\"distances\": []"));
        assert!(!prompt.user.contains("ONLY"));
        assert!(prompt.system.contains(
            "If no distances list is provided, choose sensible distances <= 35ft by default unless the user asks otherwise."
        ));
    }

    #[test]
    fn test_degenerate_values_rendered_as_is() {
        let request = PracticeRequest::new(PracticeConstraints::new(0, 0, vec![]));
        let prompt = build_user_prompt(&request).unwrap();
        assert!(prompt.contains("\"minutes\": 0"));
        assert!(prompt.contains("\"putters\": 0"));
    }

    #[test]
    fn test_unserializable_value_is_an_error() {
        let mut map = std::collections::BTreeMap::new();
        map.insert((15, 20), "tuple keys are not JSON object keys");
        let err = to_prompt_json(&map).unwrap_err();
        assert_eq!(err.kind(), dgtrainer_error::ErrorKind::SerializationFailed);
        assert_eq!(err.operation(), "prompt::to_prompt_json");
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let a = PracticePrompt::new(&example()).unwrap();
        let b = PracticePrompt::new(&example()).unwrap();
        assert_eq!(a.render(), b.render());
        assert_eq!(a.system, SYSTEM_PROMPT);
    }

    #[test]
    fn test_render_combines_both_halves() {
        let rendered = PracticePrompt::new(&example()).unwrap().render();
        assert!(rendered.starts_with("You are a disc golf putting coach."));
        assert!(rendered.contains("Make the session realistic for the time and putter count.\n\nBuild a putting"));
        assert!(rendered.ends_with("}"));
    }
}
