//! Anthropic Messages API provider

use super::*;
use crate::config::ProviderConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Anthropic requires `max_tokens` on every request
const DEFAULT_MAX_TOKENS: usize = 4096;

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = http_client(config.timeout_secs.unwrap_or(120))?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or("https://api.anthropic.com/v1")
    }

    fn build_request(&self, request: CompletionRequest) -> MessagesBody {
        let mut system = None;
        let mut turns: Vec<Turn> = Vec::new();

        for msg in request.messages {
            match msg.role {
                // The system prompt travels outside the message list
                Role::System => system = msg.content,
                // Results for one assistant turn go back together in a single user turn
                Role::Tool => {
                    let block = Block::ToolResult {
                        tool_use_id: msg.tool_call_id.unwrap_or_default(),
                        content: msg.content.unwrap_or_default(),
                    };
                    if turns.last().is_some_and(Turn::carries_tool_results) {
                        if let Some(turn) = turns.last_mut() {
                            turn.content.push(block);
                        }
                    } else {
                        turns.push(Turn {
                            role: "user",
                            content: vec![block],
                        });
                    }
                }
                Role::User | Role::Assistant => turns.push(Turn::from(msg)),
            }
        }

        MessagesBody {
            model: request.model.unwrap_or_else(|| self.default_model().to_string()),
            system,
            messages: turns,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            tools: request.tools.map(|tools| {
                tools
                    .into_iter()
                    .map(|t| WireTool {
                        name: t.name,
                        description: t.description,
                        input_schema: t.parameters,
                    })
                    .collect()
            }),
            tool_choice: request.tool_choice.map(WireToolChoice::from),
            stop_sequences: request.stop,
        }
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn models(&self) -> Vec<String> {
        vec![
            "claude-sonnet-4-0".into(),
            "claude-opus-4-0".into(),
            "claude-3-7-sonnet-latest".into(),
            "claude-3-5-haiku-latest".into(),
        ]
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or("claude-sonnet-4-0")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::AuthenticationFailed)?;

        let body = self.build_request(request);
        debug!(model = %body.model, turns = body.messages.len(), "anthropic request");

        // anthropic-version comes from the config headers
        let mut http = self
            .client
            .post(format!("{}/messages", self.base_url()))
            .header("x-api-key", api_key)
            .json(&body);
        for (name, value) in &self.config.headers {
            http = http.header(name, value);
        }

        let response = http
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let retry_after = retry_after_secs(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, text));
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        debug!(id = %message.id, stop_reason = ?message.stop_reason, "anthropic response");

        Ok(message.into())
    }
}

// ============================================================================
// Messages API wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesBody {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Turn>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<WireToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

/// One conversation turn; content is always sent in block form
#[derive(Debug, Serialize)]
struct Turn {
    role: &'static str,
    content: Vec<Block>,
}

impl Turn {
    fn carries_tool_results(&self) -> bool {
        self.role == "user"
            && self
                .content
                .iter()
                .all(|block| matches!(block, Block::ToolResult { .. }))
    }
}

impl From<ChatMessage> for Turn {
    fn from(msg: ChatMessage) -> Self {
        let role = if msg.role == Role::Assistant { "assistant" } else { "user" };

        let mut content = Vec::new();
        if let Some(text) = msg.content.filter(|t| !t.is_empty()) {
            content.push(Block::Text { text });
        }
        for call in msg.tool_calls.unwrap_or_default() {
            // A call whose arguments were not JSON is replayed with empty input
            let input = serde_json::from_str(&call.arguments)
                .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));
            content.push(Block::ToolUse {
                id: call.id,
                name: call.name,
                input,
            });
        }

        Self { role, content }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text { text: String },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult { tool_use_id: String, content: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize)]
struct WireTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireToolChoice {
    Auto,
    None,
    Any,
    Tool { name: String },
}

impl From<ToolChoice> for WireToolChoice {
    fn from(choice: ToolChoice) -> Self {
        match choice {
            ToolChoice::Auto => WireToolChoice::Auto,
            ToolChoice::None => WireToolChoice::None,
            ToolChoice::Required => WireToolChoice::Any,
            ToolChoice::Function { name } => WireToolChoice::Tool { name },
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
    model: String,
    content: Vec<Block>,
    stop_reason: Option<String>,
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: usize,
    output_tokens: usize,
}

fn finish_reason(stop_reason: Option<&str>) -> FinishReason {
    match stop_reason {
        Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some("tool_use") => FinishReason::ToolCalls,
        Some("refusal") => FinishReason::ContentFilter,
        _ => FinishReason::Unknown,
    }
}

impl From<MessageResponse> for CompletionResponse {
    fn from(message: MessageResponse) -> Self {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in message.content {
            match block {
                Block::Text { text: part } => text.push_str(&part),
                Block::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments: input.to_string(),
                }),
                Block::ToolResult { .. } | Block::Unknown => {}
            }
        }

        let usage = Usage {
            prompt_tokens: message.usage.input_tokens,
            completion_tokens: message.usage.output_tokens,
            total_tokens: message.usage.input_tokens + message.usage.output_tokens,
        };

        CompletionResponse {
            id: message.id,
            model: message.model,
            content: Some(text).filter(|t| !t.is_empty()),
            tool_calls,
            finish_reason: finish_reason(message.stop_reason.as_deref()),
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(ProviderConfig::anthropic("sk-ant-test")).unwrap()
    }

    #[test]
    fn test_build_request_extracts_system_and_tool_choice() {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("You are a disc golf putting coach."),
            ChatMessage::user("Build a session"),
        ])
        .with_tools(vec![ToolDefinition::new("final_result", "The final response")])
        .with_tool_choice(ToolChoice::Function { name: "final_result".into() });

        let api = serde_json::to_value(provider().build_request(request)).unwrap();

        assert_eq!(api["system"], "You are a disc golf putting coach.");
        assert_eq!(api["model"], "claude-sonnet-4-0");
        assert_eq!(api["max_tokens"], 4096);
        assert_eq!(api["messages"].as_array().unwrap().len(), 1);
        assert_eq!(api["messages"][0]["role"], "user");
        assert_eq!(api["messages"][0]["content"][0]["text"], "Build a session");
        assert_eq!(api["tools"][0]["name"], "final_result");
        assert!(api["tools"][0]["input_schema"].is_object());
        assert_eq!(api["tool_choice"], serde_json::json!({ "type": "tool", "name": "final_result" }));
    }

    #[test]
    fn test_retry_turns_use_tool_blocks() {
        let calls = vec![
            ToolCall {
                id: "toolu_1".into(),
                name: "final_result".into(),
                arguments: r#"{"focus":"pace"}"#.into(),
            },
            ToolCall {
                id: "toolu_2".into(),
                name: "lookup".into(),
                arguments: "not json".into(),
            },
        ];
        let request = CompletionRequest::new(vec![
            ChatMessage::system("rules"),
            ChatMessage::user("Build a session"),
            ChatMessage::assistant_tool_calls(None, calls),
            ChatMessage::tool_result("toolu_1", "drills: expected 2 to 5 drills, got 6"),
            ChatMessage::tool_result("toolu_2", "Unknown tool"),
        ]);

        let api = serde_json::to_value(provider().build_request(request)).unwrap();
        let turns = api["messages"].as_array().unwrap();
        assert_eq!(turns.len(), 3);

        assert_eq!(turns[1]["role"], "assistant");
        assert_eq!(turns[1]["content"][0]["type"], "tool_use");
        assert_eq!(turns[1]["content"][0]["input"]["focus"], "pace");
        assert_eq!(turns[1]["content"][1]["input"], serde_json::json!({}));

        assert_eq!(turns[2]["role"], "user");
        let results = turns[2]["content"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["type"], "tool_result");
        assert_eq!(results[0]["tool_use_id"], "toolu_1");
        assert_eq!(results[1]["tool_use_id"], "toolu_2");
    }

    #[test]
    fn test_tool_choice_modes() {
        let any = serde_json::to_value(WireToolChoice::from(ToolChoice::Required)).unwrap();
        assert_eq!(any, serde_json::json!({ "type": "any" }));
        let auto = serde_json::to_value(WireToolChoice::from(ToolChoice::Auto)).unwrap();
        assert_eq!(auto, serde_json::json!({ "type": "auto" }));
    }

    #[test]
    fn test_parse_tool_use_response() {
        let raw = serde_json::json!({
            "id": "msg_1",
            "model": "claude-sonnet-4-0",
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "tool_use", "id": "toolu_1", "name": "final_result",
                  "input": { "total_minutes": 10 } }
            ],
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 400, "output_tokens": 120 }
        });
        let response: CompletionResponse =
            serde_json::from_value::<MessageResponse>(raw).unwrap().into();

        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert!(response.content.is_none());
        let call = response.tool_call("final_result").unwrap();
        assert_eq!(call.id, "toolu_1");
        let args: serde_json::Value = call.parse_arguments().unwrap();
        assert_eq!(args["total_minutes"], 10);
        assert_eq!(response.usage.total_tokens, 520);
    }

    #[test]
    fn test_parse_text_response() {
        let raw = serde_json::json!({
            "id": "msg_2",
            "model": "claude-sonnet-4-0",
            "content": [{ "type": "text", "text": "{\"focus\": \"pace\"}" }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 10, "output_tokens": 5 }
        });
        let response: CompletionResponse =
            serde_json::from_value::<MessageResponse>(raw).unwrap().into();
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.content.as_deref(), Some("{\"focus\": \"pace\"}"));
        assert!(response.tool_calls.is_empty());
    }
}
