//! OpenAI-compatible provider implementation
//!
//! Works with OpenAI, Azure OpenAI, vLLM, Ollama, and other OpenAI-compatible APIs.

use super::*;
use crate::config::ProviderConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = http_client(config.timeout_secs.unwrap_or(120))?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or("https://api.openai.com/v1")
    }

    fn build_request(&self, request: CompletionRequest) -> ChatCompletionBody {
        ChatCompletionBody {
            model: request.model.unwrap_or_else(|| self.default_model().to_string()),
            messages: request.messages.into_iter().map(WireMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools: request
                .tools
                .map(|tools| tools.into_iter().map(WireTool::from).collect()),
            tool_choice: request.tool_choice.map(WireToolChoice::from),
            stop: request.stop,
        }
    }
}

impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn models(&self) -> Vec<String> {
        vec![
            "gpt-4o".into(),
            "gpt-4o-mini".into(),
            "gpt-4.1".into(),
            "gpt-4.1-mini".into(),
        ]
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or("gpt-4o")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let body = self.build_request(request);
        debug!(model = %body.model, messages = body.messages.len(), "openai request");

        let mut http = self
            .client
            .post(format!("{}/chat/completions", self.base_url()))
            .json(&body);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            http = http.bearer_auth(key);
        }
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

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        debug!(id = %completion.id, choices = completion.choices.len(), "openai response");

        completion.try_into()
    }
}

// ============================================================================
// Chat Completions wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionBody {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<WireToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

/// One message; the role names match `Role`'s serde form
#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<ChatMessage> for WireMessage {
    fn from(msg: ChatMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content,
            tool_calls: msg
                .tool_calls
                .map(|calls| calls.into_iter().map(WireToolCall::from).collect()),
            tool_call_id: msg.tool_call_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireTool {
    Function { function: WireFunction },
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

impl From<ToolDefinition> for WireTool {
    fn from(tool: ToolDefinition) -> Self {
        WireTool::Function {
            function: WireFunction {
                name: tool.name,
                description: tool.description,
                parameters: tool.parameters,
            },
        }
    }
}

/// `"auto"`/`"none"`/`"required"`, or a named function
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireToolChoice {
    Mode(&'static str),
    Named(NamedFunction),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum NamedFunction {
    Function { function: FunctionName },
}

#[derive(Debug, Serialize)]
struct FunctionName {
    name: String,
}

impl From<ToolChoice> for WireToolChoice {
    fn from(choice: ToolChoice) -> Self {
        match choice {
            ToolChoice::Auto => WireToolChoice::Mode("auto"),
            ToolChoice::None => WireToolChoice::Mode("none"),
            ToolChoice::Required => WireToolChoice::Mode("required"),
            ToolChoice::Function { name } => WireToolChoice::Named(NamedFunction::Function {
                function: FunctionName { name },
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".into()
}

impl From<ToolCall> for WireToolCall {
    fn from(call: ToolCall) -> Self {
        Self {
            id: call.id,
            kind: function_type(),
            function: WireFunctionCall {
                name: call.name,
                arguments: call.arguments,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    id: String,
    model: String,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

fn finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Unknown,
    }
}

impl TryFrom<ChatCompletion> for CompletionResponse {
    type Error = ProviderError;

    fn try_from(completion: ChatCompletion) -> Result<Self, ProviderError> {
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("completion has no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        let usage = completion
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: completion.id,
            model: completion.model,
            content: choice.message.content,
            tool_calls,
            finish_reason: finish_reason(choice.finish_reason.as_deref()),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_forces_function() {
        let provider = OpenAIProvider::new(
            ProviderConfig::openai("sk-test").with_model("gpt-4o-mini"),
        )
        .unwrap();
        let request = CompletionRequest::new(vec![
            ChatMessage::system("rules"),
            ChatMessage::user("Build a session"),
        ])
        .with_tools(vec![ToolDefinition::new("final_result", "The final response")])
        .with_tool_choice(ToolChoice::Function { name: "final_result".into() });

        let api = serde_json::to_value(provider.build_request(request)).unwrap();

        assert_eq!(api["model"], "gpt-4o-mini");
        assert_eq!(api["messages"][0]["role"], "system");
        assert_eq!(api["tools"][0]["type"], "function");
        assert_eq!(api["tools"][0]["function"]["name"], "final_result");
        assert_eq!(api["tool_choice"]["function"]["name"], "final_result");
        assert!(api.get("temperature").is_none());
    }

    #[test]
    fn test_parse_tool_call_response() {
        let raw = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "final_result", "arguments": "{\"focus\":\"circle 1\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        });
        let response = CompletionResponse::try_from(
            serde_json::from_value::<ChatCompletion>(raw).unwrap(),
        )
        .unwrap();

        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].arguments, "{\"focus\":\"circle 1\"}");
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[test]
    fn test_retry_turns_serialize_as_tool_messages() {
        let call = ToolCall {
            id: "call_9".into(),
            name: "final_result".into(),
            arguments: "{}".into(),
        };
        let assistant = serde_json::to_value(WireMessage::from(ChatMessage::assistant_tool_calls(
            None,
            vec![call],
        )))
        .unwrap();
        assert_eq!(assistant["role"], "assistant");
        assert!(assistant.get("content").is_none());
        assert_eq!(assistant["tool_calls"][0]["type"], "function");
        assert_eq!(assistant["tool_calls"][0]["function"]["name"], "final_result");

        let result = serde_json::to_value(WireMessage::from(ChatMessage::tool_result(
            "call_9",
            "Validation failed",
        )))
        .unwrap();
        assert_eq!(result["role"], "tool");
        assert_eq!(result["tool_call_id"], "call_9");
    }

    #[test]
    fn test_tool_choice_modes() {
        let auto = serde_json::to_value(WireToolChoice::from(ToolChoice::Auto)).unwrap();
        assert_eq!(auto, serde_json::json!("auto"));
        let named = serde_json::to_value(WireToolChoice::from(ToolChoice::Function {
            name: "final_result".into(),
        }))
        .unwrap();
        assert_eq!(
            named,
            serde_json::json!({ "type": "function", "function": { "name": "final_result" } })
        );
    }

    #[test]
    fn test_empty_choices_is_error() {
        let raw = serde_json::json!({ "id": "x", "model": "gpt-4o", "choices": [] });
        let result = CompletionResponse::try_from(serde_json::from_value::<ChatCompletion>(raw).unwrap());
        assert!(matches!(result, Err(ProviderError::Parse(_))));
    }
}
