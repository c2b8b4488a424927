//! Agent implementation - asks the model for typed output and checks it

use crate::model::{PracticeRequest, PracticeSession};
use crate::output::{extract_json, OutputSchema};
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};
use crate::validate::constraint_violations;
use dgtrainer_error::{Error, Result};
use dgtrainer_llm::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, ToolChoice, ToolDefinition,
    Usage,
};
use tracing::{debug, info, warn};

/// Name of the tool the model must call with its answer
pub const OUTPUT_TOOL: &str = "final_result";

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Extra attempts after a rejected output
    pub max_retries: usize,
    /// Model override; the provider default otherwise
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl AgentConfig {
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Result from a successful run
#[derive(Debug, Clone)]
pub struct AgentRun<T> {
    pub output: T,
    /// Calls made to the provider, including the accepted one
    pub attempts: usize,
    /// Token usage summed over every attempt
    pub usage: Usage,
    /// Model that produced the accepted output
    pub model: String,
}

type Validator<T> = Box<dyn Fn(&T) -> Vec<String> + Send + Sync>;

/// An agent that only ends when the model returns a valid `T`.
///
/// The model is forced to call the `final_result` tool whose parameters are
/// `T`'s JSON schema. Outputs that fail to parse or validate are sent back
/// with the problems listed, at most `max_retries` times.
pub struct StructuredAgent<P, T> {
    provider: P,
    system_prompt: String,
    config: AgentConfig,
    validators: Vec<Validator<T>>,
}

impl<P: LlmProvider, T: OutputSchema> StructuredAgent<P, T> {
    pub fn new(provider: P, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            config: AgentConfig::default(),
            validators: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a check on top of `T::validate`; any returned problem rejects the output
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&T) -> Vec<String> + Send + Sync + 'static,
    {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn output_tool(&self) -> ToolDefinition {
        ToolDefinition::new(OUTPUT_TOOL, T::TOOL_DESCRIPTION).with_parameters(T::tool_parameters())
    }

    /// Run one prompt to a validated output
    pub async fn run(&self, user_prompt: &str) -> Result<AgentRun<T>> {
        let max_attempts = self.config.max_retries.saturating_add(1);
        let mut messages = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(user_prompt),
        ];
        let mut usage = Usage::default();
        let mut problems = Vec::new();

        for attempt in 1..=max_attempts {
            info!(
                provider = self.provider.name(),
                attempt, max_attempts, "requesting structured output"
            );
            debug!(messages = messages.len(), "sending completion request");

            let response = self
                .provider
                .complete(self.build_request(messages.clone()))
                .await
                .map_err(|e| {
                    Error::from(e)
                        .with_operation("agent::run")
                        .with_context("attempt", attempt.to_string())
                })?;
            usage.add(&response.usage);

            debug!(
                tool_calls = response.tool_calls.len(),
                content_len = response.content.as_deref().map_or(0, str::len),
                "received completion"
            );

            match self.accept(&response) {
                Ok(output) => {
                    return Ok(AgentRun {
                        output,
                        attempts: attempt,
                        usage,
                        model: response.model,
                    });
                }
                Err(rejected) => {
                    warn!(attempt, problems = ?rejected, "model output rejected");
                    messages.extend(retry_messages(&response, &rejected));
                    problems = rejected;
                }
            }
        }

        Err(Error::output_invalid(format!(
            "model output still invalid after {} attempt(s): {}",
            max_attempts,
            problems.join("; ")
        ))
        .with_operation("agent::run")
        .with_context("attempts", max_attempts.to_string())
        .persist())
    }

    fn build_request(&self, messages: Vec<ChatMessage>) -> CompletionRequest {
        let mut request = CompletionRequest::new(messages)
            .with_tools(vec![self.output_tool()])
            .with_tool_choice(ToolChoice::Function {
                name: OUTPUT_TOOL.into(),
            });
        if let Some(model) = &self.config.model {
            request = request.with_model(model.clone());
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }

    /// Parse and validate one response. The tool call wins over text content.
    fn accept(&self, response: &CompletionResponse) -> std::result::Result<T, Vec<String>> {
        let output: T = if let Some(call) = response.tool_call(OUTPUT_TOOL) {
            call.parse_arguments()
                .map_err(|e| vec![format!("invalid {} arguments: {}", OUTPUT_TOOL, e)])?
        } else if let Some(text) = response.content.as_deref().filter(|t| !t.trim().is_empty()) {
            serde_json::from_str(extract_json(text))
                .map_err(|e| vec![format!("response is not valid output JSON: {}", e)])?
        } else {
            return Err(vec![format!("no output: call the {} tool with the result", OUTPUT_TOOL)]);
        };

        let mut problems = output.validate();
        for validator in &self.validators {
            problems.extend(validator(&output));
        }

        if problems.is_empty() {
            Ok(output)
        } else {
            Err(problems)
        }
    }
}

fn feedback(problems: &[String]) -> String {
    let mut text = String::from("Validation failed:\n");
    for problem in problems {
        text.push_str("- ");
        text.push_str(problem);
        text.push('\n');
    }
    text.push_str("\nFix the errors and try again.");
    text
}

/// Replay the rejected turn and answer it with the problems found
fn retry_messages(response: &CompletionResponse, problems: &[String]) -> Vec<ChatMessage> {
    let feedback = feedback(problems);

    if response.tool_calls.is_empty() {
        let mut messages = Vec::new();
        if let Some(text) = response.content.as_deref().filter(|t| !t.trim().is_empty()) {
            messages.push(ChatMessage::assistant(text));
        }
        messages.push(ChatMessage::user(feedback));
        return messages;
    }

    let mut messages = vec![ChatMessage::assistant_tool_calls(
        response.content.clone(),
        response.tool_calls.clone(),
    )];
    for call in &response.tool_calls {
        let content = if call.name == OUTPUT_TOOL {
            feedback.clone()
        } else {
            format!("Unknown tool '{}'. Call {} with the result.", call.name, OUTPUT_TOOL)
        };
        messages.push(ChatMessage::tool_result(call.id.clone(), content));
    }
    messages
}

/// Ask the model for a practice session that fits `request`.
///
/// Sessions are checked on their own and against the request's constraints;
/// violations of either go back to the model as retry feedback.
pub async fn plan_session<P: LlmProvider>(
    provider: P,
    request: &PracticeRequest,
    config: AgentConfig,
) -> Result<AgentRun<PracticeSession>> {
    let constraints = request.constraints.clone();
    let agent = StructuredAgent::new(provider, SYSTEM_PROMPT)
        .with_config(config)
        .with_validator(move |session: &PracticeSession| {
            constraint_violations(session, &constraints)
                .iter()
                .map(|v| v.to_string())
                .collect()
        });

    agent.run(&build_user_prompt(request)?).await
}
