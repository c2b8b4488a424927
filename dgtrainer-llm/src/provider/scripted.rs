//! Scripted provider: replays queued responses instead of calling a model.

use super::*;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// A provider that answers from a queue of canned responses and records
/// every request it receives.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: CompletionResponse) -> &Self {
        lock(&self.responses).push_back(Ok(response));
        self
    }

    /// Queue a response whose only content is a call to `tool` with `arguments`
    pub fn push_tool_call(&self, tool: &str, arguments: serde_json::Value) -> &Self {
        let n = self.queued() + self.requests().len();
        self.push_response(CompletionResponse {
            id: format!("scripted-{}", n),
            model: "scripted".into(),
            content: None,
            tool_calls: vec![ToolCall {
                id: format!("call_{}", n),
                name: tool.into(),
                arguments: arguments.to_string(),
            }],
            finish_reason: FinishReason::ToolCalls,
            usage: Usage::default(),
        })
    }

    /// Queue a plain text response
    pub fn push_text(&self, text: impl Into<String>) -> &Self {
        let n = self.queued() + self.requests().len();
        self.push_response(CompletionResponse {
            id: format!("scripted-{}", n),
            model: "scripted".into(),
            content: Some(text.into()),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        })
    }

    pub fn push_error(&self, error: ProviderError) -> &Self {
        lock(&self.responses).push_back(Err(error));
        self
    }

    /// Number of responses not yet consumed
    pub fn queued(&self) -> usize {
        lock(&self.responses).len()
    }

    /// Snapshot of the requests received so far, in order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn models(&self) -> Vec<String> {
        vec!["scripted".into()]
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        lock(&self.requests).push(request);
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Other("scripted provider has no responses left".into())))
    }
}
