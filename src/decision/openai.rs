//! Decision-maker backed by the OpenAI Chat Completions API with tool binding.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::http::{bearer_headers, shared_client, status_to_error};
use super::{Decision, DecisionMaker};
use crate::config::{MathChatConfig, DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL};
use crate::error::MathChatError;
use crate::operations::OperationSpec;
use crate::types::{Message, OperationRequest, Role, Usage};
use crate::util::{with_timeout, RetryPolicy};

/// Chat Completions client that exposes the operation catalog as `tools`.
#[derive(Debug, Clone)]
pub struct OpenAiDecisionMaker {
    api_key: String,
    base_url: String,
    model: String,
    retry_policy: RetryPolicy,
    timeout: Duration,
}

impl OpenAiDecisionMaker {
    pub fn new(api_key: String) -> Self {
        Self::new_with_base_url(api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn new_with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            retry_policy: RetryPolicy::default(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Build from configuration. Fails when no API key is configured.
    pub fn from_config(config: &MathChatConfig) -> Result<Self, MathChatError> {
        let api_key = config
            .openai_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                MathChatError::Configuration(
                    "OPENAI_API_KEY is not set; export it or add it to .env".into(),
                )
            })?;
        Ok(Self::new_with_base_url(api_key, config.openai_base_url.clone())
            .with_model(config.model.clone())
            .with_retry_policy(config.retry.clone())
            .with_timeout(Duration::from_millis(config.request_timeout_ms)))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request_body(
        &self,
        history: &[Message],
        operations: &[OperationSpec],
    ) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = history.iter().map(message_to_openai).collect();
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if !operations.is_empty() {
            let tools: Vec<serde_json::Value> = operations
                .iter()
                .map(|op| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": op.name,
                            "description": op.description,
                            "parameters": op.parameters.schema,
                        }
                    })
                })
                .collect();
            body["tools"] = tools.into();
        }

        body
    }

    async fn decide_once(&self, body: &serde_json::Value) -> Result<Decision, MathChatError> {
        let url = format!("{}/chat/completions", self.base_url);
        with_timeout(self.timeout, async {
            let response = shared_client()
                .post(&url)
                .headers(bearer_headers(&self.api_key))
                .json(body)
                .send()
                .await?;

            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                let body_text = response.text().await.unwrap_or_default();
                return Err(status_to_error(status, &body_text));
            }

            let data: OpenAiChatResponse = response.json().await?;
            parse_chat_response(data)
        })
        .await
    }
}

#[async_trait]
impl DecisionMaker for OpenAiDecisionMaker {
    async fn decide(
        &self,
        history: &[Message],
        operations: &[OperationSpec],
    ) -> Result<Decision, MathChatError> {
        let body = self.build_request_body(history, operations);
        debug!(
            model = %self.model,
            messages = history.len(),
            tools = operations.len(),
            "OpenAI decide"
        );

        self.retry_policy
            .execute(|| self.decide_once(&body))
            .await
            .map_err(|e| match e {
                MathChatError::Authentication(_)
                | MathChatError::Configuration(_)
                | MathChatError::Cancelled => e,
                other => MathChatError::DecisionMakerUnavailable {
                    message: other.to_string(),
                },
            })
    }
}

fn parse_chat_response(data: OpenAiChatResponse) -> Result<Decision, MathChatError> {
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| MathChatError::api(200, "No choices in OpenAI response"))?;

    let requests = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            OperationRequest::new(
                tc.id,
                tc.function.name,
                serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::String(tc.function.arguments)),
            )
        })
        .collect();

    let usage = data
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(Decision::from_parts(
        choice.message.content.unwrap_or_default(),
        requests,
        usage,
    ))
}

fn message_to_openai(msg: &Message) -> serde_json::Value {
    match msg.role {
        Role::System => serde_json::json!({ "role": "system", "content": msg.content }),
        Role::User => serde_json::json!({ "role": "user", "content": msg.content }),
        Role::Assistant if msg.has_requests() => {
            let tool_calls: Vec<serde_json::Value> = msg
                .requests
                .iter()
                .map(|req| {
                    let arguments = match &req.arguments {
                        serde_json::Value::String(raw) => raw.clone(),
                        other => other.to_string(),
                    };
                    serde_json::json!({
                        "id": req.id,
                        "type": "function",
                        "function": { "name": req.name, "arguments": arguments },
                    })
                })
                .collect();
            let content = if msg.content.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::String(msg.content.clone())
            };
            serde_json::json!({ "role": "assistant", "content": content, "tool_calls": tool_calls })
        }
        Role::Assistant => serde_json::json!({ "role": "assistant", "content": msg.content }),
        Role::Tool => serde_json::json!({
            "role": "tool",
            "tool_call_id": msg.result.as_ref().map(|r| r.request_id.as_str()).unwrap_or_default(),
            "content": msg.content,
        }),
    }
}

// OpenAI API response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
