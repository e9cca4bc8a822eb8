//! Chat transport: the seam between the orchestrator and the model
//! API.
//!
//! [`OpenAiTransport`] talks to any OpenAI-compatible
//! `/chat/completions` endpoint, normalizing responses into
//! [`ContentBlock`]s so the orchestrator stays provider-agnostic.
//! Tests script the trait directly.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::GenError;

/// Attempt budget for the structured-generation call. Exhaustion is a
/// terminal failure for the request.
const STRUCTURED_ATTEMPTS: u32 = 3;

/// Token ceiling per model call.
const MAX_TOKENS: u32 = 4096;

// ---------------------------------------------------------------------------
// Normalized response shapes
// ---------------------------------------------------------------------------

/// A normalized piece of assistant output.
#[derive(Debug, Clone)]
pub enum ContentBlock {
    Text(String),
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
}

/// One assistant turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// The assistant message exactly as the API returned it, for
    /// appending to the conversation history.
    pub raw_message: Value,
    pub blocks: Vec<ContentBlock>,
    pub stop_reason: String,
}

impl ChatTurn {
    /// Whether the assistant asked to run at least one tool.
    pub fn has_tool_use(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Model API operations the orchestrator needs.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// One tool-augmented chat round. `messages` are OpenAI-format
    /// message objects; `tools` is an OpenAI-format tool array.
    async fn chat(
        &self,
        system: &str,
        messages: &[Value],
        tools: &Value,
    ) -> Result<ChatTurn, GenError>;

    /// Structured generation against a JSON-schema contract. Retries
    /// internally; exhaustion maps to [`GenError::NoObject`].
    async fn generate_structured(
        &self,
        system: &str,
        messages: &[Value],
        schema_name: &str,
        schema: &Value,
    ) -> Result<Value, GenError>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible implementation
// ---------------------------------------------------------------------------

/// HTTP transport for OpenAI-compatible chat-completions APIs.
pub struct OpenAiTransport {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiTransport {
    /// * `base_url` - API base, e.g. `https://api.openai.com/v1`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn post(&self, body: &Value) -> Result<Value, GenError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    fn messages_with_system(&self, system: &str, messages: &[Value]) -> Vec<Value> {
        let mut all = Vec::with_capacity(messages.len() + 1);
        all.push(json!({ "role": "system", "content": system }));
        all.extend_from_slice(messages);
        all
    }
}

#[async_trait]
impl ChatTransport for OpenAiTransport {
    async fn chat(
        &self,
        system: &str,
        messages: &[Value],
        tools: &Value,
    ) -> Result<ChatTurn, GenError> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": self.messages_with_system(system, messages),
            "tools": tools,
        });

        let response = self.post(&body).await?;
        parse_chat_response(&response)
    }

    async fn generate_structured(
        &self,
        system: &str,
        messages: &[Value],
        schema_name: &str,
        schema: &Value,
    ) -> Result<Value, GenError> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": self.messages_with_system(system, messages),
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "strict": true,
                    "schema": schema,
                },
            },
        });

        for attempt in 1..=STRUCTURED_ATTEMPTS {
            match self.post(&body).await {
                Ok(response) => {
                    if let Some(object) = extract_structured_object(&response) {
                        return Ok(object);
                    }
                    tracing::warn!(attempt, "Structured generation returned no object");
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Structured generation call failed");
                }
            }
        }

        Err(GenError::NoObject {
            attempts: STRUCTURED_ATTEMPTS,
        })
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Normalize a chat-completions response into content blocks and a
/// stop reason.
fn parse_chat_response(response: &Value) -> Result<ChatTurn, GenError> {
    let choice = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .ok_or_else(|| GenError::Api {
            status: 200,
            body: "No choices in chat response".to_string(),
        })?;

    let message = choice.get("message").cloned().ok_or_else(|| GenError::Api {
        status: 200,
        body: "No message in chat choice".to_string(),
    })?;

    let mut blocks = Vec::new();

    if let Some(text) = message.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            blocks.push(ContentBlock::Text(text.to_string()));
        }
    }

    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for call in tool_calls {
            let function = call.get("function").cloned().unwrap_or(Value::Null);
            let arguments = function
                .get("arguments")
                .and_then(Value::as_str)
                .unwrap_or("{}");
            let input: Value = serde_json::from_str(arguments).unwrap_or(Value::Null);

            blocks.push(ContentBlock::ToolUse {
                id: call
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                name: function
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                input,
            });
        }
    }

    let stop_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .unwrap_or("stop")
        .to_string();

    Ok(ChatTurn {
        raw_message: message,
        blocks,
        stop_reason,
    })
}

/// Pull the structured object out of a chat-completions response.
/// Returns `None` when the content is absent or not a JSON object.
fn extract_structured_object(response: &Value) -> Option<Value> {
    let content = response
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()?;

    let parsed: Value = serde_json::from_str(content).ok()?;
    parsed.is_object().then_some(parsed)
}
