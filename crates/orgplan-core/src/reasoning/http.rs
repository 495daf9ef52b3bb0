//! OpenAI-compatible chat-completions client with structured output.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ReasoningClient, ReasoningError, ReasoningRequest, truncate_for_log};
use crate::config::PlannerConfig;

const MAX_ERROR_BODY_CHARS: usize = 2_000;

/// Reasoning client for any endpoint speaking the chat-completions
/// protocol with `response_format: json_schema`.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ChatCompletionsClient {
    pub fn new(config: &PlannerConfig) -> Result<Self, ReasoningError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ReasoningError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, ReasoningError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| ReasoningError::Transport(e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a serde_json::Value,
    strict: bool,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

fn build_body(request: &ReasoningRequest) -> ChatRequest<'_> {
    ChatRequest {
        model: &request.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: &request.system,
            },
            ChatMessage {
                role: "user",
                content: &request.user,
            },
        ],
        temperature: request.temperature,
        response_format: ResponseFormat {
            kind: "json_schema",
            json_schema: JsonSchemaFormat {
                name: &request.schema_name,
                schema: &request.schema,
                strict: true,
            },
        },
    }
}

fn extract_content(body: &str) -> Result<String, ReasoningError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| ReasoningError::Response(e.to_string()))?;
    let message = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| ReasoningError::Response("missing choices".to_owned()))?;
    if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
        return Err(ReasoningError::Response(format!("model refused: {refusal}")));
    }
    message
        .content
        .ok_or_else(|| ReasoningError::Response("missing message content".to_owned()))
}

#[async_trait]
impl ReasoningClient for ChatCompletionsClient {
    fn name(&self) -> &str {
        "chat-completions"
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ReasoningError> {
        debug!(endpoint = %self.endpoint, model = %request.model, "sending reasoning request");
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| ReasoningError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ReasoningError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ReasoningError::Response(format!(
                "HTTP {status}: {}",
                truncate_for_log(&text, MAX_ERROR_BODY_CHARS)
            )));
        }
        extract_content(&text)
    }
}
