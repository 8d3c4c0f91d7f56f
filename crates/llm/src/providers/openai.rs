//! Schema-native provider for OpenAI-compatible chat completion APIs.
//!
//! The schema is sent as a strict `json_schema` response format, so the
//! backend constrains its own output. The returned JSON is still checked
//! against the schema before it is handed back.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{GenerationRequest, GenerationResult, StructuredProvider};
use crate::error::ProviderError;
use crate::types::{ProviderKind, SchemaNativeSettings};

const PROVIDER: &str = "openai";
const MAX_ERROR_MESSAGE_LEN: usize = 256;

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Schema-native structured provider.
pub struct SchemaNativeProvider {
    api_key: String,
    base_url: String,
    model: String,
    reasoning_effort: Option<String>,
    client: reqwest::Client,
}

impl SchemaNativeProvider {
    /// Build a provider from settings; fails if no API key is configured.
    pub fn from_settings(settings: &SchemaNativeSettings) -> Result<Self, ProviderError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or(ProviderError::CredentialsMissing {
                provider: PROVIDER,
                variable: "OPENAI_KEY",
            })?;

        Ok(Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            reasoning_effort: settings.reasoning_effort().map(str::to_string),
            client: reqwest::Client::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_chat_request<'a>(&'a self, request: &'a GenerationRequest<'_>) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: request.schema.name(),
                    schema: request.schema.definition(),
                    strict: true,
                },
            },
            reasoning_effort: self.reasoning_effort.as_deref(),
        }
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::request_failed(PROVIDER, format!("transport error: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::request_failed(PROVIDER, format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(map_http_error(status, &text));
        }

        Ok(text)
    }

    fn parse_response(
        &self,
        request: &GenerationRequest<'_>,
        body: &str,
    ) -> Result<GenerationResult, ProviderError> {
        let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
            ProviderError::request_failed(PROVIDER, format!("failed to decode response: {}", e))
        })?;

        let message = response.choices.into_iter().find_map(|choice| choice.message);

        if let Some(refusal) = message.as_ref().and_then(|m| m.refusal.as_deref()) {
            tracing::warn!(provider = PROVIDER, refusal, "Model refused the request");
            return Err(ProviderError::NoContentReturned { provider: PROVIDER });
        }

        let content = message
            .and_then(|m| m.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::NoContentReturned { provider: PROVIDER })?;

        let value: Value = serde_json::from_str(&content).map_err(|e| {
            tracing::error!(provider = PROVIDER, raw = %content, "Structured output is not JSON");
            ProviderError::SchemaValidationFailed {
                schema: request.schema.name().to_string(),
                message: format!("invalid JSON: {}", e),
                raw: content.clone(),
            }
        })?;

        GenerationResult::validated(request.schema, value, &content)
    }
}

#[async_trait::async_trait]
impl StructuredProvider for SchemaNativeProvider {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::SchemaNative
    }

    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GenerationResult, ProviderError> {
        if request.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        tracing::info!(
            model = self.model(),
            schema = request.schema.name(),
            "Sending structured request to OpenAI"
        );

        let body = self.to_chat_request(request);
        tracing::debug!("Request: {:?}", body);

        let text = match &request.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::info!("Structured request cancelled");
                    return Err(ProviderError::Cancelled);
                }
                result = self.send(&body) => result?,
            },
            None => self.send(&body).await?,
        };

        tracing::debug!("Response: {}", text);
        self.parse_response(request, &text)
    }
}

fn map_http_error(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| truncate_message(body));

    ProviderError::request_failed(PROVIDER, format!("API error ({}): {}", status, message))
}

fn truncate_message(body: &str) -> String {
    let compact = body.trim().replace('\n', " ");
    compact.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}
