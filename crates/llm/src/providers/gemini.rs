//! Text-extraction provider for the Gemini `generateContent` API.
//!
//! Gemini is driven through free text: the prompt asks for a reasoning block
//! followed by a `<REPORT>` or `<JSON>` block, the block is extracted, JSON
//! output is repaired and parsed, and the value is validated against the
//! schema. Nothing is returned unless validation passes.
//!
//! Gemini API: https://ai.google.dev/api/generate-content

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::{GenerationRequest, GenerationResult, StructuredProvider};
use crate::error::ProviderError;
use crate::extract::TagExtractor;
use crate::prompt::{TaggedPrompts, TaggedShape};
use crate::repair::RepairPipeline;
use crate::types::{ProviderKind, TextExtractionSettings};

const PROVIDER: &str = "gemini";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Text-extraction structured provider.
pub struct TextExtractionProvider {
    api_key: String,
    base_url: String,
    model: String,
    prompts: TaggedPrompts,
    repairs: RepairPipeline,
    report_tag: TagExtractor,
    json_tag: TagExtractor,
    client: reqwest::Client,
}

impl TextExtractionProvider {
    /// Build a provider from settings; fails if no API key is configured.
    pub fn from_settings(settings: &TextExtractionSettings) -> Result<Self, ProviderError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or(ProviderError::CredentialsMissing {
                provider: PROVIDER,
                variable: "GOOGLE_API_KEY",
            })?;

        Ok(Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            prompts: TaggedPrompts::new()?,
            repairs: RepairPipeline::default(),
            report_tag: TagExtractor::new(TaggedShape::Report.tag())?,
            json_tag: TagExtractor::new(TaggedShape::Json.tag())?,
            client: reqwest::Client::new(),
        })
    }

    /// Replace the repair passes run on `<JSON>` content.
    pub fn with_repairs(mut self, repairs: RepairPipeline) -> Self {
        tracing::debug!(passes = ?repairs.pass_names(), "Configured JSON repair passes");
        self.repairs = repairs;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_gemini_request<'a>(&self, prompt: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }

    /// POST the prompt and return the concatenated answer text, if any.
    async fn send(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = self.to_gemini_request(prompt);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::request_failed(PROVIDER, format!("transport error: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::request_failed(PROVIDER, format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .map(|envelope| match envelope.error.status {
                    Some(code) => format!("{}: {}", code, envelope.error.message),
                    None => envelope.error.message,
                })
                .unwrap_or(text);
            return Err(ProviderError::request_failed(
                PROVIDER,
                format!("API error ({}): {}", status, detail),
            ));
        }

        let response: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::request_failed(PROVIDER, format!("failed to decode response: {}", e))
        })?;

        Ok(answer_text(response))
    }

    /// Turn raw response text into a validated value for `request.schema`.
    fn parse_content(
        &self,
        request: &GenerationRequest<'_>,
        content: &str,
    ) -> Result<GenerationResult, ProviderError> {
        let schema = request.schema;

        if let Some(field) = schema.report_field() {
            let report = self.extract(&self.report_tag, content)?;
            let mut object = Map::new();
            object.insert(field.to_string(), Value::String(report.to_string()));
            return GenerationResult::validated(schema, Value::Object(object), content);
        }

        let block = self.extract(&self.json_tag, content)?;
        let repaired = self.repairs.repair(block);

        let value: Value = serde_json::from_str(&repaired).map_err(|e| {
            tracing::error!(provider = PROVIDER, raw = %content, "Extracted JSON did not parse");
            ProviderError::SchemaValidationFailed {
                schema: schema.name().to_string(),
                message: format!("invalid JSON: {}", e),
                raw: content.to_string(),
            }
        })?;

        GenerationResult::validated(schema, value, content).inspect_err(|e| {
            tracing::error!(provider = PROVIDER, raw = %content, "{}", e);
        })
    }

    fn extract<'a>(
        &self,
        extractor: &TagExtractor,
        content: &'a str,
    ) -> Result<&'a str, ProviderError> {
        extractor.extract(content).ok_or_else(|| {
            tracing::error!(
                provider = PROVIDER,
                tag = extractor.tag(),
                raw = %content,
                "Response is missing the expected tag"
            );
            ProviderError::ExtractionFailed {
                tag: extractor.tag(),
                raw: content.to_string(),
            }
        })
    }
}

/// Non-thought text parts of the first candidate that has any.
fn answer_text(response: GenerateContentResponse) -> Option<String> {
    response.candidates.into_iter().find_map(|candidate| {
        let text: String = candidate
            .content?
            .parts
            .into_iter()
            .filter(|part| !part.thought)
            .filter_map(|part| part.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    })
}

#[async_trait::async_trait]
impl StructuredProvider for TextExtractionProvider {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::TextExtraction
    }

    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GenerationResult, ProviderError> {
        if request.cancellation.is_some() {
            // TODO: race the request against the token like the schema-native provider.
            tracing::debug!("Cancellation token ignored by the text-extraction provider");
        }

        let shape = TaggedShape::for_schema(request.schema);
        let prompt = self
            .prompts
            .render(shape, &request.system, &request.prompt, request.schema)?;

        tracing::info!(
            model = self.model(),
            schema = request.schema.name(),
            shape = shape.tag(),
            "Sending tagged request to Gemini"
        );
        tracing::debug!("Prompt: {}", prompt);

        let content = self
            .send(&prompt)
            .await?
            .ok_or(ProviderError::NoContentReturned { provider: PROVIDER })?;

        tracing::debug!("Response: {}", content);
        self.parse_content(request, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::RepairPass;
    use crate::schema::Schema;
    use mockito::Matcher;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn learnings_schema() -> Schema {
        Schema::new(
            "learnings",
            json!({
                "type": "object",
                "properties": {
                    "learnings": { "type": "array", "items": { "type": "string" } },
                    "followUpQuestions": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["learnings", "followUpQuestions"],
                "additionalProperties": false
            }),
        )
        .unwrap()
    }

    fn report_schema() -> Schema {
        Schema::new(
            "final_report",
            json!({
                "type": "object",
                "properties": { "reportMarkdown": { "type": "string" } },
                "required": ["reportMarkdown"]
            }),
        )
        .unwrap()
    }

    fn provider(base_url: &str) -> TextExtractionProvider {
        TextExtractionProvider::from_settings(&TextExtractionSettings {
            api_key: Some("google-key".to_string()),
            base_url: base_url.to_string(),
            model: "gemini-test".to_string(),
        })
        .unwrap()
    }

    fn gemini_body(text: &str) -> String {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
        .to_string()
    }

    async fn mock_answer(server: &mut mockito::ServerGuard, text: &str) -> mockito::Mock {
        server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "google-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(gemini_body(text))
            .create_async()
            .await
    }

    #[test]
    fn test_requires_api_key() {
        let result = TextExtractionProvider::from_settings(&TextExtractionSettings::default());
        assert!(matches!(
            result,
            Err(ProviderError::CredentialsMissing { variable: "GOOGLE_API_KEY", .. })
        ));
    }

    #[test]
    fn test_request_disables_safety_blocking() {
        let provider = provider("http://localhost");
        let body = serde_json::to_value(provider.to_gemini_request("hello")).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        let settings = body["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        assert!(settings.iter().all(|s| s["threshold"] == "BLOCK_NONE"));
    }

    #[tokio::test]
    async fn test_structured_answer_is_repaired_and_validated() {
        let mut server = mockito::Server::new_async().await;
        let answer = "<REASONING>\nStep 1: read\n</REASONING>\n<JSON>\n```json\n{\n  \"learnings\": [\"Tokio is async\", \"Rust is fast\",],\n  \"followUpQuestions\": [\"Why?\"],\n}\n```\n</JSON>";
        let mock = mock_answer(&mut server, answer).await;

        let schema = learnings_schema();
        let request = GenerationRequest::new("sys", "task", &schema);
        let result = provider(&server.url()).generate(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            result.value,
            json!({
                "learnings": ["Tokio is async", "Rust is fast"],
                "followUpQuestions": ["Why?"]
            })
        );
    }

    #[tokio::test]
    async fn test_prompt_embeds_example_for_structured_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_body(Matcher::Regex("first example".to_string()))
            .with_status(200)
            .with_body(gemini_body(
                "<JSON>{\"learnings\": [], \"followUpQuestions\": []}</JSON>",
            ))
            .create_async()
            .await;

        let schema = learnings_schema();
        let request = GenerationRequest::new("sys", "task", &schema);
        provider(&server.url()).generate(&request).await.unwrap();
        mock.assert_async().await;
    }

    /// Replaces single-quoted strings with double-quoted ones.
    struct SingleQuotes;

    impl RepairPass for SingleQuotes {
        fn name(&self) -> &str {
            "single-quotes"
        }

        fn apply(&self, input: &str) -> String {
            input.replace('\'', "\"")
        }
    }

    #[tokio::test]
    async fn test_custom_repair_pass_runs_before_parsing() {
        let mut server = mockito::Server::new_async().await;
        let answer = "<JSON>{'learnings': ['a',], 'followUpQuestions': []}</JSON>";
        let _mock = mock_answer(&mut server, answer).await;

        let schema = learnings_schema();
        let request = GenerationRequest::new("sys", "task", &schema);

        let err = provider(&server.url()).generate(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::SchemaValidationFailed { .. }));

        let provider = provider(&server.url())
            .with_repairs(RepairPipeline::default().with_pass(SingleQuotes));
        let result = provider.generate(&request).await.unwrap();
        assert_eq!(
            result.value,
            json!({ "learnings": ["a"], "followUpQuestions": [] })
        );
    }

    #[tokio::test]
    async fn test_report_answer_is_taken_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let answer = "<REASONING>ok</REASONING>\n<REPORT>\n# Findings\n\n- item, }\n</REPORT>";
        let _mock = mock_answer(&mut server, answer).await;

        let schema = report_schema();
        let request = GenerationRequest::new("sys", "write it", &schema);
        let result = provider(&server.url()).generate(&request).await.unwrap();

        assert_eq!(result.value, json!({ "reportMarkdown": "# Findings\n\n- item, }" }));
    }

    #[tokio::test]
    async fn test_missing_tag_fails_extraction() {
        let mut server = mockito::Server::new_async().await;
        let answer = "{\"learnings\": [], \"followUpQuestions\": []}";
        let _mock = mock_answer(&mut server, answer).await;

        let schema = learnings_schema();
        let request = GenerationRequest::new("sys", "task", &schema);
        let err = provider(&server.url()).generate(&request).await.unwrap_err();

        assert!(matches!(err, ProviderError::ExtractionFailed { tag: "JSON", .. }));
        assert_eq!(err.raw(), Some(answer));
    }

    #[tokio::test]
    async fn test_missing_required_field_fails_validation() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_answer(&mut server, "<JSON>{\"learnings\": [\"a\"]}</JSON>").await;

        let schema = learnings_schema();
        let request = GenerationRequest::new("sys", "task", &schema);
        let err = provider(&server.url()).generate(&request).await.unwrap_err();

        match &err {
            ProviderError::SchemaValidationFailed { message, .. } => {
                assert!(message.contains("followUpQuestions"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.raw().is_some());
    }

    #[tokio::test]
    async fn test_unparseable_json_fails_validation() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_answer(&mut server, "<JSON>{learnings: nope</JSON>").await;

        let schema = learnings_schema();
        let request = GenerationRequest::new("sys", "task", &schema);
        let err = provider(&server.url()).generate(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::SchemaValidationFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_no_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let schema = learnings_schema();
        let request = GenerationRequest::new("sys", "task", &schema);
        let err = provider(&server.url()).generate(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::NoContentReturned { .. }));
        assert_eq!(err.to_string(), "gemini: no content generated");
    }

    #[tokio::test]
    async fn test_api_error_is_wrapped() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(403)
            .with_body(r#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#)
            .create_async()
            .await;

        let schema = learnings_schema();
        let request = GenerationRequest::new("sys", "task", &schema);
        let err = provider(&server.url()).generate(&request).await.unwrap_err();

        match err {
            ProviderError::BackendRequestFailed { message, .. } => {
                assert!(message.contains("PERMISSION_DENIED: API key not valid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancellation_is_not_honored() {
        let mut server = mockito::Server::new_async().await;
        let mock = mock_answer(
            &mut server,
            "<JSON>{\"learnings\": [], \"followUpQuestions\": []}</JSON>",
        )
        .await;

        let schema = learnings_schema();
        let token = CancellationToken::new();
        token.cancel();
        let request = GenerationRequest::new("sys", "task", &schema).with_cancellation(token);

        let result = provider(&server.url()).generate(&request).await;
        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[test]
    fn test_thought_parts_are_skipped() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "thinking...", "thought": true },
                    { "text": "<REPORT>done</REPORT>" }
                ] }
            }]
        }))
        .unwrap();

        assert_eq!(answer_text(response).as_deref(), Some("<REPORT>done</REPORT>"));
    }
}
