//! Structured generation contract and request/response types.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::schema::Schema;
use crate::types::ProviderKind;

/// One structured generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    /// System prompt
    pub system: String,

    /// Task prompt
    pub prompt: String,

    /// Shape the result must satisfy
    pub schema: &'a Schema,

    /// Optional cancellation signal
    pub cancellation: Option<CancellationToken>,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, schema: &'a Schema) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            schema,
            cancellation: None,
        }
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// A value that satisfies the request's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub value: Value,
}

impl GenerationResult {
    /// Validate `value` against `schema` and wrap it.
    pub(crate) fn validated(
        schema: &Schema,
        value: Value,
        raw: &str,
    ) -> Result<Self, ProviderError> {
        schema
            .validate(&value)
            .map_err(|message| ProviderError::SchemaValidationFailed {
                schema: schema.name().to_string(),
                message,
                raw: raw.to_string(),
            })?;
        Ok(Self { value })
    }

    /// Deserialize the value into a caller type.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ProviderError> {
        let raw = self.value.to_string();
        serde_json::from_value(self.value).map_err(|e| ProviderError::SchemaValidationFailed {
            schema: std::any::type_name::<T>().to_string(),
            message: e.to_string(),
            raw,
        })
    }
}

/// A backend that produces schema-conformant values.
///
/// Implementations differ in how they obtain structure (native constrained
/// decoding or prompt-and-parse), but every `Ok` result satisfies the
/// request's schema.
#[async_trait::async_trait]
pub trait StructuredProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "gemini").
    fn provider_name(&self) -> &str;

    /// Capability variant this provider implements.
    fn kind(&self) -> ProviderKind;

    /// Generate a value satisfying `request.schema`.
    ///
    /// # Errors
    /// Any backend, extraction, or validation failure. No retries are made.
    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GenerationResult, ProviderError>;
}
