//! Provider error taxonomy.

use deepr_core::AppError;
use thiserror::Error;

/// Failure of a structured generation call or provider selection.
///
/// Diagnostic text returned by the backend is kept on the variants that
/// involve parsing it, so callers can log or surface it.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Credentials for the requested provider are not configured.
    #[error("{provider} credentials missing: set {variable}")]
    CredentialsMissing {
        provider: &'static str,
        variable: &'static str,
    },

    /// Network, authentication, rate-limit, or other backend-side failure.
    #[error("{provider} request failed: {message}")]
    BackendRequestFailed {
        provider: &'static str,
        message: String,
    },

    /// The backend answered without any text content.
    #[error("{provider}: no content generated")]
    NoContentReturned { provider: &'static str },

    /// The expected delimiter tag was not found in the response text.
    #[error("could not extract <{tag}> content from response")]
    ExtractionFailed { tag: &'static str, raw: String },

    /// The response could not be parsed or does not satisfy the schema.
    #[error("response does not match schema '{schema}': {message}")]
    SchemaValidationFailed {
        schema: String,
        message: String,
        raw: String,
    },

    /// The caller cancelled the request before it completed.
    #[error("generation cancelled")]
    Cancelled,

    /// The caller-supplied schema could not be compiled.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The prompt template failed to render.
    #[error("failed to build prompt: {0}")]
    Prompt(String),
}

impl ProviderError {
    pub(crate) fn request_failed(provider: &'static str, message: impl Into<String>) -> Self {
        Self::BackendRequestFailed {
            provider,
            message: message.into(),
        }
    }

    /// Raw backend text attached to the error, if any.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::ExtractionFailed { raw, .. } | Self::SchemaValidationFailed { raw, .. } => {
                Some(raw)
            }
            _ => None,
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::Llm(err.to_string())
    }
}
