//! Structured provider factory.
//!
//! Resolves a [`ProviderKind`] to a fresh provider instance, checking that
//! the kind's credentials are present before anything is sent.

use std::sync::Arc;

use crate::client::StructuredProvider;
use crate::error::ProviderError;
use crate::providers::{SchemaNativeProvider, TextExtractionProvider};
use crate::types::{ProviderKind, ProviderSettings};

/// Create a structured provider of `kind` from `settings`.
///
/// # Errors
/// Returns `CredentialsMissing` if the kind's API key is not configured.
pub fn create_provider(
    kind: ProviderKind,
    settings: &ProviderSettings,
) -> Result<Arc<dyn StructuredProvider>, ProviderError> {
    let provider: Arc<dyn StructuredProvider> = match kind {
        ProviderKind::SchemaNative => {
            Arc::new(SchemaNativeProvider::from_settings(&settings.schema_native)?)
        }
        ProviderKind::TextExtraction => {
            Arc::new(TextExtractionProvider::from_settings(&settings.text_extraction)?)
        }
    };

    tracing::debug!(
        kind = %kind,
        provider = provider.provider_name(),
        "Created structured provider"
    );
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_keys() -> ProviderSettings {
        let mut settings = ProviderSettings::default();
        settings.schema_native.api_key = Some("sk-test".to_string());
        settings.text_extraction.api_key = Some("google-test".to_string());
        settings
    }

    #[test]
    fn test_create_each_kind() {
        let settings = settings_with_keys();

        let native = create_provider(ProviderKind::SchemaNative, &settings).unwrap();
        assert_eq!(native.kind(), ProviderKind::SchemaNative);
        assert_eq!(native.provider_name(), "openai");

        let text = create_provider(ProviderKind::TextExtraction, &settings).unwrap();
        assert_eq!(text.kind(), ProviderKind::TextExtraction);
        assert_eq!(text.provider_name(), "gemini");
    }

    #[test]
    fn test_text_extraction_requires_google_key() {
        match create_provider(ProviderKind::TextExtraction, &ProviderSettings::default()) {
            Err(err) => assert_eq!(
                err.to_string(),
                "gemini credentials missing: set GOOGLE_API_KEY"
            ),
            Ok(_) => panic!("Expected error for text-extraction without API key"),
        }
    }

    #[test]
    fn test_schema_native_requires_openai_key() {
        match create_provider(ProviderKind::SchemaNative, &ProviderSettings::default()) {
            Err(err) => assert!(matches!(err, ProviderError::CredentialsMissing { .. })),
            Ok(_) => panic!("Expected error for schema-native without API key"),
        }
    }
}
