//! Provider kinds and connection settings.
//!
//! Settings are read once, when a selector or provider is built, and never
//! re-read during a call.

use std::fmt;

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "o3-mini";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-thinking-exp-01-21";

/// Variants of the structured-generation capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Backend constrains its own output to the schema.
    SchemaNative,
    /// Backend returns free text that is parsed and validated locally.
    TextExtraction,
}

impl ProviderKind {
    /// Parse a provider kind from its name or backend alias.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "schema-native" | "openai" => Some(Self::SchemaNative),
            "text-extraction" | "gemini" => Some(Self::TextExtraction),
            _ => None,
        }
    }

    /// Get the canonical kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaNative => "schema-native",
            Self::TextExtraction => "text-extraction",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for the schema-native (OpenAI-compatible) backend.
#[derive(Debug, Clone)]
pub struct SchemaNativeSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Explicit reasoning-effort hint; see [`Self::reasoning_effort`].
    pub reasoning_effort: Option<String>,
}

impl SchemaNativeSettings {
    /// Effort sent with each request: the explicit hint if set, otherwise
    /// "medium" for `o`-series reasoning models and nothing for the rest.
    pub fn reasoning_effort(&self) -> Option<&str> {
        match self.reasoning_effort.as_deref() {
            Some(effort) => Some(effort),
            None if self.model.starts_with('o') => Some("medium"),
            None => None,
        }
    }
}

impl Default for SchemaNativeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_ENDPOINT.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            reasoning_effort: None,
        }
    }
}

/// Connection settings for the text-extraction (Gemini) backend.
#[derive(Debug, Clone)]
pub struct TextExtractionSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for TextExtractionSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_ENDPOINT.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

/// Settings for every provider kind.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub schema_native: SchemaNativeSettings,
    pub text_extraction: TextExtractionSettings,
}

impl ProviderSettings {
    /// Read settings from the process environment.
    ///
    /// Environment variables:
    /// - `OPENAI_KEY` (or `OPENAI_API_KEY`), `OPENAI_ENDPOINT`, `OPENAI_MODEL`,
    ///   `OPENAI_REASONING_EFFORT`
    /// - `GOOGLE_API_KEY`, `GEMINI_ENDPOINT`, `GEMINI_MODEL`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let schema_native = SchemaNativeSettings {
            api_key: get("OPENAI_KEY").or_else(|| get("OPENAI_API_KEY")),
            base_url: get("OPENAI_ENDPOINT").unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string()),
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            reasoning_effort: get("OPENAI_REASONING_EFFORT"),
        };

        let text_extraction = TextExtractionSettings {
            api_key: get("GOOGLE_API_KEY"),
            base_url: get("GEMINI_ENDPOINT").unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        };

        Self {
            schema_native,
            text_extraction,
        }
    }
}
