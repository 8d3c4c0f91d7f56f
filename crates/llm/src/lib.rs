//! Structured LLM generation for deepr.
//!
//! Backends with different capabilities sit behind one contract,
//! [`StructuredProvider::generate`], which returns a value satisfying a
//! caller-supplied [`Schema`] or fails with a [`ProviderError`].
//!
//! # Providers
//! - **Schema-native** (OpenAI-compatible): the backend enforces the schema
//! - **Text-extraction** (Gemini): tagged free text, repaired, parsed and validated
//!
//! # Example
//! ```no_run
//! use deepr_llm::{active_provider, GenerationRequest, Schema};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::new(
//!     "feedback",
//!     json!({
//!         "type": "object",
//!         "properties": { "questions": { "type": "array", "items": { "type": "string" } } },
//!         "required": ["questions"],
//!         "additionalProperties": false
//!     }),
//! )?;
//!
//! let provider = active_provider()?;
//! let request = GenerationRequest::new("You are a research assistant.", "Ask follow-ups.", &schema);
//! let result = provider.generate(&request).await?;
//! println!("{}", result.value);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod example;
pub mod extract;
pub mod factory;
pub mod prompt;
pub mod providers;
pub mod repair;
pub mod schema;
pub mod selector;
pub mod types;

// Re-export main types
pub use client::{GenerationRequest, GenerationResult, StructuredProvider};
pub use error::ProviderError;
pub use example::synthesize_example;
pub use factory::create_provider;
pub use providers::{SchemaNativeProvider, TextExtractionProvider};
pub use repair::{RepairPass, RepairPipeline, StripCodeFences, TrailingCommas};
pub use schema::Schema;
pub use selector::{active_provider, select_provider, ProviderSelector};
pub use types::{ProviderKind, ProviderSettings, SchemaNativeSettings, TextExtractionSettings};

// Callers attach cancellation without depending on tokio-util directly.
pub use tokio_util::sync::CancellationToken;
