//! Structured provider implementations.

mod gemini;
mod openai;

pub use gemini::TextExtractionProvider;
pub use openai::SchemaNativeProvider;
