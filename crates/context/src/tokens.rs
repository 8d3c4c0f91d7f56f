//! Token counting.
//!
//! The trimmer only needs a token count, so encoders sit behind a small
//! trait. The default implementation uses the `o200k_base` BPE.

use deepr_core::{AppError, AppResult};
use tiktoken_rs::CoreBPE;

/// Average characters per token assumed when sizing text without an encoder.
pub const CHARS_PER_TOKEN: usize = 3;

/// Measures text in backend tokens.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens `text` encodes to.
    fn count_tokens(&self, text: &str) -> usize;
}

/// BPE token counter backed by `tiktoken-rs`.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Counter using the `o200k_base` encoding.
    pub fn o200k() -> AppResult<Self> {
        let bpe = tiktoken_rs::o200k_base()
            .map_err(|e| AppError::Other(format!("Failed to load o200k_base encoding: {}", e)))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        // Special-token markers in user text are counted as plain text.
        self.bpe.encode_ordinary(text).len()
    }
}

/// Character-based estimate, used when no encoder is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateCounter;

impl TokenCounter for EstimateCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(CHARS_PER_TOKEN)
    }
}
