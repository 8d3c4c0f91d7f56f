//! Context budget utilities for deepr.
//!
//! Keeps prompts inside a backend's context window:
//! - [`TokenCounter`]: measures text in tokens (`o200k_base` by default)
//! - [`TextChunker`]: hierarchical paragraph/sentence/word splitting
//! - [`ContextTrimmer`]: shrinks text to a token limit
//!
//! # Example
//! ```no_run
//! use deepr_context::ContextTrimmer;
//!
//! # fn example() -> deepr_core::AppResult<()> {
//! let trimmer = ContextTrimmer::o200k()?;
//! let prompt = trimmer.trim("a very long prompt ...", 4_096);
//! # Ok(())
//! # }
//! ```

pub mod splitter;
pub mod tokens;
pub mod trim;

pub use splitter::{RecursiveChunker, TextChunker};
pub use tokens::{EstimateCounter, TiktokenCounter, TokenCounter};
pub use trim::{default_context_size, trim_prompt, ContextTrimmer, MIN_CHUNK_SIZE};
