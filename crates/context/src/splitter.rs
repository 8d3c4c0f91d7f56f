//! Hierarchical text splitting using the text-splitter crate.

use text_splitter::TextSplitter;

/// Splits text into ordered chunks of bounded character length.
pub trait TextChunker: Send + Sync {
    /// Split `text` into chunks of at most `chunk_size` characters.
    fn split_text(&self, text: &str, chunk_size: usize) -> Vec<String>;
}

/// Splitter that prefers paragraph, then sentence, then word boundaries,
/// with no overlap between chunks.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveChunker;

impl TextChunker for RecursiveChunker {
    fn split_text(&self, text: &str, chunk_size: usize) -> Vec<String> {
        if chunk_size == 0 {
            return Vec::new();
        }

        let splitter = TextSplitter::new(chunk_size);
        let chunks: Vec<String> = splitter.chunks(text).map(str::to_string).collect();

        tracing::trace!(
            "Split {} chars into {} chunks (capacity {})",
            text.chars().count(),
            chunks.len(),
            chunk_size
        );

        chunks
    }
}
