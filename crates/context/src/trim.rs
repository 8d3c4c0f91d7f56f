//! Fitting prompts to a token budget.

use std::sync::OnceLock;

use deepr_core::config::{parse_context_size, DEFAULT_CONTEXT_SIZE};

use crate::splitter::{RecursiveChunker, TextChunker};
use crate::tokens::{EstimateCounter, TiktokenCounter, TokenCounter, CHARS_PER_TOKEN};

/// Smallest prefix ever returned for non-empty input.
pub const MIN_CHUNK_SIZE: usize = 140;

/// Shrinks text until it fits a token budget.
///
/// Each pass estimates a character budget from the token overflow, keeps the
/// first chunk of a hierarchical split at that size, and measures again.
/// Every pass either returns or strictly shortens the text, so trimming
/// always terminates. The result is never longer than the input and never
/// empty for non-empty input.
pub struct ContextTrimmer<C = TiktokenCounter, S = RecursiveChunker> {
    counter: C,
    chunker: S,
}

impl<C: TokenCounter, S: TextChunker> ContextTrimmer<C, S> {
    pub fn new(counter: C, chunker: S) -> Self {
        Self { counter, chunker }
    }

    /// Token count of `text` under this trimmer's counter.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count_tokens(text)
    }

    /// Trim `text` so that it encodes to at most `token_limit` tokens.
    pub fn trim(&self, text: &str, token_limit: usize) -> String {
        let mut current = text.to_string();

        loop {
            if current.is_empty() {
                return current;
            }

            let token_count = self.counter.count_tokens(&current);
            if token_count <= token_limit {
                return current;
            }

            let overflow = token_count - token_limit;
            let char_len = current.chars().count();
            let char_budget = char_len.saturating_sub(overflow.saturating_mul(CHARS_PER_TOKEN));

            tracing::trace!(
                token_count,
                token_limit,
                char_len,
                char_budget,
                "Trimming prompt"
            );

            if char_budget < MIN_CHUNK_SIZE {
                return take_chars(&current, MIN_CHUNK_SIZE).to_string();
            }

            let first_chunk = self
                .chunker
                .split_text(&current, char_budget)
                .into_iter()
                .next();

            current = match first_chunk {
                Some(chunk) if !chunk.is_empty() && chunk.chars().count() < char_len => chunk,
                // No progress from splitting: cut at the budget instead.
                _ => take_chars(&current, char_budget).to_string(),
            };
        }
    }
}

impl ContextTrimmer {
    /// Trimmer using the `o200k_base` encoder and the recursive splitter.
    pub fn o200k() -> deepr_core::AppResult<Self> {
        Ok(Self::new(TiktokenCounter::o200k()?, RecursiveChunker))
    }
}

/// First `n` characters of `text`, cut on a char boundary.
fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

enum SharedTrimmer {
    Bpe(ContextTrimmer),
    Estimate(ContextTrimmer<EstimateCounter, RecursiveChunker>),
}

fn shared_trimmer() -> &'static SharedTrimmer {
    static TRIMMER: OnceLock<SharedTrimmer> = OnceLock::new();
    TRIMMER.get_or_init(|| match ContextTrimmer::o200k() {
        Ok(trimmer) => SharedTrimmer::Bpe(trimmer),
        Err(e) => {
            tracing::warn!("{}; falling back to character estimates", e);
            SharedTrimmer::Estimate(ContextTrimmer::new(EstimateCounter, RecursiveChunker))
        }
    })
}

/// Default token budget, read once from `CONTEXT_SIZE`.
///
/// An invalid value is logged and replaced by [`DEFAULT_CONTEXT_SIZE`];
/// `AppConfig::load` rejects the same value with an error.
pub fn default_context_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    *SIZE.get_or_init(|| context_size_from(std::env::var("CONTEXT_SIZE").ok().as_deref()))
}

fn context_size_from(value: Option<&str>) -> usize {
    match value.map(parse_context_size) {
        Some(Ok(size)) => size,
        Some(Err(e)) => {
            tracing::warn!("{}; using {}", e, DEFAULT_CONTEXT_SIZE);
            DEFAULT_CONTEXT_SIZE
        }
        None => DEFAULT_CONTEXT_SIZE,
    }
}

/// Trim `prompt` with the shared encoder.
///
/// `context_size` defaults to [`default_context_size`].
pub fn trim_prompt(prompt: &str, context_size: Option<usize>) -> String {
    let limit = context_size.unwrap_or_else(default_context_size);
    match shared_trimmer() {
        SharedTrimmer::Bpe(trimmer) => trimmer.trim(prompt, limit),
        SharedTrimmer::Estimate(trimmer) => trimmer.trim(prompt, limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One token per character.
    struct CharCounter;

    impl TokenCounter for CharCounter {
        fn count_tokens(&self, text: &str) -> usize {
            text.chars().count()
        }
    }

    /// One token per whitespace-separated word.
    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    /// Returns the input unchanged, as if no boundary could be found.
    struct StuckChunker;

    impl TextChunker for StuckChunker {
        fn split_text(&self, text: &str, _chunk_size: usize) -> Vec<String> {
            vec![text.to_string()]
        }
    }

    struct EmptyChunker;

    impl TextChunker for EmptyChunker {
        fn split_text(&self, _text: &str, _chunk_size: usize) -> Vec<String> {
            Vec::new()
        }
    }

    fn prose(chars: usize) -> String {
        let sentence = "Rust keeps memory safe without a garbage collector. ";
        sentence.repeat(chars / sentence.len() + 1)[..chars].to_string()
    }

    #[test]
    fn test_empty_input_returns_empty() {
        let trimmer = ContextTrimmer::new(CharCounter, RecursiveChunker);
        assert_eq!(trimmer.trim("", 100), "");
    }

    #[test]
    fn test_within_budget_is_identity() {
        let trimmer = ContextTrimmer::new(CharCounter, RecursiveChunker);
        let text = prose(50);
        assert_eq!(text.chars().count(), 50);
        assert_eq!(trimmer.trim(&text, 100), text);
        assert_eq!(trimmer.trim(&text, 50), text);
    }

    #[test]
    fn test_budget_below_floor_returns_prefix() {
        let trimmer = ContextTrimmer::new(CharCounter, RecursiveChunker);
        let text = prose(2_000);

        let trimmed = trimmer.trim(&text, 10);
        assert_eq!(trimmed, &text[..MIN_CHUNK_SIZE]);
    }

    #[test]
    fn test_floor_never_exceeds_short_input() {
        let trimmer = ContextTrimmer::new(CharCounter, RecursiveChunker);
        let text = "short but over budget";

        let trimmed = trimmer.trim(text, 1);
        assert_eq!(trimmed, text);
    }

    #[test]
    fn test_converges_under_limit() {
        let trimmer = ContextTrimmer::new(WordCounter, RecursiveChunker);
        let text = "word ".repeat(400);

        let trimmed = trimmer.trim(&text, 300);
        assert!(!trimmed.is_empty());
        assert!(WordCounter.count_tokens(&trimmed) <= 300);
        assert!(trimmed.chars().count() <= text.chars().count());
        assert!(text.starts_with(&trimmed));
    }

    #[test]
    fn test_stuck_splitter_cuts_at_budget() {
        let trimmer = ContextTrimmer::new(EstimateCounter, StuckChunker);
        let text = "x".repeat(1_000);

        // 334 tokens against a limit of 200: budget is 1000 - 134 * 3 = 598.
        let trimmed = trimmer.trim(&text, 200);
        assert_eq!(trimmed.chars().count(), 598);
        assert!(EstimateCounter.count_tokens(&trimmed) <= 200);
    }

    #[test]
    fn test_empty_split_cuts_at_budget() {
        let trimmer = ContextTrimmer::new(EstimateCounter, EmptyChunker);
        let text = "y".repeat(1_000);

        let trimmed = trimmer.trim(&text, 200);
        assert_eq!(trimmed.chars().count(), 598);
    }

    #[test]
    fn test_multibyte_prefix_is_char_aligned() {
        let trimmer = ContextTrimmer::new(CharCounter, RecursiveChunker);
        let text = "é🎮".repeat(500);

        let trimmed = trimmer.trim(&text, 5);
        assert_eq!(trimmed.chars().count(), MIN_CHUNK_SIZE);
        assert!(text.starts_with(&trimmed));
    }

    #[test]
    fn test_never_empty_and_never_longer() {
        let trimmer = ContextTrimmer::new(WordCounter, RecursiveChunker);
        let inputs = [
            prose(10),
            prose(500),
            prose(3_000),
            "\n\n\n   \n".to_string(),
            "a".repeat(900),
        ];

        for text in &inputs {
            for limit in [0, 1, 5, 50, 400, 10_000] {
                let trimmed = trimmer.trim(text, limit);
                assert!(!trimmed.is_empty(), "empty for limit {}", limit);
                assert!(trimmed.chars().count() <= text.chars().count());
            }
        }
    }

    #[test]
    fn test_tiktoken_trimmer_fits_budget() {
        let trimmer = ContextTrimmer::o200k().unwrap();
        let text = prose(20_000);

        let trimmed = trimmer.trim(&text, 1_000);
        assert!(trimmer.count_tokens(&trimmed) <= 1_000);
        assert!(trimmed.chars().count() > MIN_CHUNK_SIZE);
    }

    #[test]
    fn test_trim_prompt_uses_explicit_limit() {
        let text = prose(400);
        assert_eq!(trim_prompt(&text, Some(100_000)), text);
        assert_eq!(trim_prompt("", Some(10)), "");
    }

    #[test]
    fn test_context_size_from_env_value() {
        assert_eq!(context_size_from(None), DEFAULT_CONTEXT_SIZE);
        assert_eq!(context_size_from(Some("32000")), 32_000);
        assert_eq!(context_size_from(Some("0")), DEFAULT_CONTEXT_SIZE);
        assert_eq!(context_size_from(Some("huge")), DEFAULT_CONTEXT_SIZE);
    }
}
