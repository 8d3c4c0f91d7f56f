//! Delimited block extraction from free-text responses.

use regex::Regex;

use crate::error::ProviderError;

/// Finds the body of the first `<TAG>...</TAG>` block in a response.
pub struct TagExtractor {
    tag: &'static str,
    pattern: Regex,
}

impl TagExtractor {
    pub fn new(tag: &'static str) -> Result<Self, ProviderError> {
        let escaped = regex::escape(tag);
        let pattern = Regex::new(&format!(r"(?s)<{0}>\s*(.*?)\s*</{0}>", escaped))
            .map_err(|e| ProviderError::Prompt(format!("Invalid tag <{}>: {}", tag, e)))?;
        Ok(Self { tag, pattern })
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Trimmed body of the first complete block, or `None` if there is no
    /// block or it is empty.
    pub fn extract<'a>(&self, text: &'a str) -> Option<&'a str> {
        let body = self.pattern.captures(text)?.get(1)?.as_str().trim();
        (!body.is_empty()).then_some(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_block_surrounded_by_prose() {
        let extractor = TagExtractor::new("JSON").unwrap();
        let text = "Sure!\n<REASONING>\nStep 1\n</REASONING>\n<JSON>\n  {\"a\": 1}\n</JSON>\nHope this helps.";
        assert_eq!(extractor.extract(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_reluctant_match_stops_at_first_close() {
        let extractor = TagExtractor::new("REPORT").unwrap();
        let text = "<REPORT>first</REPORT> trailing <REPORT>second</REPORT>";
        assert_eq!(extractor.extract(text), Some("first"));
    }

    #[test]
    fn test_missing_or_unclosed_tag() {
        let extractor = TagExtractor::new("JSON").unwrap();
        assert_eq!(extractor.extract("{\"a\": 1}"), None);
        assert_eq!(extractor.extract("<JSON>{\"a\": 1}"), None);
    }

    #[test]
    fn test_tag_metacharacters_are_literal() {
        let extractor = TagExtractor::new("A.B").unwrap();
        assert_eq!(extractor.extract("<A.B>kept</A.B>"), Some("kept"));
        assert_eq!(extractor.extract("<AxB>skipped</AxB>"), None);
    }

    #[test]
    fn test_empty_block_is_missing() {
        let extractor = TagExtractor::new("REPORT").unwrap();
        assert_eq!(extractor.extract("<REPORT>\n   \n</REPORT>"), None);
    }
}
