//! Repairs applied to free-text JSON before parsing.
//!
//! Each [`RepairPass`] fixes one class of generation artifact. Passes run in
//! order through a [`RepairPipeline`]; new heuristics are added as passes.

use std::sync::OnceLock;

use regex::Regex;

/// A single text rewrite applied before JSON parsing.
pub trait RepairPass: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, text: &str) -> String;
}

/// Removes Markdown code-fence markers (e.g. "```json").
#[derive(Debug, Default, Clone, Copy)]
pub struct StripCodeFences;

impl RepairPass for StripCodeFences {
    fn name(&self) -> &str {
        "strip-code-fences"
    }

    fn apply(&self, text: &str) -> String {
        static FENCE: OnceLock<Regex> = OnceLock::new();
        let fence = FENCE.get_or_init(|| Regex::new(r"```[a-zA-Z]*\n?").expect("valid regex"));
        fence.replace_all(text, "").into_owned()
    }
}

/// Drops a comma directly before a closing brace or bracket.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrailingCommas;

impl RepairPass for TrailingCommas {
    fn name(&self) -> &str {
        "trailing-commas"
    }

    fn apply(&self, text: &str) -> String {
        static TRAILING: OnceLock<Regex> = OnceLock::new();
        let trailing = TRAILING.get_or_init(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));
        trailing.replace_all(text, "$1").into_owned()
    }
}

/// Ordered list of repair passes.
pub struct RepairPipeline {
    passes: Vec<Box<dyn RepairPass>>,
}

impl RepairPipeline {
    /// Pipeline with no passes.
    pub fn empty() -> Self {
        Self { passes: Vec::new() }
    }

    /// Append a pass to run after the existing ones.
    pub fn with_pass(mut self, pass: impl RepairPass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Trim `text` and run every pass over it in order.
    pub fn repair(&self, text: &str) -> String {
        self.passes
            .iter()
            .fold(text.trim().to_string(), |acc, pass| {
                let repaired = pass.apply(&acc);
                if repaired != acc {
                    tracing::debug!("Repair pass '{}' rewrote response text", pass.name());
                }
                repaired
            })
    }
}

impl Default for RepairPipeline {
    fn default() -> Self {
        Self::empty()
            .with_pass(StripCodeFences)
            .with_pass(TrailingCommas)
    }
}
