//! Trim command handler.

use clap::Args;
use deepr_context::ContextTrimmer;
use deepr_core::{config::AppConfig, AppResult};
use std::path::PathBuf;

use super::read_input;

/// Trim text to a token budget
#[derive(Args, Debug)]
pub struct TrimCommand {
    /// Input file (default: stdin)
    pub input: Option<PathBuf>,

    /// Token budget (default: configured context size)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON with token counts
    #[arg(long)]
    pub json: bool,
}

impl TrimCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let text = read_input(self.input.as_deref())?;
        let limit = self.limit.unwrap_or(config.context_size);
        tracing::info!(limit, "Executing trim command");

        let trimmer = ContextTrimmer::o200k()?;
        let trimmed = trimmer.trim(&text, limit);

        if self.json {
            let output = serde_json::json!({
                "tokensBefore": trimmer.count_tokens(&text),
                "tokensAfter": trimmer.count_tokens(&trimmed),
                "text": trimmed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", trimmed);
        }

        Ok(())
    }
}
