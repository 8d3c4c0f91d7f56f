//! Generate command handler.
//!
//! Runs one structured generation against the configured provider and
//! prints the validated value.

use clap::Args;
use deepr_context::trim_prompt;
use deepr_core::{config::AppConfig, AppError, AppResult};
use deepr_llm::{
    active_provider, select_provider, CancellationToken, GenerationRequest, ProviderKind, Schema,
};
use std::path::{Path, PathBuf};

use super::read_input;

/// Generate a JSON value that satisfies a schema
#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Path to a JSON Schema document
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Schema name sent to the backend (default: schema file stem)
    #[arg(long)]
    pub name: Option<String>,

    /// System instruction
    #[arg(long, default_value = "You are a helpful research assistant.")]
    pub system: String,

    /// Prompt text
    pub prompt: Option<String>,

    /// Read prompt from file ("-" for stdin)
    #[arg(short, long, conflicts_with = "prompt")]
    pub file: Option<PathBuf>,
}

impl GenerateCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing generate command");

        let schema = self.load_schema()?;
        let prompt = match self.prompt {
            Some(ref prompt) => prompt.clone(),
            None => read_input(self.file.as_deref())?,
        };
        if prompt.trim().is_empty() {
            return Err(AppError::Config("No prompt provided".to_string()));
        }

        let kind = ProviderKind::parse(&config.provider)
            .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", config.provider)))?;
        select_provider(kind)?;
        let provider = active_provider()?;

        let prompt = trim_prompt(&prompt, Some(config.context_size));
        tracing::debug!(
            provider = provider.provider_name(),
            schema = schema.name(),
            prompt_chars = prompt.chars().count(),
            "Prepared generation request"
        );

        let token = CancellationToken::new();
        let on_interrupt = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling generation");
                on_interrupt.cancel();
            }
        });

        let request =
            GenerationRequest::new(&self.system, prompt, &schema).with_cancellation(token);
        let result = provider.generate(&request).await?;

        println!("{}", serde_json::to_string_pretty(&result.value)?);
        Ok(())
    }

    fn load_schema(&self) -> AppResult<Schema> {
        let contents = std::fs::read_to_string(&self.schema).map_err(|e| {
            AppError::Config(format!(
                "Failed to read schema {}: {}",
                self.schema.display(),
                e
            ))
        })?;
        let definition: serde_json::Value = serde_json::from_str(&contents)?;

        let name = self
            .name
            .clone()
            .unwrap_or_else(|| schema_name_from_path(&self.schema));
        Ok(Schema::new(name, definition)?)
    }
}

/// Schema name derived from a file stem, restricted to `[a-zA-Z0-9_-]`.
fn schema_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() {
        "output".to_string()
    } else {
        name
    }
}
