//! Command handlers for the deepr CLI.

pub mod generate;
pub mod trim;

pub use generate::GenerateCommand;
pub use trim::TrimCommand;

use deepr_core::{AppError, AppResult};
use std::io::Read;
use std::path::Path;

/// Read `path`, or stdin when no path (or `-`) is given.
pub(crate) fn read_input(path: Option<&Path>) -> AppResult<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path).map_err(|e| {
            AppError::Other(format!("Failed to read {}: {}", path.display(), e))
        }),
        _ => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}
