//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;

use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;

use caqhex_core::{reconstruct, ExtractionConfig, PageTokens, SourceProfile};

/// Read a document's text: `.txt` files are pre-reconstructed text,
/// `.json` files are per-page token streams to reconstruct.
pub fn read_document_text(
    path: &Path,
    ocr: bool,
    config: &ExtractionConfig,
) -> anyhow::Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "txt" => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        "json" => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let pages: Vec<PageTokens> = serde_json::from_str(&content)
                .with_context(|| format!("invalid token stream in {}", path.display()))?;
            let profile = if ocr {
                SourceProfile::Ocr
            } else {
                SourceProfile::Native
            };
            reconstruct(&pages, profile, &config.tuning)
                .with_context(|| format!("failed to reconstruct {}", path.display()))
        }
        other => anyhow::bail!("unsupported input format: .{other} (expected .txt or .json)"),
    }
}

/// Load the extraction configuration, falling back to the CAQH defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ExtractionConfig> {
    match config_path {
        Some(path) => ExtractionConfig::from_file(Path::new(path))
            .with_context(|| format!("failed to load config from {path}")),
        None => Ok(ExtractionConfig::caqh_default()),
    }
}

/// Parse a `YYYY-MM-DD` reference date argument.
pub fn parse_reference_date(arg: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(arg, "%Y-%m-%d")
        .with_context(|| format!("invalid reference date '{arg}' (expected YYYY-MM-DD)"))
}

/// Split a `--fields a,b,c` argument into field names.
pub fn parse_fields(arg: Option<&str>) -> Vec<String> {
    arg.map(|s| {
        s.split(',')
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
