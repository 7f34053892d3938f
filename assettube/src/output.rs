//! Output formatting for CLI commands.
//!
//! Provides abstraction layer for outputting results in text or JSON format.

use anyhow::Result;
use assettube_core::Registry;
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Write output using the configured format.
    ///
    /// The `text_fn` closure is called only in text mode to generate the
    /// human-readable output.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write an error message to stderr.
    ///
    /// In JSON mode, writes a JSON error object with success=false.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// One mapped asset in `scan` output.
#[derive(Debug, Clone, Serialize)]
pub struct AssetInfo {
    pub logical: String,
    pub url: String,
    pub physical: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub integrity: String,
}

/// Output for `scan` command.
#[derive(Debug, Serialize)]
pub struct ScanOutput {
    pub success: bool,
    pub result_code: u8,
    pub fingerprint: bool,
    pub roots: Vec<String>,
    pub assets: Vec<AssetInfo>,
}

impl ScanOutput {
    /// Collect every mapped asset of a registry.
    pub fn from_registry(registry: &Registry) -> Self {
        let assets = registry
            .entries()
            .into_iter()
            .map(|entry| AssetInfo {
                url: registry.asset_path(&entry.logical),
                integrity: registry.integrity(&entry.logical),
                physical: entry.physical.display().to_string(),
                logical: entry.logical,
            })
            .collect();

        Self {
            success: true,
            result_code: 0,
            fingerprint: registry.config().fingerprint,
            roots: registry
                .roots()
                .iter()
                .map(|root| root.display().to_string())
                .collect(),
            assets,
        }
    }

    /// `logical -> url` lines, with the integrity tag when present.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for asset in &self.assets {
            text.push_str(&asset.logical);
            text.push_str(" -> ");
            text.push_str(&asset.url);
            if !asset.integrity.is_empty() {
                text.push(' ');
                text.push_str(&asset.integrity);
            }
            text.push('\n');
        }
        if self.assets.is_empty() {
            text.push_str("No assets mapped\n");
        }
        text
    }
}
