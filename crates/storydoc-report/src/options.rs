//! Option enums shared by the generators and the engine configuration.

use serde::{Deserialize, Serialize};

/// How Markdown groups scenarios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// One section per source file (default).
    #[default]
    File,
    /// Group by `suite_path` across files.
    Suite,
    /// Flat list, no group headers.
    None,
}

/// Sort order for files and scenarios inside a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Case-sensitive title/path sort.
    #[default]
    Alpha,
    /// Declaration order: `(source_file, source_order)`.
    Source,
    /// Keep routed order.
    None,
}

/// Step rendering style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStyle {
    /// `- **Given** text` bullets (default).
    #[default]
    Bullets,
    /// Bare `**Given** text` lines.
    Gherkin,
}

/// Which doc phases the JSON report keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocsFilter {
    /// Keep everything (default).
    #[default]
    All,
    /// Registration-time entries only.
    Static,
    /// Execution-time entries only.
    Runtime,
}

/// Date rendering in the metadata block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// ISO 8601 UTC (default).
    #[default]
    Iso,
    /// `YYYY-MM-DD HH:MM:SS` local-style rendering.
    Locale,
    /// No date row.
    None,
}

/// Metadata block options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataOptions {
    /// Date row format.
    pub date: DateFormat,
    /// Include the project manifest version.
    pub package_version: bool,
    /// Include the short git SHA.
    pub git_sha: bool,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            date: DateFormat::Iso,
            package_version: true,
            git_sha: true,
        }
    }
}
