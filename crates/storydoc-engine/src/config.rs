//! Report configuration surface.

use serde::{Deserialize, Serialize};
use storydoc_report::{DateFormat, DocsFilter, Grouping, MetadataOptions, SortOrder, StepStyle};

/// Default aggregated destination when no output is configured.
pub const DEFAULT_AGGREGATED_FILE: &str = "docs/user-stories.md";

/// Where a matching rule sends a source file's scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Write next to the source file, extension swapped.
    Colocated,
    /// Combine into one file.
    Aggregated,
}

/// One output routing rule. Rules are evaluated in declaration order and
/// the first glob match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRule {
    /// Glob pattern(s) matched against the case's `source_file`.
    pub include: Vec<String>,
    /// Colocated or aggregated.
    pub mode: OutputMode,
    /// Aggregated destination; the default file when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    /// Colocated extension; `.docs.md` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl OutputRule {
    /// An aggregated rule matching `pattern`.
    #[must_use]
    pub fn aggregated(pattern: &str, output_file: Option<&str>) -> Self {
        Self {
            include: vec![pattern.to_owned()],
            mode: OutputMode::Aggregated,
            output_file: output_file.map(str::to_owned),
            extension: None,
        }
    }

    /// A colocated rule matching `pattern`.
    #[must_use]
    pub fn colocated(pattern: &str, extension: Option<&str>) -> Self {
        Self {
            include: vec![pattern.to_owned()],
            mode: OutputMode::Colocated,
            output_file: None,
            extension: extension.map(str::to_owned),
        }
    }
}

/// Output configuration: a single aggregated path, or an explicit rule
/// list. An empty rule list is meaningful: every case then falls back to
/// the default aggregated destination, whereas a non-empty list silently
/// drops unmatched cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputConfig {
    /// One aggregated file for everything.
    Single(String),
    /// Rule-based routing.
    Rules(Vec<OutputRule>),
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::Rules(Vec::new())
    }
}

impl OutputConfig {
    /// The effective rule list.
    #[must_use]
    pub fn rules(&self) -> Vec<OutputRule> {
        match self {
            Self::Single(path) => vec![OutputRule::aggregated("**/*", Some(path.as_str()))],
            Self::Rules(rules) => rules.clone(),
        }
    }

    /// The default aggregated destination for this configuration.
    #[must_use]
    pub fn default_file(&self) -> &str {
        match self {
            Self::Single(path) => path,
            Self::Rules(_) => DEFAULT_AGGREGATED_FILE,
        }
    }
}

/// Report formats the pipeline can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    Markdown,
    Json,
    JunitXml,
    CucumberJson,
}

impl ReportFormat {
    /// Parse a format name as used by configuration and the CLI.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "markdown" | "md" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            "junit" | "junit-xml" => Some(Self::JunitXml),
            "cucumber" | "cucumber-json" => Some(Self::CucumberJson),
            _ => None,
        }
    }
}

/// Scenario filters applied before routing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioFilter {
    /// Keep only scenarios carrying at least one of these tags.
    #[serde(default)]
    pub include_tags: Vec<String>,
    /// Drop scenarios carrying any of these tags.
    #[serde(default)]
    pub exclude_tags: Vec<String>,
    /// Keep only files matching one of these globs.
    #[serde(default)]
    pub include_files: Vec<String>,
    /// Drop files matching any of these globs.
    #[serde(default)]
    pub exclude_files: Vec<String>,
}

impl ScenarioFilter {
    /// True when no filter is configured at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include_tags.is_empty()
            && self.exclude_tags.is_empty()
            && self.include_files.is_empty()
            && self.exclude_files.is_empty()
    }
}

/// JSON report options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonOutputOptions {
    /// Aggregated JSON destination override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    /// Doc phase filter.
    #[serde(default)]
    pub include_docs: DocsFilter,
}

/// Coverage summary options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageOptions {
    /// Read and attach a coverage summary.
    pub include: bool,
    /// Istanbul-style `coverage-final.json` path, relative to the root.
    pub file: String,
}

impl Default for CoverageOptions {
    fn default() -> Self {
        Self {
            include: false,
            file: "coverage/coverage-final.json".to_owned(),
        }
    }
}

/// The full configuration surface of the report pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Report title.
    pub title: String,
    /// Description paragraph under the title.
    pub description: String,
    /// Output destination(s).
    pub output: OutputConfig,
    /// Formats to emit.
    pub formats: Vec<ReportFormat>,
    /// Markdown grouping mode.
    pub group_by: Grouping,
    /// Scenario heading level for ungrouped output.
    pub heading_level: Option<u8>,
    /// Step rendering style.
    pub step_style: StepStyle,
    /// Scenario ordering inside groups.
    pub sort_scenarios: SortOrder,
    /// File ordering inside reports.
    pub sort_files: SortOrder,
    /// Canonical test-case ordering (`source` or `alpha`).
    pub canonical_order: crate::canonicalize::CanonicalOrder,
    /// Status icons on scenario headings.
    pub include_status: bool,
    /// Duration suffixes.
    pub include_durations: bool,
    /// Failure text in Markdown.
    pub include_error_in_markdown: bool,
    /// Write reports (and the default destination) even when empty.
    pub include_empty: bool,
    /// Metadata table.
    pub include_metadata: bool,
    /// Metadata table options.
    pub metadata: MetadataOptions,
    /// Summary tables.
    pub include_summary_table: bool,
    /// YAML front matter.
    pub include_front_matter: bool,
    /// JSON output options.
    pub json: JsonOutputOptions,
    /// Coverage options.
    pub coverage: CoverageOptions,
    /// Ticket link template with `{ticket}` placeholder.
    pub ticket_url_template: Option<String>,
    /// Base URL for source permalinks.
    pub permalink_base_url: Option<String>,
    /// `Source:` links under files and scenarios.
    pub include_source_links: bool,
    /// Scenario filters.
    pub filter: ScenarioFilter,
    /// Optional canonical `RawRun` dump destination.
    pub raw_run_file: Option<String>,
    /// Project root; source paths are kept relative to it.
    pub project_root: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "User Stories".to_owned(),
            description: String::new(),
            output: OutputConfig::default(),
            formats: vec![ReportFormat::Markdown],
            group_by: Grouping::File,
            heading_level: None,
            step_style: StepStyle::Bullets,
            sort_scenarios: SortOrder::Alpha,
            sort_files: SortOrder::Alpha,
            canonical_order: crate::canonicalize::CanonicalOrder::Source,
            include_status: true,
            include_durations: false,
            include_error_in_markdown: true,
            include_empty: true,
            include_metadata: true,
            metadata: MetadataOptions::default(),
            include_summary_table: false,
            include_front_matter: false,
            json: JsonOutputOptions::default(),
            coverage: CoverageOptions::default(),
            ticket_url_template: None,
            permalink_base_url: None,
            include_source_links: true,
            filter: ScenarioFilter::default(),
            raw_run_file: None,
            project_root: ".".to_owned(),
        }
    }
}

impl ReportConfig {
    /// Metadata date format shorthand.
    #[must_use]
    pub fn date_format(&self) -> DateFormat {
        self.metadata.date
    }
}
