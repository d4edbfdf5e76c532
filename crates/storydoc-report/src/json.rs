//! JSON report generator: `{meta: {...}, scenarios: [...]}`.
//!
//! Structurally the same traversal as the Markdown generator, emitted as a
//! machine format. Doc entries can be filtered by capture phase.

use serde::Serialize;
use storydoc_error::Result;
use storydoc_types::{DocEntry, RawRun, RawTestCase};

use crate::options::DocsFilter;
use crate::status::derive_status;
use crate::util::{iso_timestamp, short_sha};

/// JSON generator options.
#[derive(Debug, Clone)]
pub struct JsonReportOptions {
    /// Report title carried in `meta`.
    pub title: String,
    /// Optional description carried in `meta`.
    pub description: String,
    /// Which doc phases to keep.
    pub include_docs: DocsFilter,
}

impl Default for JsonReportOptions {
    fn default() -> Self {
        Self {
            title: "User Stories".to_owned(),
            description: String::new(),
            include_docs: DocsFilter::All,
        }
    }
}

#[derive(Serialize)]
struct JsonReport {
    meta: JsonMeta,
    scenarios: Vec<JsonScenario>,
}

#[derive(Serialize)]
struct JsonMeta {
    schema_version: u32,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_sec: Option<f64>,
    project_root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    package_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    git_sha: Option<String>,
    output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    coverage: Option<storydoc_types::CoverageSummary>,
}

#[derive(Serialize)]
struct JsonScenario {
    id: String,
    title: String,
    source_file: String,
    suite_path: Vec<String>,
    tags: Vec<String>,
    tickets: Vec<String>,
    status: JsonStatus,
    outcome: storydoc_types::OutcomeCounts,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    docs: Vec<DocEntry>,
    steps: Vec<JsonStep>,
}

#[derive(Serialize)]
struct JsonStatus(&'static str);

#[derive(Serialize)]
struct JsonStep {
    keyword: String,
    text: String,
    mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
    wrapped: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    docs: Vec<DocEntry>,
}

/// Render the JSON report for one routed destination.
///
/// # Errors
/// Serialization failure only.
pub fn render_json(
    run: &RawRun,
    cases: &[RawTestCase],
    output_path: &str,
    opts: &JsonReportOptions,
) -> Result<String> {
    #[allow(clippy::cast_precision_loss)]
    let report = JsonReport {
        meta: JsonMeta {
            schema_version: 1,
            title: opts.title.clone(),
            description: (!opts.description.is_empty()).then(|| opts.description.clone()),
            generated_at: iso_timestamp(run.generated_at_ms),
            duration_sec: run.duration_ms.map(|ms| ms as f64 / 1000.0),
            project_root: run.project_root.clone(),
            package_version: run.package_version.clone(),
            git_sha: run.git_sha.as_deref().map(|sha| short_sha(sha).to_owned()),
            output_path: output_path.to_owned(),
            coverage: run.coverage,
        },
        scenarios: cases
            .iter()
            .filter_map(|case| json_scenario(case, opts.include_docs))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn json_scenario(case: &RawTestCase, filter: DocsFilter) -> Option<JsonScenario> {
    let story = case.story.as_ref()?;
    Some(JsonScenario {
        id: case.scenario_id.clone(),
        title: story.scenario.clone(),
        source_file: story.source_file.clone(),
        suite_path: story.suite_path.clone(),
        tags: story.tags.clone(),
        tickets: story.tickets.clone(),
        status: JsonStatus(derive_status(case.outcome, story.step_count()).word()),
        outcome: case.outcome,
        duration_ms: case.duration_ms,
        failure_details: case.failure_details.clone(),
        docs: filter_docs(&story.docs, filter),
        steps: story
            .steps
            .iter()
            .map(|step| JsonStep {
                keyword: step.keyword.label().to_owned(),
                text: step.text.clone(),
                mode: step.mode.label().to_owned(),
                duration_ms: step.duration_ms,
                wrapped: step.wrapped,
                docs: filter_docs(&step.docs, filter),
            })
            .collect(),
    })
}

fn filter_docs(docs: &[DocEntry], filter: DocsFilter) -> Vec<DocEntry> {
    match filter {
        DocsFilter::All => docs.to_vec(),
        DocsFilter::Static => docs
            .iter()
            .filter(|d| d.phase() == storydoc_types::DocPhase::Static)
            .cloned()
            .collect(),
        DocsFilter::Runtime => docs
            .iter()
            .filter(|d| d.phase() == storydoc_types::DocPhase::Runtime)
            .cloned()
            .collect(),
    }
}
