//! The end-of-run pipeline: drain → canonicalize → filter → route →
//! render → write.
//!
//! Runs once, single-threaded, after every producer has flushed. An
//! interrupted run skips generation entirely; publishing a partial report
//! for an aborted run would be worse than publishing none.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use storydoc_error::Result;
use storydoc_report::{
    render_cucumber, render_json, render_junit, render_markdown, CucumberOptions,
    CustomRendererRegistry, JUnitOptions, JsonReportOptions, MarkdownOptions,
};
use storydoc_store::MergedRecord;
use storydoc_types::{HostOutcome, RawRun, RawTestCase, RunCompletion, ScenarioIdentity};

use crate::canonicalize::{canonicalize, CanonicalizeOptions};
use crate::config::{OutputMode, ReportConfig, ReportFormat};
use crate::filter::apply_filters;
use crate::meta::{read_coverage_summary, read_git_sha, read_package_version};
use crate::route::route;

/// Wall-clock timing of the run, supplied by the host adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTiming {
    /// Run start, epoch milliseconds.
    pub started_at_ms: Option<u64>,
    /// Total run duration.
    pub duration_ms: Option<u64>,
}

/// What one `generate` call produced.
#[derive(Debug)]
pub struct GeneratedReport {
    /// True when an interrupted run skipped generation.
    pub skipped: bool,
    /// Files written, in write order.
    pub written: Vec<PathBuf>,
    /// The canonical run, absent when skipped.
    pub run: Option<RawRun>,
}

impl GeneratedReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            written: Vec::new(),
            run: None,
        }
    }
}

/// The report engine: owns the configuration and the custom-renderer
/// registry, and drives one reporting pass per run.
pub struct ReportEngine {
    config: ReportConfig,
    renderers: CustomRendererRegistry,
}

impl std::fmt::Debug for ReportEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReportEngine {
    /// An engine with the default (empty) renderer registry.
    #[must_use]
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            renderers: CustomRendererRegistry::new(),
        }
    }

    /// An engine with user-registered custom doc renderers.
    #[must_use]
    pub fn with_renderers(config: ReportConfig, renderers: CustomRendererRegistry) -> Self {
        Self { config, renderers }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Run one reporting pass. Output paths resolve against the configured
    /// project root.
    ///
    /// # Errors
    /// I/O or serialization failure while writing reports. Reconciliation
    /// and rendering problems inside the pass are contained and logged.
    pub fn generate(
        &self,
        drained: Vec<(ScenarioIdentity, MergedRecord)>,
        host_outcomes: &[HostOutcome],
        completion: RunCompletion,
        timing: RunTiming,
    ) -> Result<GeneratedReport> {
        if completion == RunCompletion::Interrupted {
            tracing::info!("run interrupted; skipping report generation");
            return Ok(GeneratedReport::skipped());
        }

        let root = Path::new(&self.config.project_root);
        let coverage = if self.config.coverage.include {
            read_coverage_summary(&root.join(&self.config.coverage.file))
        } else {
            None
        };
        let git_sha = if self.config.metadata.git_sha {
            read_git_sha(root)
        } else {
            None
        };
        let package_version = if self.config.metadata.package_version {
            read_package_version(root)
        } else {
            None
        };

        let mut run = canonicalize(
            drained,
            host_outcomes,
            &CanonicalizeOptions {
                order: self.config.canonical_order,
                project_root: self.config.project_root.clone(),
                git_sha,
                package_version,
                coverage,
                started_at_ms: timing.started_at_ms,
                duration_ms: timing.duration_ms,
                generated_at_ms: now_ms(),
            },
        );
        run.test_cases = apply_filters(std::mem::take(&mut run.test_cases), &self.config.filter);

        let rules = self.config.output.rules();
        let routed = route(
            &rules,
            run.test_cases.clone(),
            self.config.output.default_file(),
            self.config.include_empty,
        );

        let colocated_extensions: Vec<&str> = rules
            .iter()
            .filter(|rule| rule.mode == OutputMode::Colocated)
            .map(|rule| rule.extension.as_deref().unwrap_or(".docs.md"))
            .collect();

        let mut written = Vec::new();
        for (destination, cases) in &routed {
            if cases.is_empty() && !self.config.include_empty {
                continue;
            }
            let colocated = is_colocated_destination(destination, cases, &colocated_extensions);
            for format in &self.config.formats {
                let (path, content) =
                    self.render_one(*format, &run, cases, destination, colocated)?;
                let full = root.join(&path);
                if let Some(parent) = full.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&full, format!("{content}\n"))?;
                written.push(full);
            }
        }

        if let Some(raw_path) = self.config.raw_run_file.as_deref() {
            let full = root.join(raw_path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&full, format!("{}\n", serde_json::to_string_pretty(&run)?))?;
            written.push(full);
        }

        Ok(GeneratedReport {
            skipped: false,
            written,
            run: Some(run),
        })
    }

    fn render_one(
        &self,
        format: ReportFormat,
        run: &RawRun,
        cases: &[RawTestCase],
        destination: &str,
        colocated: bool,
    ) -> Result<(String, String)> {
        match format {
            ReportFormat::Markdown => {
                let opts = self.markdown_options(colocated);
                let content = render_markdown(run, cases, destination, &opts, &self.renderers);
                Ok((destination.to_owned(), content))
            }
            ReportFormat::Json => {
                let path = self.json_destination(destination, colocated);
                let opts = JsonReportOptions {
                    title: self.config.title.clone(),
                    description: self.config.description.clone(),
                    include_docs: self.config.json.include_docs,
                };
                let content = render_json(run, cases, &path, &opts)?;
                Ok((path, content))
            }
            ReportFormat::JunitXml => {
                let opts = JUnitOptions {
                    suite_name: self.config.title.clone(),
                    include_output: true,
                };
                Ok((
                    swap_extension(destination, ".xml"),
                    render_junit(run, cases, &opts),
                ))
            }
            ReportFormat::CucumberJson => Ok((
                swap_extension(destination, ".cucumber.json"),
                render_cucumber(run, cases, &CucumberOptions::default())?,
            )),
        }
    }

    fn markdown_options(&self, colocated: bool) -> MarkdownOptions {
        MarkdownOptions {
            title: self.config.title.clone(),
            description: self.config.description.clone(),
            grouping: self.config.group_by,
            heading_level: self.config.heading_level,
            step_style: self.config.step_style,
            include_status: self.config.include_status,
            include_durations: self.config.include_durations,
            include_error: self.config.include_error_in_markdown,
            include_metadata: self.config.include_metadata,
            metadata: self.config.metadata,
            include_summary_table: self.config.include_summary_table,
            include_front_matter: self.config.include_front_matter,
            sort_files: self.config.sort_files,
            sort_scenarios: self.config.sort_scenarios,
            include_source_links: self.config.include_source_links,
            permalink_base_url: self.config.permalink_base_url.clone(),
            ticket_url_template: self.config.ticket_url_template.clone(),
            colocated,
        }
    }

    fn json_destination(&self, destination: &str, colocated: bool) -> String {
        if !colocated {
            if let Some(path) = self.config.json.output_file.as_deref() {
                return path.to_owned();
            }
        }
        swap_extension(destination, ".json")
    }
}

/// A destination renders in colocated style when it was produced by a
/// colocated rule (recognizable by its extension) and holds exactly one
/// source file.
fn is_colocated_destination(
    destination: &str,
    cases: &[RawTestCase],
    colocated_extensions: &[&str],
) -> bool {
    if !colocated_extensions
        .iter()
        .any(|ext| destination.ends_with(ext))
    {
        return false;
    }
    let mut files = cases.iter().map(|c| c.identity.source_file.as_str());
    let Some(first) = files.next() else {
        return false;
    };
    files.all(|f| f == first)
}

/// Swap a trailing `.md` for `replacement`, or append it.
fn swap_extension(destination: &str, replacement: &str) -> String {
    destination.strip_suffix(".md").map_or_else(
        || format!("{destination}{replacement}"),
        |base| format!("{base}{replacement}"),
    )
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_swap_handles_md_and_other_suffixes() {
        assert_eq!(swap_extension("docs/all.md", ".json"), "docs/all.json");
        assert_eq!(swap_extension("docs/all.md", ".xml"), "docs/all.xml");
        assert_eq!(
            swap_extension("docs/all.txt", ".json"),
            "docs/all.txt.json"
        );
    }

    #[test]
    fn colocated_detection_needs_extension_and_single_source() {
        use storydoc_types::{OutcomeCounts, StoryMeta};

        let case = |file: &str| {
            let identity = ScenarioIdentity::new(file, vec!["t".to_owned()]);
            RawTestCase {
                scenario_id: identity.scenario_id(),
                identity,
                story: Some(StoryMeta::new("t")),
                outcome: OutcomeCounts::ZERO,
                duration_ms: 0,
                failure_details: None,
            }
        };
        let exts = vec![".docs.md"];
        assert!(is_colocated_destination(
            "src/calc.docs.md",
            &[case("src/calc.test.ts")],
            &exts
        ));
        assert!(!is_colocated_destination(
            "docs/all.md",
            &[case("src/calc.test.ts")],
            &exts
        ));
        assert!(!is_colocated_destination(
            "src/calc.docs.md",
            &[case("a.test.ts"), case("b.test.ts")],
            &exts
        ));
        assert!(!is_colocated_destination("src/calc.docs.md", &[], &exts));
    }
}
