//! Markdown report generator.
//!
//! Group-then-render: scenarios are grouped by file, by suite path, or not
//! at all, sorted per configuration, and rendered with the shared status
//! icons and doc-entry templates. The generator returns a string and never
//! touches the filesystem.

use std::collections::BTreeMap;

use storydoc_types::{RawRun, RawTestCase, StepMode, StoryStep};

use crate::docs::{render_doc_entry, CustomRendererRegistry};
use crate::options::{DateFormat, Grouping, MetadataOptions, SortOrder, StepStyle};
use crate::status::derive_status;
use crate::util::{format_duration, iso_timestamp, locale_timestamp, permalink, short_sha};

/// Markdown generator options.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Report title (first heading).
    pub title: String,
    /// Optional description paragraph under the title.
    pub description: String,
    /// Grouping mode.
    pub grouping: Grouping,
    /// Scenario heading level for ungrouped output. Defaults to 3.
    pub heading_level: Option<u8>,
    /// Bullet or gherkin steps.
    pub step_style: StepStyle,
    /// Status icons on scenario headings.
    pub include_status: bool,
    /// Scenario and step duration suffixes.
    pub include_durations: bool,
    /// Failure text blocks under failed scenarios.
    pub include_error: bool,
    /// Metadata table (date / version / git SHA / coverage).
    pub include_metadata: bool,
    /// Metadata table options.
    pub metadata: MetadataOptions,
    /// Start-time / totals tables.
    pub include_summary_table: bool,
    /// YAML front matter for machine parsing.
    pub include_front_matter: bool,
    /// File ordering within the report.
    pub sort_files: SortOrder,
    /// Scenario ordering within a group.
    pub sort_scenarios: SortOrder,
    /// `Source: [file](url)` links when a permalink base is set.
    pub include_source_links: bool,
    /// Base URL for source links.
    pub permalink_base_url: Option<String>,
    /// Ticket link template with a `{ticket}` placeholder.
    pub ticket_url_template: Option<String>,
    /// Render as a colocated file: single source, suite groups only.
    pub colocated: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            title: "User Stories".to_owned(),
            description: String::new(),
            grouping: Grouping::File,
            heading_level: None,
            step_style: StepStyle::Bullets,
            include_status: true,
            include_durations: false,
            include_error: true,
            include_metadata: true,
            metadata: MetadataOptions::default(),
            include_summary_table: false,
            include_front_matter: false,
            sort_files: SortOrder::Alpha,
            sort_scenarios: SortOrder::Alpha,
            include_source_links: true,
            permalink_base_url: None,
            ticket_url_template: None,
            colocated: false,
        }
    }
}

/// Render the Markdown report for one routed destination.
///
/// An empty `cases` slice still renders the title/metadata structure; the
/// pipeline decides whether such a report is written at all.
#[must_use]
pub fn render_markdown(
    run: &RawRun,
    cases: &[RawTestCase],
    output_path: &str,
    opts: &MarkdownOptions,
    registry: &CustomRendererRegistry,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    if opts.include_front_matter {
        render_front_matter(&mut lines, run, cases, output_path, opts);
    }

    lines.push(format!("# {}", opts.title));
    lines.push(String::new());
    if !opts.description.is_empty() {
        lines.push(opts.description.clone());
        lines.push(String::new());
    }

    if opts.include_metadata {
        render_metadata(&mut lines, run, opts);
        lines.push(String::new());
    }

    if opts.include_summary_table {
        render_summary_table(&mut lines, run, cases, opts);
    }

    let base = opts.permalink_base_url.as_deref();

    if opts.colocated || opts.grouping == Grouping::Suite {
        render_suite_groups(&mut lines, cases, 2, base, opts, registry);
    } else if opts.grouping == Grouping::None {
        let level = usize::from(opts.heading_level.unwrap_or(3));
        let heading = "#".repeat(level);
        for case in sorted_scenarios(cases, opts.sort_scenarios) {
            render_scenario(&mut lines, case, &heading, base, opts, registry);
        }
    } else {
        // Group by file (default).
        let mut by_file: Vec<(String, Vec<&RawTestCase>)> = Vec::new();
        for case in cases {
            let file = case.identity.source_file.clone();
            match by_file.iter_mut().find(|(f, _)| *f == file) {
                Some((_, bucket)) => bucket.push(case),
                None => by_file.push((file, vec![case])),
            }
        }
        if opts.sort_files == SortOrder::Alpha {
            by_file.sort_by(|(a, _), (b, _)| a.cmp(b));
        }

        for (file, bucket) in by_file {
            lines.push(format!("## {file}"));
            if opts.include_source_links {
                if let Some(base) = base {
                    lines.push(format!("Source: [{file}]({})", permalink(base, &file)));
                }
            }
            lines.push(String::new());
            let owned: Vec<RawTestCase> = bucket.into_iter().cloned().collect();
            render_suite_groups(&mut lines, &owned, 3, None, opts, registry);
        }
    }

    let mut out = lines.join("\n");
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out
}

// ─── Grouping and sorting ───────────────────────────────────────────────

fn sorted_scenarios(cases: &[RawTestCase], order: SortOrder) -> Vec<&RawTestCase> {
    let mut out: Vec<&RawTestCase> = cases.iter().collect();
    match order {
        SortOrder::Alpha => {
            out.sort_by(|a, b| scenario_title(a).cmp(scenario_title(b)));
        }
        SortOrder::Source => {
            out.sort_by(|a, b| {
                let ka = (
                    a.identity.source_file.as_str(),
                    a.story.as_ref().map_or(0, |s| s.source_order),
                );
                let kb = (
                    b.identity.source_file.as_str(),
                    b.story.as_ref().map_or(0, |s| s.source_order),
                );
                ka.cmp(&kb)
            });
        }
        SortOrder::None => {}
    }
    out
}

fn scenario_title(case: &RawTestCase) -> &str {
    case.story
        .as_ref()
        .map_or_else(|| case.identity.title(), |s| s.scenario.as_str())
}

fn render_suite_groups(
    lines: &mut Vec<String>,
    cases: &[RawTestCase],
    base_level: usize,
    permalink_base: Option<&str>,
    opts: &MarkdownOptions,
    registry: &CustomRendererRegistry,
) {
    let mut groups: BTreeMap<String, (Vec<String>, Vec<&RawTestCase>)> = BTreeMap::new();
    for case in cases {
        let path = case
            .story
            .as_ref()
            .map(|s| s.suite_path.clone())
            .unwrap_or_default();
        let key = path.join("\u{1f}");
        groups.entry(key).or_insert_with(|| (path, Vec::new())).1.push(case);
    }

    for (path, group) in groups.into_values() {
        if !path.is_empty() {
            lines.push(format!("{} {}", "#".repeat(base_level), path.join(" - ")));
            lines.push(String::new());
        }
        // Scenario headings sit one level below the suite header, capped
        // at #### so deep suites stay legal Markdown.
        let story_level = if path.is_empty() {
            base_level
        } else {
            (base_level + 1).min(4)
        };
        let heading = "#".repeat(story_level);

        let owned: Vec<RawTestCase> = group.into_iter().cloned().collect();
        for case in sorted_scenarios(&owned, opts.sort_scenarios) {
            render_scenario(lines, case, &heading, permalink_base, opts, registry);
        }
    }
}

// ─── Scenario and step rendering ────────────────────────────────────────

fn render_scenario(
    lines: &mut Vec<String>,
    case: &RawTestCase,
    heading: &str,
    permalink_base: Option<&str>,
    opts: &MarkdownOptions,
    registry: &CustomRendererRegistry,
) {
    let Some(story) = case.story.as_ref() else {
        // Never narrated; dropped, not rendered.
        return;
    };

    let icon = if opts.include_status {
        derive_status(case.outcome, story.step_count()).icon()
    } else {
        ""
    };
    let duration_suffix = if opts.include_durations && case.duration_ms > 0 {
        format!(" _({})_", format_duration(case.duration_ms))
    } else {
        String::new()
    };
    lines.push(format!("{heading} {icon}{}{duration_suffix}", story.scenario));

    if opts.include_source_links && !story.source_file.is_empty() {
        if let Some(base) = permalink_base {
            lines.push(format!(
                "Source: [{}]({})",
                story.source_file,
                permalink(base, &story.source_file)
            ));
        }
    }

    if !story.tags.is_empty() {
        let spans: Vec<String> = story.tags.iter().map(|t| format!("`{t}`")).collect();
        lines.push(format!("Tags: {}", spans.join(", ")));
    }

    if !story.tickets.is_empty() {
        let rendered: Vec<String> = match opts.ticket_url_template.as_deref() {
            Some(template) => story
                .tickets
                .iter()
                .map(|t| format!("[{t}]({})", template.replace("{ticket}", t)))
                .collect(),
            None => story.tickets.iter().map(|t| format!("`{t}`")).collect(),
        };
        lines.push(format!("Tickets: {}", rendered.join(", ")));
    }

    lines.push(String::new());

    for entry in &story.docs {
        render_doc_entry(lines, entry, "", registry);
    }

    for step in &story.steps {
        render_step(lines, step, opts, registry);
    }

    if case.outcome.failed > 0 && opts.include_error {
        if let Some(details) = case.failure_details.as_deref() {
            lines.push("**Failure**".to_owned());
            lines.push(String::new());
            lines.push("```text".to_owned());
            for line in details.split('\n') {
                lines.push(line.to_owned());
            }
            lines.push("```".to_owned());
            lines.push(String::new());
        }
    }

    lines.push(String::new());
}

fn render_step(
    lines: &mut Vec<String>,
    step: &StoryStep,
    opts: &MarkdownOptions,
    registry: &CustomRendererRegistry,
) {
    let mode_indicator = match step.mode {
        StepMode::Normal => "",
        StepMode::Skip => " _(skipped)_",
        StepMode::Todo => " _(todo)_",
        StepMode::Fail => " _(expected to fail)_",
        StepMode::Slow => " _(slow)_",
    };
    let duration_suffix = match step.duration_ms {
        Some(ms) if opts.include_durations && step.wrapped => {
            format!(" _({})_", format_duration(ms))
        }
        _ => String::new(),
    };

    let line = match opts.step_style {
        StepStyle::Gherkin => {
            format!("**{}** {}{mode_indicator}{duration_suffix}", step.keyword, step.text)
        }
        StepStyle::Bullets => {
            format!("- **{}** {}{mode_indicator}{duration_suffix}", step.keyword, step.text)
        }
    };
    lines.push(line);

    if !step.docs.is_empty() {
        let indent = match opts.step_style {
            StepStyle::Gherkin => "",
            StepStyle::Bullets => "    ",
        };
        for entry in &step.docs {
            render_doc_entry(lines, entry, indent, registry);
        }
    }
}

// ─── Header blocks ──────────────────────────────────────────────────────

fn render_metadata(lines: &mut Vec<String>, run: &RawRun, opts: &MarkdownOptions) {
    let start_ms = run.started_at_ms.unwrap_or(run.generated_at_ms);
    let mut rows: Vec<(&str, String)> = Vec::new();

    match opts.metadata.date {
        DateFormat::Iso => rows.push(("Date", iso_timestamp(start_ms))),
        DateFormat::Locale => rows.push(("Date", locale_timestamp(start_ms))),
        DateFormat::None => {}
    }
    if opts.metadata.package_version {
        if let Some(version) = run.package_version.as_deref() {
            rows.push(("Version", version.to_owned()));
        }
    }
    if opts.metadata.git_sha {
        if let Some(sha) = run.git_sha.as_deref() {
            rows.push(("Git SHA", short_sha(sha).to_owned()));
        }
    }

    if rows.is_empty() && run.coverage.is_none() {
        return;
    }

    if !rows.is_empty() {
        lines.push("| Key | Value |".to_owned());
        lines.push("| --- | --- |".to_owned());
        for (key, value) in rows {
            lines.push(format!("| {key} | {value} |"));
        }
    }

    if let Some(coverage) = run.coverage {
        lines.push(String::new());
        lines.push("| Coverage | Value |".to_owned());
        lines.push("| --- | --- |".to_owned());
        lines.push(format!("| Statements | {}% |", coverage.statements.pct));
        lines.push(format!("| Branches | {}% |", coverage.branches.pct));
        lines.push(format!("| Functions | {}% |", coverage.functions.pct));
        if let Some(lines_metric) = coverage.lines {
            lines.push(format!("| Lines | {}% |", lines_metric.pct));
        }
    }
}

fn render_summary_table(
    lines: &mut Vec<String>,
    run: &RawRun,
    cases: &[RawTestCase],
    opts: &MarkdownOptions,
) {
    let start_ms = run.started_at_ms.unwrap_or(run.generated_at_ms);
    #[allow(clippy::cast_precision_loss)]
    let duration_sec = run.duration_ms.unwrap_or(0) as f64 / 1000.0;

    lines.push("| Start time | Duration |".to_owned());
    lines.push("| --- | ---: |".to_owned());
    lines.push(format!(
        "| {} | {duration_sec:.2} s |",
        locale_timestamp(start_ms)
    ));
    lines.push(String::new());

    let scenarios = cases.len();
    let steps: usize = cases
        .iter()
        .filter_map(|c| c.story.as_ref())
        .map(storydoc_types::StoryMeta::step_count)
        .sum();
    let passed: u32 = cases.iter().map(|c| c.outcome.passed).sum();
    let failed: u32 = cases.iter().map(|c| c.outcome.failed).sum();
    let skipped: u32 = cases.iter().map(|c| c.outcome.skipped).sum();
    let total_duration: u64 = cases.iter().map(|c| c.duration_ms).sum();

    if opts.include_durations {
        lines.push("| Scenarios | Steps | Passed | Failed | Skipped | Duration |".to_owned());
        lines.push("| --- | ---: | ---: | ---: | ---: | ---: |".to_owned());
        lines.push(format!(
            "| {scenarios} | {steps} | {passed} | {failed} | {skipped} | {} |",
            format_duration(total_duration)
        ));
    } else {
        lines.push("| Scenarios | Steps | Passed | Failed | Skipped |".to_owned());
        lines.push("| --- | ---: | ---: | ---: | ---: |".to_owned());
        lines.push(format!(
            "| {scenarios} | {steps} | {passed} | {failed} | {skipped} |"
        ));
    }
    lines.push(String::new());
}

fn render_front_matter(
    lines: &mut Vec<String>,
    run: &RawRun,
    cases: &[RawTestCase],
    output_path: &str,
    opts: &MarkdownOptions,
) {
    let steps: usize = cases
        .iter()
        .filter_map(|c| c.story.as_ref())
        .map(storydoc_types::StoryMeta::step_count)
        .sum();
    let mut map = serde_json::Map::new();
    map.insert("schema_version".into(), serde_json::json!(1));
    map.insert("title".into(), serde_json::json!(opts.title));
    if !opts.description.is_empty() {
        map.insert("description".into(), serde_json::json!(opts.description));
    }
    map.insert(
        "generated_at".into(),
        serde_json::json!(iso_timestamp(run.generated_at_ms)),
    );
    if let Some(duration_ms) = run.duration_ms {
        #[allow(clippy::cast_precision_loss)]
        map.insert(
            "duration_sec".into(),
            serde_json::json!(duration_ms as f64 / 1000.0),
        );
    }
    map.insert("project_root".into(), serde_json::json!(run.project_root));
    if let Some(version) = run.package_version.as_deref() {
        map.insert("package_version".into(), serde_json::json!(version));
    }
    if let Some(sha) = run.git_sha.as_deref() {
        map.insert("git_sha".into(), serde_json::json!(short_sha(sha)));
    }
    map.insert("output_path".into(), serde_json::json!(output_path));
    map.insert("scenarios".into(), serde_json::json!(cases.len()));
    map.insert("steps".into(), serde_json::json!(steps));
    if let Some(coverage) = run.coverage {
        map.insert(
            "coverage".into(),
            serde_json::to_value(coverage).unwrap_or(serde_json::Value::Null),
        );
    }

    lines.push("---".to_owned());
    yaml_lines(lines, &serde_json::Value::Object(map), 0);
    lines.push("---".to_owned());
    lines.push(String::new());
}

/// Minimal YAML emission for the front matter block: maps, sequences, and
/// scalars only, which is all the front matter ever contains.
fn yaml_lines(lines: &mut Vec<String>, value: &serde_json::Value, indent: usize) {
    let pad = " ".repeat(indent);
    if let serde_json::Value::Object(map) = value {
        for (key, value) in map {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::Array(items) => {
                    lines.push(format!("{pad}{key}:"));
                    for item in items {
                        lines.push(format!("{pad}  - {}", scalar_yaml(item)));
                    }
                }
                serde_json::Value::Object(_) => {
                    lines.push(format!("{pad}{key}:"));
                    yaml_lines(lines, value, indent + 2);
                }
                scalar => lines.push(format!("{pad}{key}: {}", scalar_yaml(scalar))),
            }
        }
    }
}

fn scalar_yaml(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storydoc_types::{
        OutcomeCounts, ScenarioIdentity, StepKeyword, StoryMeta,
    };

    fn case(file: &str, suite: &[&str], title: &str, order: u64) -> RawTestCase {
        let mut title_path: Vec<String> = suite.iter().map(|s| (*s).to_owned()).collect();
        title_path.push(title.to_owned());
        let identity = ScenarioIdentity::new(file, title_path);
        let mut story = StoryMeta::new(title);
        story.source_file = file.to_owned();
        story.suite_path = suite.iter().map(|s| (*s).to_owned()).collect();
        story.source_order = order;
        story.steps.push(StoryStep::new(StepKeyword::Given, "a precondition"));
        RawTestCase {
            scenario_id: identity.scenario_id(),
            identity,
            story: Some(story),
            outcome: OutcomeCounts {
                passed: 1,
                failed: 0,
                skipped: 0,
                todo: 0,
            },
            duration_ms: 12,
            failure_details: None,
        }
    }

    fn bare_run() -> RawRun {
        RawRun {
            test_cases: Vec::new(),
            project_root: ".".into(),
            coverage: None,
            git_sha: None,
            package_version: None,
            started_at_ms: Some(1_700_000_000_000),
            duration_ms: Some(1_500),
            generated_at_ms: 1_700_000_001_500,
        }
    }

    fn plain_opts() -> MarkdownOptions {
        MarkdownOptions {
            include_metadata: false,
            ..MarkdownOptions::default()
        }
    }

    #[test]
    fn title_renders_even_with_no_scenarios() {
        let md = render_markdown(
            &bare_run(),
            &[],
            "docs/user-stories.md",
            &plain_opts(),
            &CustomRendererRegistry::new(),
        );
        assert!(md.starts_with("# User Stories"));
    }

    #[test]
    fn empty_step_text_keeps_trailing_space() {
        let mut c = case("calc.test.ts", &[], "edge", 0);
        c.story.as_mut().unwrap().steps = vec![StoryStep::new(StepKeyword::Given, "")];
        let md = render_markdown(
            &bare_run(),
            &[c],
            "out.md",
            &plain_opts(),
            &CustomRendererRegistry::new(),
        );
        assert!(
            md.lines().any(|l| l == "- **Given** "),
            "zero-length text must render verbatim: {md}"
        );
    }

    #[test]
    fn failed_scenario_gets_fail_icon_and_failure_block() {
        let mut c = case("calc.test.ts", &[], "breaks", 0);
        c.outcome = OutcomeCounts {
            passed: 1,
            failed: 1,
            skipped: 0,
            todo: 0,
        };
        c.failure_details = Some("expected 2, got 3".into());
        let md = render_markdown(
            &bare_run(),
            &[c],
            "out.md",
            &plain_opts(),
            &CustomRendererRegistry::new(),
        );
        assert!(md.contains("\u{274c} breaks"));
        assert!(md.contains("**Failure**"));
        assert!(md.contains("expected 2, got 3"));
    }

    #[test]
    fn grouping_by_file_emits_file_headers() {
        let cases = vec![
            case("b.test.ts", &["B"], "second", 0),
            case("a.test.ts", &["A"], "first", 0),
        ];
        let md = render_markdown(
            &bare_run(),
            &cases,
            "out.md",
            &plain_opts(),
            &CustomRendererRegistry::new(),
        );
        let a = md.find("## a.test.ts").unwrap();
        let b = md.find("## b.test.ts").unwrap();
        assert!(a < b, "alpha file sort");
    }

    #[test]
    fn suite_grouping_renders_suite_headers_across_files() {
        let cases = vec![
            case("a.test.ts", &["Checkout"], "pays", 0),
            case("b.test.ts", &["Checkout"], "refunds", 0),
        ];
        let opts = MarkdownOptions {
            grouping: Grouping::Suite,
            ..plain_opts()
        };
        let md = render_markdown(
            &bare_run(),
            &cases,
            "out.md",
            &opts,
            &CustomRendererRegistry::new(),
        );
        assert_eq!(md.matches("## Checkout").count(), 1);
        assert!(md.contains("### \u{2705} pays"));
        assert!(md.contains("### \u{2705} refunds"));
    }

    #[test]
    fn tickets_render_as_links_with_template() {
        let mut c = case("calc.test.ts", &[], "ticketed", 0);
        c.story.as_mut().unwrap().tickets = vec!["PROJ-7".into()];
        let opts = MarkdownOptions {
            ticket_url_template: Some("https://tracker.test/browse/{ticket}".into()),
            ..plain_opts()
        };
        let md = render_markdown(
            &bare_run(),
            &[c],
            "out.md",
            &opts,
            &CustomRendererRegistry::new(),
        );
        assert!(md.contains("Tickets: [PROJ-7](https://tracker.test/browse/PROJ-7)"));
    }

    #[test]
    fn tickets_render_as_code_spans_without_template() {
        let mut c = case("calc.test.ts", &[], "ticketed", 0);
        c.story.as_mut().unwrap().tickets = vec!["PROJ-7".into()];
        let md = render_markdown(
            &bare_run(),
            &[c],
            "out.md",
            &plain_opts(),
            &CustomRendererRegistry::new(),
        );
        assert!(md.contains("Tickets: `PROJ-7`"));
    }

    #[test]
    fn metadata_block_renders_sha_and_version() {
        let mut run = bare_run();
        run.git_sha = Some("0123456789abcdef".into());
        run.package_version = Some("1.2.3".into());
        let opts = MarkdownOptions::default();
        let md = render_markdown(
            &run,
            &[],
            "out.md",
            &opts,
            &CustomRendererRegistry::new(),
        );
        assert!(md.contains("| Git SHA | 0123456 |"));
        assert!(md.contains("| Version | 1.2.3 |"));
    }

    #[test]
    fn summary_table_counts_routed_cases_only() {
        let cases = vec![
            case("a.test.ts", &[], "one", 0),
            case("a.test.ts", &[], "two", 1),
        ];
        let opts = MarkdownOptions {
            include_summary_table: true,
            ..plain_opts()
        };
        let md = render_markdown(
            &bare_run(),
            &cases,
            "out.md",
            &opts,
            &CustomRendererRegistry::new(),
        );
        assert!(md.contains("| 2 | 2 | 2 | 0 | 0 |"));
    }

    #[test]
    fn gherkin_style_drops_bullets_and_indent() {
        let mut c = case("calc.test.ts", &[], "plain", 0);
        c.story.as_mut().unwrap().steps[0]
            .docs
            .push(storydoc_types::DocEntry::Note {
                text: "inline".into(),
                phase: storydoc_types::DocPhase::Static,
            });
        let opts = MarkdownOptions {
            step_style: StepStyle::Gherkin,
            ..plain_opts()
        };
        let md = render_markdown(
            &bare_run(),
            &[c],
            "out.md",
            &opts,
            &CustomRendererRegistry::new(),
        );
        assert!(md.lines().any(|l| l == "**Given** a precondition"));
        assert!(md.lines().any(|l| l == "> inline"));
    }

    #[test]
    fn front_matter_wraps_document() {
        let opts = MarkdownOptions {
            include_front_matter: true,
            ..plain_opts()
        };
        let md = render_markdown(
            &bare_run(),
            &[],
            "docs/all.md",
            &opts,
            &CustomRendererRegistry::new(),
        );
        assert!(md.starts_with("---\n"));
        assert!(md.contains("output_path: docs/all.md"));
        assert!(md.contains("scenarios: 0"));
    }

    #[test]
    fn skipped_step_mode_annotates_the_line() {
        let mut c = case("calc.test.ts", &[], "modal", 0);
        c.story.as_mut().unwrap().steps[0].mode = StepMode::Skip;
        let md = render_markdown(
            &bare_run(),
            &[c],
            "out.md",
            &plain_opts(),
            &CustomRendererRegistry::new(),
        );
        assert!(md.contains("- **Given** a precondition _(skipped)_"));
    }
}
