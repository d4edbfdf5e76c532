//! JUnit XML generator.
//!
//! Standard `<testsuites>` → `<testsuite>` (one per source file) →
//! `<testcase>` nesting for CI systems. Failed scenarios get `<failure>`
//! blocks; skip-only scenarios get `<skipped/>`; steps and docs are carried
//! as plain text in `<system-out>`.

use storydoc_types::{RawRun, RawTestCase, StoryMeta};

use crate::docs::render_doc_entry_plain;
use crate::status::{derive_status, StatusIcon};

/// JUnit generator options.
#[derive(Debug, Clone)]
pub struct JUnitOptions {
    /// `<testsuites name>` attribute.
    pub suite_name: String,
    /// Include `<system-out>` with steps and docs.
    pub include_output: bool,
}

impl Default for JUnitOptions {
    fn default() -> Self {
        Self {
            suite_name: "User Stories".to_owned(),
            include_output: true,
        }
    }
}

/// Render the JUnit XML report for one routed destination.
#[must_use]
pub fn render_junit(_run: &RawRun, cases: &[RawTestCase], opts: &JUnitOptions) -> String {
    let narrated: Vec<&RawTestCase> = cases.iter().filter(|c| c.story.is_some()).collect();

    let tests = narrated.len();
    let failures = narrated.iter().filter(|c| is_failed(c)).count();
    let skipped = narrated.iter().filter(|c| is_skipped(c)).count();
    let total_ms: u64 = narrated.iter().map(|c| c.duration_ms).sum();

    let mut lines: Vec<String> = Vec::new();
    lines.push(r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_owned());
    lines.push(format!(
        r#"<testsuites name="{}" tests="{tests}" failures="{failures}" errors="0" skipped="{skipped}" time="{}">"#,
        escape_xml(&opts.suite_name),
        seconds(total_ms),
    ));

    // One testsuite per source file, first-seen order.
    let mut by_file: Vec<(String, Vec<&RawTestCase>)> = Vec::new();
    for case in narrated {
        let file = case.identity.source_file.replace('\\', "/");
        match by_file.iter_mut().find(|(f, _)| *f == file) {
            Some((_, bucket)) => bucket.push(case),
            None => by_file.push((file, vec![case])),
        }
    }

    for (file, bucket) in by_file {
        let tests = bucket.len();
        let failures = bucket.iter().filter(|c| is_failed(c)).count();
        let skipped = bucket.iter().filter(|c| is_skipped(c)).count();
        let file_ms: u64 = bucket.iter().map(|c| c.duration_ms).sum();
        lines.push(format!(
            r#"  <testsuite name="{}" tests="{tests}" failures="{failures}" errors="0" skipped="{skipped}" time="{}">"#,
            escape_xml(&file),
            seconds(file_ms),
        ));
        for case in bucket {
            render_test_case(&mut lines, case, opts);
        }
        lines.push("  </testsuite>".to_owned());
    }

    lines.push("</testsuites>".to_owned());
    lines.join("\n")
}

fn render_test_case(lines: &mut Vec<String>, case: &RawTestCase, opts: &JUnitOptions) {
    let Some(story) = case.story.as_ref() else {
        return;
    };

    let classname = if case.identity.title_path.len() > 1 {
        case.identity.title_path[..case.identity.title_path.len() - 1].join(".")
    } else {
        // Fall back to the source file with separators dotted and the
        // extension stripped.
        let mut base = case.identity.source_file.replace(['\\', '/'], ".");
        if let Some(idx) = base.rfind('.') {
            base.truncate(idx);
        }
        base
    };
    let name = &story.scenario;
    let time = seconds(case.duration_ms);

    let has_failure = is_failed(case);
    let has_skipped = is_skipped(case);
    let has_output = opts.include_output && (!story.steps.is_empty() || !story.docs.is_empty());

    if !(has_failure || has_skipped || has_output) {
        lines.push(format!(
            r#"    <testcase classname="{}" name="{}" time="{time}"/>"#,
            escape_xml(&classname),
            escape_xml(name),
        ));
        return;
    }

    lines.push(format!(
        r#"    <testcase classname="{}" name="{}" time="{time}">"#,
        escape_xml(&classname),
        escape_xml(name),
    ));

    if has_failure {
        let message = case
            .failure_details
            .as_deref()
            .and_then(|d| d.lines().next())
            .unwrap_or("Test failed");
        lines.push(format!(
            r#"      <failure message="{}">"#,
            escape_xml(message)
        ));
        if let Some(details) = case.failure_details.as_deref() {
            lines.push(escape_xml(details));
        }
        lines.push("      </failure>".to_owned());
    } else if has_skipped {
        lines.push(r#"      <skipped message="Test skipped"/>"#.to_owned());
    }

    if has_output {
        let output = system_out(story);
        lines.push(format!("      <system-out>{}</system-out>", escape_xml(&output)));
    }

    lines.push("    </testcase>".to_owned());
}

fn system_out(story: &StoryMeta) -> String {
    let mut out: Vec<String> = Vec::new();

    for entry in &story.docs {
        out.push(render_doc_entry_plain(entry, ""));
    }
    if !story.docs.is_empty() {
        out.push(String::new());
    }

    for step in &story.steps {
        let mut block = vec![format!("{} {}", step.keyword, step.text)];
        for entry in &step.docs {
            block.push(render_doc_entry_plain(entry, "  "));
        }
        out.push(block.join("\n"));
    }

    out.join("\n").trim().to_owned()
}

fn is_failed(case: &RawTestCase) -> bool {
    case.outcome.failed > 0
}

fn is_skipped(case: &RawTestCase) -> bool {
    let steps = case.story.as_ref().map_or(0, StoryMeta::step_count);
    matches!(derive_status(case.outcome, steps), StatusIcon::Skip)
}

fn seconds(ms: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let secs = ms as f64 / 1000.0;
    format!("{secs:.3}")
}

/// Escape the five XML special characters.
fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
