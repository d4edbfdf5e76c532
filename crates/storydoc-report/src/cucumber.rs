//! Cucumber-JSON generator.
//!
//! Classic `feature → elements → steps` nesting, one feature per source
//! file. The internal four-state counter model maps onto Cucumber status
//! strings; line numbers are synthetic and advance past each scenario's
//! steps so consumers that sort by line stay stable.

use serde::Serialize;
use storydoc_error::Result;
use storydoc_types::{RawRun, RawTestCase, StepMode, StoryMeta};

use crate::status::{derive_status, StatusIcon};

/// Cucumber-JSON generator options.
#[derive(Debug, Clone)]
pub struct CucumberOptions {
    /// Pretty-print the JSON output.
    pub pretty: bool,
}

impl Default for CucumberOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[derive(Serialize)]
struct Feature {
    uri: String,
    id: String,
    keyword: &'static str,
    name: String,
    line: u32,
    description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
    elements: Vec<Element>,
}

#[derive(Serialize)]
struct Tag {
    name: String,
    line: u32,
}

#[derive(Serialize)]
struct Element {
    id: String,
    keyword: &'static str,
    name: String,
    line: u32,
    description: String,
    #[serde(rename = "type")]
    element_type: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
    steps: Vec<Step>,
}

#[derive(Serialize)]
struct Step {
    keyword: String,
    name: String,
    line: u32,
    result: StepResult,
}

#[derive(Serialize)]
struct StepResult {
    status: &'static str,
    /// Nanoseconds, per the Cucumber convention.
    duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

/// Render the Cucumber-JSON report for one routed destination.
///
/// # Errors
/// Serialization failure only.
pub fn render_cucumber(
    _run: &RawRun,
    cases: &[RawTestCase],
    opts: &CucumberOptions,
) -> Result<String> {
    let narrated: Vec<&RawTestCase> = cases.iter().filter(|c| c.story.is_some()).collect();

    // One feature per source file, first-seen order.
    let mut by_file: Vec<(String, Vec<&RawTestCase>)> = Vec::new();
    for case in narrated {
        let file = case.identity.source_file.clone();
        match by_file.iter_mut().find(|(f, _)| *f == file) {
            Some((_, bucket)) => bucket.push(case),
            None => by_file.push((file, vec![case])),
        }
    }

    let features: Vec<Feature> = by_file
        .into_iter()
        .map(|(uri, bucket)| build_feature(&uri, &bucket))
        .collect();

    let out = if opts.pretty {
        serde_json::to_string_pretty(&features)?
    } else {
        serde_json::to_string(&features)?
    };
    Ok(out)
}

fn build_feature(uri: &str, cases: &[&RawTestCase]) -> Feature {
    let feature_id = slug(uri);
    let name = feature_name(uri, cases);

    // Feature tags: union of scenario tags, first-seen order.
    let mut tags: Vec<Tag> = Vec::new();
    for case in cases {
        if let Some(story) = case.story.as_ref() {
            for tag in &story.tags {
                let rendered = format!("@{tag}");
                if !tags.iter().any(|t| t.name == rendered) {
                    tags.push(Tag {
                        name: rendered,
                        line: 1,
                    });
                }
            }
        }
    }

    let mut elements = Vec::with_capacity(cases.len());
    // Feature header occupies line 1; the first scenario starts below it.
    let mut line = 2_u32;
    for case in cases {
        let Some(story) = case.story.as_ref() else {
            continue;
        };
        let (element, next_line) = build_element(case, story, &feature_id, line);
        elements.push(element);
        line = next_line;
    }

    Feature {
        uri: uri.to_owned(),
        id: feature_id,
        keyword: "Feature",
        name,
        line: 1,
        description: String::new(),
        tags,
        elements,
    }
}

fn feature_name(uri: &str, cases: &[&RawTestCase]) -> String {
    for case in cases {
        if let Some(story) = case.story.as_ref() {
            if let Some(first) = story.suite_path.first() {
                return first.clone();
            }
        }
    }
    std::path::Path::new(uri)
        .file_stem()
        .map_or_else(|| uri.to_owned(), |s| s.to_string_lossy().into_owned())
}

fn build_element(
    case: &RawTestCase,
    story: &StoryMeta,
    feature_id: &str,
    line: u32,
) -> (Element, u32) {
    let scenario_status = derive_status(case.outcome, story.step_count());

    let steps = build_steps(case, story, scenario_status, line);
    let step_count = u32::try_from(steps.len()).unwrap_or(u32::MAX);

    let tags = story
        .tags
        .iter()
        .map(|t| Tag {
            name: format!("@{t}"),
            line,
        })
        .collect();

    let element = Element {
        id: format!("{feature_id};{}", slug(&story.scenario)),
        keyword: "Scenario",
        name: story.scenario.clone(),
        line,
        description: String::new(),
        element_type: "scenario",
        tags,
        steps,
    };

    // Next scenario starts past this one's steps with a one-line gap.
    (element, line + step_count + 2)
}

fn build_steps(
    case: &RawTestCase,
    story: &StoryMeta,
    scenario_status: StatusIcon,
    scenario_line: u32,
) -> Vec<Step> {
    let total = story.steps.len();
    story
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let is_last = index + 1 == total;
            let status = step_status(step.mode, scenario_status, is_last);
            let error_message = if status == "failed" {
                case.failure_details.clone()
            } else {
                None
            };
            Step {
                keyword: format!("{} ", step.keyword),
                name: step.text.clone(),
                line: scenario_line + 1 + u32::try_from(index).unwrap_or(u32::MAX),
                result: StepResult {
                    status,
                    duration: step.duration_ms.unwrap_or(0) * 1_000_000,
                    error_message,
                },
            }
        })
        .collect()
}

/// Step status synthesis: the model carries scenario-level counters plus
/// per-step modes, so failure is pinned to the last normal step.
fn step_status(mode: StepMode, scenario: StatusIcon, is_last_step: bool) -> &'static str {
    match mode {
        StepMode::Skip => "skipped",
        StepMode::Todo => "pending",
        StepMode::Normal | StepMode::Fail | StepMode::Slow => match scenario {
            StatusIcon::Fail => {
                if is_last_step {
                    "failed"
                } else {
                    "passed"
                }
            }
            StatusIcon::Pass => "passed",
            StatusIcon::Skip => "skipped",
            StatusIcon::Todo => "pending",
            StatusIcon::Mixed => "undefined",
        },
    }
}

fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use storydoc_types::{OutcomeCounts, ScenarioIdentity, StepKeyword, StoryStep};

    fn case(file: &str, suite: &[&str], title: &str, outcome: OutcomeCounts) -> RawTestCase {
        let mut title_path: Vec<String> = suite.iter().map(|s| (*s).to_owned()).collect();
        title_path.push(title.to_owned());
        let identity = ScenarioIdentity::new(file, title_path);
        let mut story = StoryMeta::new(title);
        story.source_file = file.to_owned();
        story.suite_path = suite.iter().map(|s| (*s).to_owned()).collect();
        story.tags = vec!["smoke".into()];
        story.steps.push(StoryStep::new(StepKeyword::Given, "a state"));
        story.steps.push(StoryStep::new(StepKeyword::Then, "a check"));
        RawTestCase {
            scenario_id: identity.scenario_id(),
            identity,
            story: Some(story),
            outcome,
            duration_ms: 10,
            failure_details: None,
        }
    }

    fn run() -> RawRun {
        RawRun {
            test_cases: Vec::new(),
            project_root: ".".into(),
            coverage: None,
            git_sha: None,
            package_version: None,
            started_at_ms: None,
            duration_ms: None,
            generated_at_ms: 0,
        }
    }

    fn pass() -> OutcomeCounts {
        OutcomeCounts {
            passed: 2,
            failed: 0,
            skipped: 0,
            todo: 0,
        }
    }

    #[test]
    fn classic_nesting_is_reproduced() {
        let json = render_cucumber(
            &run(),
            &[case("features/login.test.ts", &["Login"], "signs in", pass())],
            &CucumberOptions::default(),
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let feature = &value[0];
        assert_eq!(feature["keyword"], "Feature");
        assert_eq!(feature["name"], "Login");
        assert_eq!(feature["uri"], "features/login.test.ts");
        let element = &feature["elements"][0];
        assert_eq!(element["type"], "scenario");
        assert_eq!(element["steps"][0]["keyword"], "Given ");
        assert_eq!(element["steps"][0]["result"]["status"], "passed");
    }

    #[test]
    fn failed_scenario_pins_failure_to_last_step() {
        let mut c = case(
            "calc.test.ts",
            &[],
            "breaks",
            OutcomeCounts {
                passed: 1,
                failed: 1,
                skipped: 0,
                todo: 0,
            },
        );
        c.failure_details = Some("assertion failed".into());
        let json = render_cucumber(&run(), &[c], &CucumberOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let steps = value[0]["elements"][0]["steps"].as_array().unwrap();
        assert_eq!(steps[0]["result"]["status"], "passed");
        assert_eq!(steps[1]["result"]["status"], "failed");
        assert_eq!(steps[1]["result"]["error_message"], "assertion failed");
    }

    #[test]
    fn skip_mode_steps_report_skipped() {
        let mut c = case("calc.test.ts", &[], "partial", pass());
        c.story.as_mut().unwrap().steps[0].mode = StepMode::Skip;
        let json = render_cucumber(&run(), &[c], &CucumberOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let steps = value[0]["elements"][0]["steps"].as_array().unwrap();
        assert_eq!(steps[0]["result"]["status"], "skipped");
    }

    #[test]
    fn scenario_lines_advance_past_steps() {
        let cases = vec![
            case("calc.test.ts", &[], "first", pass()),
            case("calc.test.ts", &[], "second", pass()),
        ];
        let json = render_cucumber(&run(), &cases, &CucumberOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let elements = value[0]["elements"].as_array().unwrap();
        let first_line = elements[0]["line"].as_u64().unwrap();
        let second_line = elements[1]["line"].as_u64().unwrap();
        assert_eq!(first_line, 2);
        assert_eq!(second_line, first_line + 2 + 2, "two steps plus gap");
    }

    #[test]
    fn feature_tags_are_scenario_tag_union() {
        let json = render_cucumber(
            &run(),
            &[case("calc.test.ts", &[], "one", pass())],
            &CucumberOptions::default(),
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["tags"][0]["name"], "@smoke");
    }

    #[test]
    fn durations_are_nanoseconds() {
        let mut c = case("calc.test.ts", &[], "timed", pass());
        c.story.as_mut().unwrap().steps[0].duration_ms = Some(3);
        let json = render_cucumber(&run(), &[c], &CucumberOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value[0]["elements"][0]["steps"][0]["result"]["duration"],
            3_000_000
        );
    }

    #[test]
    fn slug_is_lowercase_dashed() {
        assert_eq!(slug("features/Login Flow.test.ts"), "features-login-flow-test-ts");
        assert_eq!(slug("Signs In!"), "signs-in");
    }
}
