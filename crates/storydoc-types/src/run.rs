//! Wire records and the canonical run model.
//!
//! [`StoryPartial`] is what one producer writes for one scenario identity:
//! possibly just narrative, possibly just an outcome delta, possibly both.
//! [`RawTestCase`] and [`RawRun`] are the fully merged, ordered model the
//! report generators consume. A `RawRun` is created once per reporting pass
//! and never mutated after generation begins.

use serde::{Deserialize, Serialize};

use crate::{OutcomeCounts, ScenarioIdentity, StoryMeta};

// ─── Producer wire record ───────────────────────────────────────────────

/// One producer's partial observation of a scenario.
///
/// Partials for the same identity are merged lazily at drain time: counters
/// add, doc lists concatenate by step index, and the earliest-recorded
/// non-empty failure text wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryPartial {
    /// Narrative, when this producer recorded one. A partial carrying only
    /// outcome data leaves this empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<StoryMeta>,
    /// Outcome counter delta contributed by this observation.
    #[serde(default)]
    pub outcome: OutcomeCounts,
    /// Duration delta contributed by this observation.
    #[serde(default)]
    pub duration_ms: u64,
    /// Failure text observed by this producer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_details: Option<String>,
    /// Producer clock at record time. Makes failure-text precedence
    /// deterministic across out-of-order drains.
    #[serde(default)]
    pub recorded_at_ms: u64,
    /// Stable per-physical-event token. At-least-once channels replay
    /// writes; the store drops partials whose token it has already seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_token: Option<String>,
}

impl StoryPartial {
    /// A partial carrying only narrative.
    #[must_use]
    pub fn narrative(story: StoryMeta, recorded_at_ms: u64) -> Self {
        Self {
            story: Some(story),
            outcome: OutcomeCounts::ZERO,
            duration_ms: 0,
            failure_details: None,
            recorded_at_ms,
            write_token: None,
        }
    }

    /// A partial carrying only an outcome delta.
    #[must_use]
    pub fn outcome_delta(outcome: OutcomeCounts, duration_ms: u64, recorded_at_ms: u64) -> Self {
        Self {
            story: None,
            outcome,
            duration_ms,
            failure_details: None,
            recorded_at_ms,
            write_token: None,
        }
    }

    /// Attach a stable write token (fluent).
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.write_token = Some(token.into());
        self
    }

    /// Attach failure text (fluent).
    #[must_use]
    pub fn with_failure(mut self, details: impl Into<String>) -> Self {
        self.failure_details = Some(details.into());
        self
    }
}

// ─── Canonical run model ────────────────────────────────────────────────

/// Canonical unit after merge: one logical scenario with its narrative and
/// aggregated outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTestCase {
    /// Merge identity.
    pub identity: ScenarioIdentity,
    /// Stable 12-hex id derived from the identity.
    pub scenario_id: String,
    /// Narrative. The canonicalizer only emits cases that were narrated;
    /// a `None` here (hand-built or re-parsed input) is dropped by every
    /// renderer, never rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<StoryMeta>,
    /// Aggregated outcome counters across all merged observations.
    #[serde(default)]
    pub outcome: OutcomeCounts,
    /// Summed duration across merges.
    #[serde(default)]
    pub duration_ms: u64,
    /// Earliest non-empty failure text. Sticky: later successes do not
    /// clear it within one run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_details: Option<String>,
}

/// Coverage counts for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageMetric {
    /// Instrumentation points.
    pub total: u64,
    /// Points hit at least once.
    pub covered: u64,
    /// Rounded percentage; 100 when `total` is zero.
    pub pct: u32,
}

impl CoverageMetric {
    /// Build a metric, computing the rounded percentage.
    #[must_use]
    pub fn new(covered: u64, total: u64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        #[allow(clippy::cast_sign_loss)]
        let pct = if total == 0 {
            100
        } else {
            ((covered as f64 / total as f64) * 100.0).round() as u32
        };
        Self {
            total,
            covered,
            pct,
        }
    }
}

/// Coverage summary attached to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub statements: CoverageMetric,
    pub branches: CoverageMetric,
    pub functions: CoverageMetric,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<CoverageMetric>,
}

/// The full canonical run, ready for routing and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRun {
    /// Ordered test cases (see the canonicalizer for the ordering rules).
    pub test_cases: Vec<RawTestCase>,
    /// Project root all source paths are relative to.
    pub project_root: String,
    /// Coverage summary, when configured and available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageSummary>,
    /// Git commit SHA, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
    /// Project manifest version, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_version: Option<String>,
    /// Run start, producer clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    /// Total run duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Generation wall-clock timestamp. The only nondeterministic field;
    /// stripped by [`RawRun::deterministic_json`].
    pub generated_at_ms: u64,
}

impl RawRun {
    /// Serialize to JSON with the wall-clock timestamp stripped. Two runs
    /// canonicalized from identical inputs compare byte-identical here.
    ///
    /// # Errors
    /// Propagates serialization failure.
    pub fn deterministic_json(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("generated_at_ms");
        }
        serde_json::to_string_pretty(&value)
    }

    /// Total step count across all test cases.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.test_cases
            .iter()
            .filter_map(|tc| tc.story.as_ref())
            .map(StoryMeta::step_count)
            .sum()
    }

    /// Counter-wise sum of all test-case outcomes.
    #[must_use]
    pub fn outcome_totals(&self) -> OutcomeCounts {
        self.test_cases
            .iter()
            .fold(OutcomeCounts::ZERO, |acc, tc| acc.merged(tc.outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StepKeyword, StoryStep};

    fn case(file: &str, title: &str, outcome: OutcomeCounts) -> RawTestCase {
        let identity = ScenarioIdentity::new(file, vec![title.to_owned()]);
        let mut story = StoryMeta::new(title);
        story.source_file = file.to_owned();
        story.steps.push(StoryStep::new(StepKeyword::Given, "a step"));
        RawTestCase {
            scenario_id: identity.scenario_id(),
            identity,
            story: Some(story),
            outcome,
            duration_ms: 5,
            failure_details: None,
        }
    }

    fn run_with(cases: Vec<RawTestCase>) -> RawRun {
        RawRun {
            test_cases: cases,
            project_root: ".".into(),
            coverage: None,
            git_sha: None,
            package_version: None,
            started_at_ms: None,
            duration_ms: None,
            generated_at_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn deterministic_json_strips_only_the_timestamp() {
        let a = run_with(vec![case("a.test.ts", "adds", OutcomeCounts::ZERO)]);
        let mut b = a.clone();
        b.generated_at_ms = 42;
        assert_eq!(
            a.deterministic_json().unwrap(),
            b.deterministic_json().unwrap()
        );
        assert!(!a.deterministic_json().unwrap().contains("generated_at_ms"));
    }

    #[test]
    fn json_round_trip_preserves_counts() {
        let run = run_with(vec![
            case(
                "a.test.ts",
                "adds",
                OutcomeCounts {
                    passed: 1,
                    failed: 0,
                    skipped: 0,
                    todo: 0,
                },
            ),
            case(
                "b.test.ts",
                "fails",
                OutcomeCounts {
                    passed: 0,
                    failed: 2,
                    skipped: 1,
                    todo: 0,
                },
            ),
        ]);
        let json = serde_json::to_string(&run).unwrap();
        let back: RawRun = serde_json::from_str(&json).unwrap();
        assert_eq!(back.test_cases.len(), run.test_cases.len());
        assert_eq!(back.step_count(), run.step_count());
        assert_eq!(back.outcome_totals(), run.outcome_totals());
    }

    #[test]
    fn coverage_metric_rounds_and_handles_zero_total() {
        assert_eq!(CoverageMetric::new(0, 0).pct, 100);
        assert_eq!(CoverageMetric::new(1, 3).pct, 33);
        assert_eq!(CoverageMetric::new(2, 3).pct, 67);
    }

    #[test]
    fn partial_builders_compose() {
        let partial = StoryPartial::outcome_delta(
            OutcomeCounts {
                passed: 0,
                failed: 1,
                skipped: 0,
                todo: 0,
            },
            120,
            1_000,
        )
        .with_failure("expected 2, got 3")
        .with_token("worker-1:case-9:attempt-0");
        assert_eq!(partial.failure_details.as_deref(), Some("expected 2, got 3"));
        assert!(partial.story.is_none());
        assert_eq!(partial.duration_ms, 120);
    }
}
