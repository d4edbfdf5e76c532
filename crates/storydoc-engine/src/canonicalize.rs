//! Canonicalization: reconciled partials joined with host outcomes into
//! one ordered, deduplicated [`RawRun`].
//!
//! The host's outcome list is authoritative for which tests ran; the store
//! is authoritative for narrative. A host outcome with no narrative is
//! omitted (never narrated, nothing to document). A narrative with no host
//! outcome (a crash before the framework could report) is still emitted
//! so documented scenarios are never silently dropped.
//!
//! Counters are deltas wherever observed: outcome data may arrive through
//! the store (adapter-recorded partials) or through the host list, and a
//! deployment routes each observation exactly once. The canonicalizer just
//! adds whatever it is handed.
//!
//! For fixed inputs the output is byte-identical after stripping the
//! generation timestamp, which is what lets renderers be tested against
//! literal fixtures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use storydoc_store::MergedRecord;
use storydoc_types::{HostOutcome, OutcomeCounts, RawRun, RawTestCase, ScenarioIdentity};

/// Canonical test-case ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalOrder {
    /// Declaration order: file path, then `source_order` within the file.
    #[default]
    Source,
    /// Title sort, case-sensitive, ties broken by declaration order.
    Alpha,
}

/// Inputs besides the records themselves.
#[derive(Debug, Clone, Default)]
pub struct CanonicalizeOptions {
    /// Test-case ordering.
    pub order: CanonicalOrder,
    /// Project root carried into the run.
    pub project_root: String,
    /// Git SHA, when captured.
    pub git_sha: Option<String>,
    /// Manifest version, when captured.
    pub package_version: Option<String>,
    /// Coverage summary, when captured.
    pub coverage: Option<storydoc_types::CoverageSummary>,
    /// Run start, producer clock.
    pub started_at_ms: Option<u64>,
    /// Total run duration.
    pub duration_ms: Option<u64>,
    /// Generation timestamp stamped onto the run.
    pub generated_at_ms: u64,
}

/// Build the canonical run from drained records and host outcomes.
#[must_use]
pub fn canonicalize(
    drained: Vec<(ScenarioIdentity, MergedRecord)>,
    host_outcomes: &[HostOutcome],
    options: &CanonicalizeOptions,
) -> RawRun {
    let mut records: BTreeMap<ScenarioIdentity, MergedRecord> = drained.into_iter().collect();

    // Aggregate host outcomes per identity: counters add, durations add,
    // the first non-empty failure text in list order sticks.
    let mut host: BTreeMap<ScenarioIdentity, (OutcomeCounts, u64, Option<String>)> =
        BTreeMap::new();
    for outcome in host_outcomes {
        let entry = host
            .entry(outcome.identity.clone())
            .or_insert((OutcomeCounts::ZERO, 0, None));
        entry.0 = entry.0.merged(outcome.status.as_counts());
        entry.1 = entry.1.saturating_add(outcome.duration_ms);
        if entry.2.is_none() {
            if let Some(text) = outcome.failure_text.as_deref() {
                if !text.is_empty() {
                    entry.2 = Some(text.to_owned());
                }
            }
        }
    }

    let mut cases: Vec<RawTestCase> = Vec::new();

    for (identity, (host_counts, host_duration, host_failure)) in &host {
        let Some(record) = records.remove(identity) else {
            // Host ran it, nobody narrated it: nothing to document.
            tracing::debug!(identity = %identity, "outcome without narrative; omitted");
            continue;
        };
        if record.story.is_none() {
            tracing::debug!(identity = %identity, "record without story; omitted");
            continue;
        }
        // Store-recorded failure text was observed earlier than the
        // run-end host list; it wins when both exist.
        let failure_details = record.failure_details.or_else(|| host_failure.clone());
        cases.push(RawTestCase {
            scenario_id: identity.scenario_id(),
            identity: identity.clone(),
            story: record.story,
            outcome: record.outcome.merged(*host_counts),
            duration_ms: record.duration_ms.saturating_add(*host_duration),
            failure_details,
        });
    }

    // Narrated but never reported by the host (e.g. a crash before the
    // framework produced a status): emitted, not silently dropped.
    for (identity, record) in records {
        if record.story.is_none() {
            continue;
        }
        cases.push(RawTestCase {
            scenario_id: identity.scenario_id(),
            identity,
            story: record.story,
            outcome: record.outcome,
            duration_ms: record.duration_ms,
            failure_details: record.failure_details,
        });
    }

    sort_cases(&mut cases, options.order);

    RawRun {
        test_cases: cases,
        project_root: options.project_root.clone(),
        coverage: options.coverage,
        git_sha: options.git_sha.clone(),
        package_version: options.package_version.clone(),
        started_at_ms: options.started_at_ms,
        duration_ms: options.duration_ms,
        generated_at_ms: options.generated_at_ms,
    }
}

fn sort_cases(cases: &mut [RawTestCase], order: CanonicalOrder) {
    // Declaration order first; `source_order` is unique only within one
    // source module, so file path is the primary key.
    let declaration_key = |case: &RawTestCase| {
        (
            case.identity.source_file.clone(),
            case.story.as_ref().map_or(0, |s| s.source_order),
            case.identity.title_path.clone(),
        )
    };
    match order {
        CanonicalOrder::Source => {
            cases.sort_by(|a, b| declaration_key(a).cmp(&declaration_key(b)));
        }
        CanonicalOrder::Alpha => {
            cases.sort_by(|a, b| {
                let title_a = a.story.as_ref().map_or("", |s| s.scenario.as_str());
                let title_b = b.story.as_ref().map_or("", |s| s.scenario.as_str());
                title_a
                    .cmp(title_b)
                    .then_with(|| declaration_key(a).cmp(&declaration_key(b)))
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storydoc_store::merge_partials;
    use storydoc_types::{HostStatus, StepKeyword, StoryMeta, StoryPartial, StoryStep};

    fn ident(file: &str, title: &str) -> ScenarioIdentity {
        ScenarioIdentity::new(file, vec![title.to_owned()])
    }

    fn narrated(file: &str, title: &str, order: u64) -> (ScenarioIdentity, MergedRecord) {
        let mut story = StoryMeta::new(title);
        story.source_file = file.to_owned();
        story.source_order = order;
        story.steps.push(StoryStep::new(StepKeyword::Given, "a step"));
        (
            ident(file, title),
            merge_partials(&[StoryPartial::narrative(story, 0)]),
        )
    }

    fn outcome(file: &str, title: &str, status: HostStatus) -> HostOutcome {
        HostOutcome {
            identity: ident(file, title),
            status,
            duration_ms: 10,
            failure_text: None,
        }
    }

    fn options() -> CanonicalizeOptions {
        CanonicalizeOptions {
            project_root: ".".into(),
            generated_at_ms: 1_700_000_000_000,
            ..CanonicalizeOptions::default()
        }
    }

    #[test]
    fn outcome_without_narrative_is_omitted() {
        let run = canonicalize(
            vec![narrated("a.test.ts", "told", 0)],
            &[
                outcome("a.test.ts", "told", HostStatus::Passed),
                outcome("a.test.ts", "untold", HostStatus::Passed),
            ],
            &options(),
        );
        assert_eq!(run.test_cases.len(), 1);
        assert_eq!(run.test_cases[0].identity.title(), "told");
    }

    #[test]
    fn narrative_without_outcome_is_emitted_with_zero_counts() {
        let run = canonicalize(vec![narrated("a.test.ts", "crashed", 0)], &[], &options());
        assert_eq!(run.test_cases.len(), 1);
        let case = &run.test_cases[0];
        assert!(case.outcome.is_zero());
        assert!(case.failure_details.is_none());
    }

    #[test]
    fn host_outcomes_aggregate_per_identity() {
        // A retry: one fail, one pass, both from the host.
        let run = canonicalize(
            vec![narrated("a.test.ts", "flaky", 0)],
            &[
                outcome("a.test.ts", "flaky", HostStatus::Failed),
                outcome("a.test.ts", "flaky", HostStatus::Passed),
            ],
            &options(),
        );
        let case = &run.test_cases[0];
        assert_eq!(case.outcome.passed, 1);
        assert_eq!(case.outcome.failed, 1);
        assert_eq!(case.duration_ms, 20);
    }

    #[test]
    fn store_failure_text_wins_over_host_text() {
        let (identity, record) = {
            let mut story = StoryMeta::new("breaks");
            story.source_file = "a.test.ts".into();
            story.steps.push(StoryStep::new(StepKeyword::Given, "a step"));
            let narrative = StoryPartial::narrative(story, 5);
            let failing = StoryPartial::outcome_delta(HostStatus::Failed.as_counts(), 3, 10)
                .with_failure("from store");
            (ident("a.test.ts", "breaks"), merge_partials(&[narrative, failing]))
        };
        let mut host = outcome("a.test.ts", "breaks", HostStatus::Failed);
        host.failure_text = Some("from host".into());

        let run = canonicalize(vec![(identity, record)], &[host], &options());
        assert_eq!(
            run.test_cases[0].failure_details.as_deref(),
            Some("from store")
        );
    }

    #[test]
    fn host_failure_text_fills_the_gap() {
        let mut host = outcome("a.test.ts", "breaks", HostStatus::Failed);
        host.failure_text = Some("assertion failed".into());
        let run = canonicalize(vec![narrated("a.test.ts", "breaks", 0)], &[host], &options());
        assert_eq!(
            run.test_cases[0].failure_details.as_deref(),
            Some("assertion failed")
        );
    }

    #[test]
    fn source_order_sorts_within_file_and_path_across_files() {
        let run = canonicalize(
            vec![
                narrated("b.test.ts", "early", 0),
                narrated("a.test.ts", "late", 1),
                narrated("a.test.ts", "soon", 0),
            ],
            &[],
            &options(),
        );
        let titles: Vec<&str> = run
            .test_cases
            .iter()
            .map(|c| c.identity.title())
            .collect();
        assert_eq!(titles, vec!["soon", "late", "early"]);
    }

    #[test]
    fn alpha_order_sorts_by_title_case_sensitively() {
        let mut opts = options();
        opts.order = CanonicalOrder::Alpha;
        let run = canonicalize(
            vec![
                narrated("a.test.ts", "beta", 0),
                narrated("a.test.ts", "Alpha", 1),
                narrated("a.test.ts", "alpha", 2),
            ],
            &[],
            &opts,
        );
        let titles: Vec<&str> = run
            .test_cases
            .iter()
            .map(|c| c.identity.title())
            .collect();
        // Uppercase sorts before lowercase in a case-sensitive sort.
        assert_eq!(titles, vec!["Alpha", "alpha", "beta"]);
    }

    #[test]
    fn canonicalization_is_deterministic() {
        let build = || {
            canonicalize(
                vec![
                    narrated("b.test.ts", "two", 0),
                    narrated("a.test.ts", "one", 0),
                ],
                &[
                    outcome("a.test.ts", "one", HostStatus::Passed),
                    outcome("b.test.ts", "two", HostStatus::Failed),
                ],
                &options(),
            )
        };
        let mut second = build();
        second.generated_at_ms = 99; // different wall clock
        assert_eq!(
            build().deterministic_json().unwrap(),
            second.deterministic_json().unwrap()
        );
    }

    #[test]
    fn permuted_inputs_produce_identical_runs() {
        let drained = vec![
            narrated("a.test.ts", "one", 0),
            narrated("b.test.ts", "two", 0),
        ];
        let mut reversed = drained.clone();
        reversed.reverse();
        let outcomes = [
            outcome("a.test.ts", "one", HostStatus::Passed),
            outcome("b.test.ts", "two", HostStatus::Passed),
        ];
        let mut flipped = outcomes.clone();
        flipped.reverse();

        let a = canonicalize(drained, &outcomes, &options());
        let b = canonicalize(reversed, &flipped, &options());
        assert_eq!(
            a.deterministic_json().unwrap(),
            b.deterministic_json().unwrap()
        );
    }
}
