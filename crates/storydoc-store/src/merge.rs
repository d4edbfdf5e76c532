//! The reconciling merge: commutative and idempotent for counters,
//! append-only for doc lists.

use std::collections::BTreeSet;

use storydoc_types::{OutcomeCounts, StoryMeta, StoryPartial};

/// Fully merged record for one scenario identity.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    /// Merged narrative, when any partial carried one.
    pub story: Option<StoryMeta>,
    /// Counter-wise sum across all deduplicated partials.
    pub outcome: OutcomeCounts,
    /// Summed duration.
    pub duration_ms: u64,
    /// Non-empty failure text with the smallest `recorded_at_ms`. Sticky:
    /// merging a later success never clears it.
    pub failure_details: Option<String>,
}

/// Merge all partials recorded for one identity, in drain order.
///
/// Rules:
/// - Partials with a `write_token` already seen in this merge are dropped
///   (at-least-once delivery replays physical writes).
/// - Counters and durations add.
/// - The base narrative is the first partial whose story has steps, falling
///   back to the first story at all. Every other story contributes its doc
///   entries: scenario docs append to scenario docs, step docs append by
///   step index. Docs for a step index the base never saw are dropped;
///   both partials are assumed to have seen the same step sequence, a
///   documented constraint rather than something auto-detected.
/// - Among non-empty failure texts the earliest `recorded_at_ms` wins;
///   ties keep the first in drain order.
#[must_use]
pub fn merge_partials(partials: &[StoryPartial]) -> MergedRecord {
    let mut seen_tokens: BTreeSet<&str> = BTreeSet::new();
    let mut live: Vec<&StoryPartial> = Vec::with_capacity(partials.len());
    for partial in partials {
        if let Some(token) = partial.write_token.as_deref() {
            if !seen_tokens.insert(token) {
                tracing::debug!(token, "dropping replayed partial");
                continue;
            }
        }
        live.push(partial);
    }

    let base_idx = live
        .iter()
        .position(|p| p.story.as_ref().is_some_and(|s| !s.steps.is_empty()))
        .or_else(|| live.iter().position(|p| p.story.is_some()));

    let mut story = base_idx.and_then(|i| live[i].story.clone());
    if let Some(base) = story.as_mut() {
        for (idx, partial) in live.iter().enumerate() {
            if Some(idx) == base_idx {
                continue;
            }
            let Some(other) = partial.story.as_ref() else {
                continue;
            };
            base.docs.extend(other.docs.iter().cloned());
            for (step_idx, other_step) in other.steps.iter().enumerate() {
                match base.steps.get_mut(step_idx) {
                    Some(step) => step.docs.extend(other_step.docs.iter().cloned()),
                    None => {
                        tracing::debug!(
                            scenario = base.scenario.as_str(),
                            step_idx,
                            "dropping docs for unknown step index"
                        );
                    }
                }
            }
        }
    }

    let mut outcome = OutcomeCounts::ZERO;
    let mut duration_ms = 0_u64;
    let mut failure: Option<(&str, u64)> = None;
    for partial in &live {
        outcome = outcome.merged(partial.outcome);
        duration_ms = duration_ms.saturating_add(partial.duration_ms);
        if let Some(text) = partial.failure_details.as_deref() {
            if !text.is_empty() {
                let earlier = match failure {
                    None => true,
                    Some((_, at)) => partial.recorded_at_ms < at,
                };
                if earlier {
                    failure = Some((text, partial.recorded_at_ms));
                }
            }
        }
    }

    MergedRecord {
        story,
        outcome,
        duration_ms,
        failure_details: failure.map(|(text, _)| text.to_owned()),
    }
}
