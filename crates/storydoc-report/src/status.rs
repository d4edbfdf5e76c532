//! Status icon derivation shared by every renderer.

use storydoc_types::OutcomeCounts;

/// Five-way scenario status, derived from the aggregated counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    /// At least one failure.
    Fail,
    /// Every step passed (or a doc-only scenario with an observed pass).
    Pass,
    /// Every step is a todo.
    Todo,
    /// Every step was skipped.
    Skip,
    /// Anything else.
    Mixed,
}

impl StatusIcon {
    /// The rendered icon, with a trailing space for heading composition.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Fail => "\u{274c} ",
            Self::Pass => "\u{2705} ",
            Self::Todo => "\u{1f4dd} ",
            Self::Skip => "\u{23e9} ",
            Self::Mixed => "\u{26a0}\u{fe0f} ",
        }
    }

    /// Status word used by machine formats.
    #[must_use]
    pub const fn word(self) -> &'static str {
        match self {
            Self::Fail => "failed",
            Self::Pass => "passed",
            Self::Todo => "pending",
            Self::Skip => "skipped",
            Self::Mixed => "mixed",
        }
    }
}

/// Derive the scenario status from counters and the step count.
///
/// Precedence, in order:
/// 1. any failure ⇒ [`StatusIcon::Fail`]
/// 2. passes equal to the step count ⇒ [`StatusIcon::Pass`]; a doc-only
///    scenario (zero steps) counts as full pass on any observed pass
/// 3. todos equal to the step count ⇒ [`StatusIcon::Todo`]
/// 4. skips equal to the step count ⇒ [`StatusIcon::Skip`]; doc-only with
///    skips and no pass also lands here
/// 5. doc-only with nothing observed at all ⇒ [`StatusIcon::Pass`]
/// 6. otherwise ⇒ [`StatusIcon::Mixed`]
#[must_use]
pub fn derive_status(outcome: OutcomeCounts, step_count: usize) -> StatusIcon {
    let total = u32::try_from(step_count).unwrap_or(u32::MAX);
    let doc_only = step_count == 0;

    let full_pass = if doc_only {
        outcome.passed > 0
    } else {
        outcome.passed == total
    };
    let all_skipped = if doc_only {
        outcome.skipped > 0 && outcome.passed == 0
    } else {
        outcome.skipped == total
    };

    if outcome.failed > 0 {
        StatusIcon::Fail
    } else if full_pass {
        StatusIcon::Pass
    } else if !doc_only && outcome.todo == total {
        StatusIcon::Todo
    } else if all_skipped {
        StatusIcon::Skip
    } else if doc_only && outcome.is_zero() {
        // Doc-only with no explicit result: assume passed.
        StatusIcon::Pass
    } else {
        StatusIcon::Mixed
    }
}
