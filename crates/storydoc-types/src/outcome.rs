//! Outcome counters and the host framework's authoritative result list.

use serde::{Deserialize, Serialize};

use crate::ScenarioIdentity;

// ─── Aggregated counters ────────────────────────────────────────────────

/// Aggregated outcome counters for one scenario.
///
/// Merge is pure addition, so it is commutative and idempotent under the
/// reconciler's per-write dedup: replaying a physical event never
/// double-counts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OutcomeCounts {
    /// Observations that passed.
    pub passed: u32,
    /// Observations that failed.
    pub failed: u32,
    /// Observations skipped (or pending at run end).
    pub skipped: u32,
    /// Observations marked todo.
    pub todo: u32,
}

impl OutcomeCounts {
    /// All-zero counters: a narrated scenario with no observed result.
    pub const ZERO: Self = Self {
        passed: 0,
        failed: 0,
        skipped: 0,
        todo: 0,
    };

    /// Counter-wise sum.
    #[must_use]
    pub fn merged(self, other: Self) -> Self {
        Self {
            passed: self.passed.saturating_add(other.passed),
            failed: self.failed.saturating_add(other.failed),
            skipped: self.skipped.saturating_add(other.skipped),
            todo: self.todo.saturating_add(other.todo),
        }
    }

    /// Total observations across all four states.
    #[must_use]
    pub fn total(self) -> u32 {
        self.passed + self.failed + self.skipped + self.todo
    }

    /// True when no result was ever observed.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

// ─── Host outcomes ──────────────────────────────────────────────────────

/// Per-test status as reported by the host framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    /// Test passed.
    Passed,
    /// Test failed.
    Failed,
    /// Test was skipped.
    Skipped,
    /// Test is declared but unimplemented.
    Todo,
    /// Test never ran and never resolved. Counted as skipped.
    Pending,
}

impl HostStatus {
    /// The counter delta this status contributes to a scenario.
    #[must_use]
    pub const fn as_counts(self) -> OutcomeCounts {
        let (passed, failed, skipped, todo) = match self {
            Self::Passed => (1, 0, 0, 0),
            Self::Failed => (0, 1, 0, 0),
            Self::Skipped | Self::Pending => (0, 0, 1, 0),
            Self::Todo => (0, 0, 0, 1),
        };
        OutcomeCounts {
            passed,
            failed,
            skipped,
            todo,
        }
    }
}

/// One entry of the host framework's authoritative result list, delivered
/// at run end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostOutcome {
    /// The scenario this result belongs to.
    pub identity: ScenarioIdentity,
    /// Final status.
    pub status: HostStatus,
    /// Wall-clock duration of this observation.
    #[serde(default)]
    pub duration_ms: u64,
    /// Failure text, when the host captured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_text: Option<String>,
}

/// How the host run ended. An interrupted run produces no report at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunCompletion {
    /// Run finished normally; reports are generated.
    Completed,
    /// Run was aborted; report generation is skipped entirely.
    Interrupted,
}
