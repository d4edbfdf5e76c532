//! The story model: one scenario's narrative as recorded by test code.
//!
//! Steps are append-only within a scenario and render in insertion order.
//! Doc entries attach either to the scenario (added before the first step)
//! or to the current step (added after one exists); that positional rule
//! is enforced by the runtime recorder, not here.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Step keyword and mode ──────────────────────────────────────────────

/// BDD keyword attached to a step. Purely presentational; no ordering is
/// enforced between keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StepKeyword {
    /// Precondition.
    Given,
    /// Action.
    When,
    /// Assertion.
    Then,
    /// Continuation of the previous keyword.
    And,
    /// Negated continuation.
    But,
}

impl StepKeyword {
    /// The rendered keyword text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
        }
    }
}

impl fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Execution mode recorded for a step, used by renderers to annotate the
/// step line (skipped, todo, ...). The engine never acts on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// Ordinary executed step.
    #[default]
    Normal,
    /// Step was declared but not executed.
    Skip,
    /// Step body is not written yet.
    Todo,
    /// Step is expected to fail.
    Fail,
    /// Step is known to be slow.
    Slow,
}

impl StepMode {
    /// Short lowercase label (`"skip"`, `"todo"`, ...).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Skip => "skip",
            Self::Todo => "todo",
            Self::Fail => "fail",
            Self::Slow => "slow",
        }
    }
}

// ─── Doc entries ────────────────────────────────────────────────────────

/// When a doc entry was captured.
///
/// `Static` entries are captured once at registration time and are the same
/// for every run; `Runtime` entries are captured during execution and may
/// vary by run or retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocPhase {
    /// Captured at registration time.
    Static,
    /// Captured during step execution.
    Runtime,
}

/// One piece of inline documentation attached to a scenario or step.
///
/// A closed tagged union: renderers have a fixed template per kind, and the
/// `Custom` kind is the single open extension point (resolved through a
/// renderer registry with a guaranteed JSON fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocEntry {
    /// Free-text note.
    Note {
        text: String,
        phase: DocPhase,
    },
    /// Labelled key/value pair.
    Kv {
        label: String,
        value: serde_json::Value,
        phase: DocPhase,
    },
    /// Labelled code block with optional language tag.
    Code {
        label: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        phase: DocPhase,
    },
    /// Labelled table with column headers and string rows.
    Table {
        label: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        phase: DocPhase,
    },
    /// Hyperlink.
    Link {
        label: String,
        url: String,
        phase: DocPhase,
    },
    /// Titled section of arbitrary markdown.
    Section {
        title: String,
        markdown: String,
        phase: DocPhase,
    },
    /// Mermaid diagram with optional title.
    Mermaid {
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        phase: DocPhase,
    },
    /// Screenshot image reference.
    Screenshot {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
        phase: DocPhase,
    },
    /// Tag names. Each `tag(...)` call produces one entry; entries with the
    /// same names are never merged.
    Tag {
        names: Vec<String>,
        phase: DocPhase,
    },
    /// Open extension point, rendered through the custom-renderer registry.
    Custom {
        #[serde(rename = "type")]
        type_name: String,
        data: serde_json::Value,
        phase: DocPhase,
    },
}

impl DocEntry {
    /// The capture phase of this entry, whatever its kind.
    #[must_use]
    pub const fn phase(&self) -> DocPhase {
        match self {
            Self::Note { phase, .. }
            | Self::Kv { phase, .. }
            | Self::Code { phase, .. }
            | Self::Table { phase, .. }
            | Self::Link { phase, .. }
            | Self::Section { phase, .. }
            | Self::Mermaid { phase, .. }
            | Self::Screenshot { phase, .. }
            | Self::Tag { phase, .. }
            | Self::Custom { phase, .. } => *phase,
        }
    }

    /// Kind discriminant as a lowercase string (`"note"`, `"kv"`, ...).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Note { .. } => "note",
            Self::Kv { .. } => "kv",
            Self::Code { .. } => "code",
            Self::Table { .. } => "table",
            Self::Link { .. } => "link",
            Self::Section { .. } => "section",
            Self::Mermaid { .. } => "mermaid",
            Self::Screenshot { .. } => "screenshot",
            Self::Tag { .. } => "tag",
            Self::Custom { .. } => "custom",
        }
    }
}

// ─── Steps and scenarios ────────────────────────────────────────────────

/// One narrative step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryStep {
    /// BDD keyword.
    pub keyword: StepKeyword,
    /// Step description. May be empty; rendered verbatim, never trimmed.
    pub text: String,
    /// Execution mode for rendering annotations.
    #[serde(default)]
    pub mode: StepMode,
    /// Doc entries attached at step scope, in attachment order.
    #[serde(default)]
    pub docs: Vec<DocEntry>,
    /// Measured duration, present only when the step body was wrapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Whether the step body was measured by a timing wrapper rather than
    /// being a bare marker.
    #[serde(default)]
    pub wrapped: bool,
}

impl StoryStep {
    /// A bare step with the given keyword and text.
    #[must_use]
    pub fn new(keyword: StepKeyword, text: impl Into<String>) -> Self {
        Self {
            keyword,
            text: text.into(),
            mode: StepMode::Normal,
            docs: Vec::new(),
            duration_ms: None,
            wrapped: false,
        }
    }
}

/// One scenario's narrative: the canonical in-memory story model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryMeta {
    /// Scenario title.
    pub scenario: String,
    /// Ordered steps.
    #[serde(default)]
    pub steps: Vec<StoryStep>,
    /// Doc entries added before the first step (scenario scope).
    #[serde(default)]
    pub docs: Vec<DocEntry>,
    /// Tags, order preserved as declared, duplicates dropped.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ticket references, ordered.
    #[serde(default)]
    pub tickets: Vec<String>,
    /// Free-form user metadata.
    #[serde(default)]
    pub meta: BTreeMap<String, serde_json::Value>,
    /// Enclosing group names, outermost first.
    #[serde(default)]
    pub suite_path: Vec<String>,
    /// Registration-order index within one source module. Tie-break only;
    /// never a cross-file ordering guarantee.
    #[serde(default)]
    pub source_order: u64,
    /// Source file path relative to the project root.
    #[serde(default)]
    pub source_file: String,
}

impl StoryMeta {
    /// An empty story with just a title.
    #[must_use]
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            steps: Vec::new(),
            docs: Vec::new(),
            tags: Vec::new(),
            tickets: Vec::new(),
            meta: BTreeMap::new(),
            suite_path: Vec::new(),
            source_order: 0,
            source_file: String::new(),
        }
    }

    /// Total number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// A doc-only story has narrative docs but no steps at all.
    #[must_use]
    pub fn is_doc_only(&self) -> bool {
        self.steps.is_empty()
    }
}
