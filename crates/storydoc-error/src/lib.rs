//! Error types for the storydoc workspace.
//!
//! One enum for the whole engine, grouped by the error taxonomy the engine
//! observes: producer errors fail loudly at the call site, everything else
//! is contained to logging and best-effort continuation so a reporting bug
//! never turns into a test-suite failure.

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for storydoc operations.
#[derive(Error, Debug)]
pub enum StorydocError {
    // === Producer errors (fail loudly, surface to the test) ===
    /// A narrative method was called before any scenario registered.
    #[error("no active scenario: narrative calls require a registered scenario")]
    NoActiveScenario,

    /// A runtime doc method was called outside step execution.
    #[error("runtime docs require an executing step: '{call}'")]
    RuntimeDocOutsideStep { call: String },

    /// A scenario was registered with an empty title.
    #[error("scenario title must not be empty")]
    EmptyScenarioTitle,

    // === Reconciliation errors (logged and skipped, never fatal) ===
    /// A partial record could not be parsed.
    #[error("unreadable partial record '{path}': {detail}")]
    CorruptPartial { path: PathBuf, detail: String },

    // === Routing errors ===
    /// A glob pattern in an output rule failed to compile. The rule is
    /// treated as never matching; this variant only surfaces through logs.
    #[error("invalid glob pattern '{pattern}': {detail}")]
    InvalidGlob { pattern: String, detail: String },

    // === Rendering errors ===
    /// A custom doc-entry renderer failed. The entry falls back to the
    /// default JSON-block rendering.
    #[error("custom renderer for '{type_name}' failed: {detail}")]
    CustomRenderer { type_name: String, detail: String },

    /// A requested output format is unknown.
    #[error("unknown report format: '{name}'")]
    UnknownFormat { name: String },

    // === I/O and serialization ===
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An output destination path has no parent directory to create.
    #[error("invalid output destination: '{path}'")]
    InvalidDestination { path: PathBuf },
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, StorydocError>;
