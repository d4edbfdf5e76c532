//! Canonical data model for the storydoc engine.
//!
//! Pure data, no behavior beyond constructors, accessors, and the merge-key
//! helpers. Everything here serializes with serde; all maps are `BTreeMap`
//! so serialized output is byte-stable for a fixed input.
//!
//! The model has two halves:
//!
//! - The **story model** ([`StoryMeta`], [`StoryStep`], [`DocEntry`]): one
//!   scenario's narrative as recorded by the runtime recorder.
//! - The **run model** ([`StoryPartial`], [`HostOutcome`], [`RawTestCase`],
//!   [`RawRun`]): the wire records producers emit, the authoritative host
//!   outcomes, and the canonical merged run the report generators consume.

pub mod identity;
pub mod outcome;
pub mod run;
pub mod story;

pub use identity::ScenarioIdentity;
pub use outcome::{HostOutcome, HostStatus, OutcomeCounts, RunCompletion};
pub use run::{CoverageMetric, CoverageSummary, RawRun, RawTestCase, StoryPartial};
pub use story::{DocEntry, DocPhase, StepKeyword, StepMode, StoryMeta, StoryStep};
