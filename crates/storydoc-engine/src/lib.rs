//! The aggregation and report-synthesis engine.
//!
//! Everything between the metadata store and the filesystem lives here:
//!
//! - [`canonicalize`]: reconcile drained partials with the host's
//!   authoritative outcomes into one ordered, identity-stable [`RawRun`].
//! - [`route`]: first-match-wins glob rules deciding where each source
//!   file's scenarios are written.
//! - [`filter`]: tag and file filters applied before routing.
//! - [`meta`]: run metadata capture (git SHA, manifest version, coverage).
//! - [`pipeline`]: the single end-of-run driver (drain, canonicalize,
//!   filter, route, render, write).
//!
//! Report generation runs once, single-threaded, after all producers have
//! flushed; an interrupted run produces no report at all.
//!
//! [`RawRun`]: storydoc_types::RawRun

pub mod canonicalize;
pub mod config;
pub mod filter;
pub mod meta;
pub mod pipeline;
pub mod route;

pub use canonicalize::{canonicalize, CanonicalOrder, CanonicalizeOptions};
pub use config::{
    CoverageOptions, JsonOutputOptions, OutputConfig, OutputMode, OutputRule, ReportConfig,
    ReportFormat, ScenarioFilter, DEFAULT_AGGREGATED_FILE,
};
pub use filter::apply_filters;
pub use pipeline::{GeneratedReport, ReportEngine, RunTiming};
pub use route::{colocated_destination, route, TEST_FILE_SUFFIXES};
