//! Scenario filters, applied after canonicalization and before routing.

use globset::{Glob, GlobSet, GlobSetBuilder};
use storydoc_types::RawTestCase;

use crate::config::ScenarioFilter;

/// Build a glob set, dropping malformed patterns with a warning. Returns
/// `None` when no usable pattern remains.
fn build_glob_set(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    let mut usable = 0;
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
                usable += 1;
            }
            Err(error) => {
                tracing::warn!(pattern = %pattern, %error, "invalid filter glob ignored");
            }
        }
    }
    if usable == 0 {
        return None;
    }
    match builder.build() {
        Ok(set) => Some(set),
        Err(error) => {
            tracing::warn!(%error, "filter glob set failed to build; filter ignored");
            None
        }
    }
}

/// Apply tag and file filters, preserving input order.
#[must_use]
pub fn apply_filters(cases: Vec<RawTestCase>, filter: &ScenarioFilter) -> Vec<RawTestCase> {
    if filter.is_empty() {
        return cases;
    }

    let include_files = build_glob_set(&filter.include_files);
    let exclude_files = build_glob_set(&filter.exclude_files);

    cases
        .into_iter()
        .filter(|case| {
            let tags: &[String] = case.story.as_ref().map_or(&[], |s| &s.tags);
            if !filter.include_tags.is_empty()
                && !tags.iter().any(|t| filter.include_tags.contains(t))
            {
                return false;
            }
            if !filter.exclude_tags.is_empty()
                && tags.iter().any(|t| filter.exclude_tags.contains(t))
            {
                return false;
            }
            let file = case.identity.source_file.as_str();
            if let Some(include) = include_files.as_ref() {
                if !include.is_match(file) {
                    return false;
                }
            }
            if let Some(exclude) = exclude_files.as_ref() {
                if exclude.is_match(file) {
                    return false;
                }
            }
            true
        })
        .collect()
}
