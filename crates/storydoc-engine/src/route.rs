//! Output routing: ordered glob rules, first match wins.
//!
//! Rule-set presence changes the fallback. With zero configured rules
//! every case lands in the default aggregated destination; with one or
//! more rules an unmatched case is dropped silently. Both behaviors are
//! relied on downstream and must not be "fixed" into each other.

use std::collections::BTreeMap;

use globset::{Glob, GlobMatcher};
use storydoc_types::RawTestCase;

use crate::config::{OutputMode, OutputRule};

/// Known test-file suffixes stripped when deriving colocated file names.
/// The longest matching suffix wins.
pub const TEST_FILE_SUFFIXES: &[&str] = &[
    ".test.ts", ".test.tsx", ".spec.ts", ".spec.tsx", ".test.js", ".spec.js", ".test.mjs",
    ".spec.mjs",
];

/// Default colocated extension.
const DEFAULT_COLOCATED_EXTENSION: &str = ".docs.md";

struct CompiledRule<'a> {
    rule: &'a OutputRule,
    matchers: Vec<GlobMatcher>,
}

impl CompiledRule<'_> {
    fn matches(&self, source_file: &str) -> bool {
        self.matchers.iter().any(|m| m.is_match(source_file))
    }
}

/// Compile rule globs. A malformed pattern makes that pattern never match;
/// it never aborts routing.
fn compile_rules(rules: &[OutputRule]) -> Vec<CompiledRule<'_>> {
    rules
        .iter()
        .map(|rule| {
            let matchers = rule
                .include
                .iter()
                .filter_map(|pattern| match Glob::new(pattern) {
                    Ok(glob) => Some(glob.compile_matcher()),
                    Err(error) => {
                        tracing::warn!(pattern = %pattern, %error, "invalid glob; rule pattern ignored");
                        None
                    }
                })
                .collect();
            CompiledRule { rule, matchers }
        })
        .collect()
}

/// Colocated destination for a source file: the longest matching suffix
/// from [`TEST_FILE_SUFFIXES`] is stripped, then `extension` appended.
#[must_use]
pub fn colocated_destination(source_file: &str, extension: Option<&str>) -> String {
    let extension = extension.unwrap_or(DEFAULT_COLOCATED_EXTENSION);
    let stripped = TEST_FILE_SUFFIXES
        .iter()
        .filter(|suffix| source_file.ends_with(**suffix))
        .max_by_key(|suffix| suffix.len())
        .map_or(source_file, |suffix| {
            &source_file[..source_file.len() - suffix.len()]
        });
    format!("{stripped}{extension}")
}

/// Route test cases to output destinations.
///
/// Rules are evaluated in declaration order per source file; the first
/// rule with a matching glob wins. The returned map preserves each
/// destination's cases in input order. When nothing routed anywhere and
/// `include_empty` is set, the default destination is still present with
/// zero scenarios so downstream tooling can rely on the file existing.
#[must_use]
pub fn route(
    rules: &[OutputRule],
    cases: Vec<RawTestCase>,
    default_file: &str,
    include_empty: bool,
) -> BTreeMap<String, Vec<RawTestCase>> {
    let compiled = compile_rules(rules);
    let mut output: BTreeMap<String, Vec<RawTestCase>> = BTreeMap::new();

    for case in cases {
        let source_file = case.identity.source_file.clone();
        let matched = compiled.iter().find(|rule| rule.matches(&source_file));

        let destination = match matched {
            Some(compiled_rule) => match compiled_rule.rule.mode {
                OutputMode::Colocated => colocated_destination(
                    &source_file,
                    compiled_rule.rule.extension.as_deref(),
                ),
                OutputMode::Aggregated => compiled_rule
                    .rule
                    .output_file
                    .clone()
                    .unwrap_or_else(|| default_file.to_owned()),
            },
            None if rules.is_empty() => default_file.to_owned(),
            None => {
                // Rules were configured and none matched: dropped.
                tracing::debug!(source_file = %source_file, "no output rule matched; case dropped");
                continue;
            }
        };

        output.entry(destination).or_default().push(case);
    }

    if output.is_empty() && include_empty {
        output.insert(default_file.to_owned(), Vec::new());
    }

    output
}
