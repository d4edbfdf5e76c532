//! Run metadata capture: git SHA, manifest version, coverage summary.
//!
//! All best-effort. Every reader here returns `Option` and never fails the
//! pipeline; missing metadata just leaves its report row out.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use storydoc_types::{CoverageMetric, CoverageSummary};

/// Resolve the git SHA: CI environment first, then `.git/HEAD` (following
/// symbolic refs through loose and packed refs), walking up from `root`.
#[must_use]
pub fn read_git_sha(root: &Path) -> Option<String> {
    for var in ["GITHUB_SHA", "GIT_COMMIT"] {
        if let Ok(sha) = std::env::var(var) {
            if !sha.is_empty() {
                return Some(sha);
            }
        }
    }

    let git_dir = find_git_dir(root)?;
    let head = fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let head = head.trim();

    let Some(ref_path) = head.strip_prefix("ref:") else {
        // Detached HEAD holds the SHA directly.
        return Some(head.to_owned());
    };
    let ref_path = ref_path.trim();

    let loose = git_dir.join(ref_path);
    if let Ok(sha) = fs::read_to_string(&loose) {
        return Some(sha.trim().to_owned());
    }

    let packed = fs::read_to_string(git_dir.join("packed-refs")).ok()?;
    for line in packed.lines() {
        if line.is_empty() || line.starts_with('#') || line.starts_with('^') {
            continue;
        }
        if let Some((sha, name)) = line.split_once(' ') {
            if name == ref_path {
                return Some(sha.to_owned());
            }
        }
    }
    None
}

fn find_git_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(".git");
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[derive(Deserialize)]
struct PackageJson {
    version: Option<String>,
}

#[derive(Deserialize)]
struct CargoManifest {
    package: Option<CargoPackage>,
}

#[derive(Deserialize)]
struct CargoPackage {
    version: Option<toml::Value>,
}

/// Project manifest version: `package.json` first, `Cargo.toml` second.
#[must_use]
pub fn read_package_version(root: &Path) -> Option<String> {
    if let Ok(raw) = fs::read_to_string(root.join("package.json")) {
        if let Ok(parsed) = serde_json::from_str::<PackageJson>(&raw) {
            if let Some(version) = parsed.version {
                return Some(version);
            }
        }
    }
    if let Ok(raw) = fs::read_to_string(root.join("Cargo.toml")) {
        if let Ok(parsed) = toml::from_str::<CargoManifest>(&raw) {
            if let Some(toml::Value::String(version)) =
                parsed.package.and_then(|p| p.version)
            {
                return Some(version);
            }
        }
    }
    None
}

// ─── Coverage ───────────────────────────────────────────────────────────

/// One file's hit maps in an istanbul-style `coverage-final.json`.
#[derive(Debug, Deserialize)]
struct CoverageFile {
    /// Statement hits.
    s: BTreeMap<String, u64>,
    /// Function hits.
    f: BTreeMap<String, u64>,
    /// Branch hit lists.
    b: BTreeMap<String, Vec<u64>>,
    /// Line hits, not always present.
    #[serde(default)]
    l: Option<BTreeMap<String, u64>>,
}

/// Read and summarize an istanbul-style coverage map. Returns `None` for a
/// missing or unparseable file, or one with no instrumentation at all.
#[must_use]
pub fn read_coverage_summary(path: &Path) -> Option<CoverageSummary> {
    let raw = fs::read_to_string(path).ok()?;
    let files: BTreeMap<String, CoverageFile> = match serde_json::from_str(&raw) {
        Ok(files) => files,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "unreadable coverage map");
            return None;
        }
    };
    summarize(&files)
}

fn summarize(files: &BTreeMap<String, CoverageFile>) -> Option<CoverageSummary> {
    let mut statements = (0_u64, 0_u64);
    let mut functions = (0_u64, 0_u64);
    let mut branches = (0_u64, 0_u64);
    let mut lines = (0_u64, 0_u64);
    let mut has_lines = false;

    for file in files.values() {
        for hits in file.s.values() {
            statements.1 += 1;
            if *hits > 0 {
                statements.0 += 1;
            }
        }
        for hits in file.f.values() {
            functions.1 += 1;
            if *hits > 0 {
                functions.0 += 1;
            }
        }
        for branch_hits in file.b.values() {
            for hits in branch_hits {
                branches.1 += 1;
                if *hits > 0 {
                    branches.0 += 1;
                }
            }
        }
        if let Some(line_hits) = file.l.as_ref() {
            has_lines = true;
            for hits in line_hits.values() {
                lines.1 += 1;
                if *hits > 0 {
                    lines.0 += 1;
                }
            }
        }
    }

    if statements.1 == 0 && functions.1 == 0 && branches.1 == 0 && !has_lines {
        return None;
    }

    Some(CoverageSummary {
        statements: CoverageMetric::new(statements.0, statements.1),
        branches: CoverageMetric::new(branches.0, branches.1),
        functions: CoverageMetric::new(functions.0, functions.1),
        lines: has_lines.then(|| CoverageMetric::new(lines.0, lines.1)),
    })
}
