//! Scenario identity: the merge key of the reconciler.
//!
//! Two records with the same `(source_file, title_path)` are the same
//! logical scenario observed more than once (retries, worker shards) and
//! must be merged, never duplicated in final output.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex length of the stable scenario id derived from an identity.
pub const SCENARIO_ID_LEN: usize = 12;

/// The merge key used by the reconciler.
///
/// `title_path` is the full ancestor-chain-plus-title array as reported by
/// the host framework, outermost group first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScenarioIdentity {
    /// Source file path relative to the project root.
    pub source_file: String,
    /// Ancestor chain plus scenario title.
    pub title_path: Vec<String>,
}

impl ScenarioIdentity {
    /// Build an identity from a source file and title path.
    #[must_use]
    pub fn new(source_file: impl Into<String>, title_path: Vec<String>) -> Self {
        Self {
            source_file: source_file.into(),
            title_path,
        }
    }

    /// The scenario title: the last element of the title path, or empty.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title_path.last().map_or("", String::as_str)
    }

    /// Flat map key. NUL-joined so no legal path or title can collide with
    /// another identity's key.
    #[must_use]
    pub fn key(&self) -> String {
        let mut key = self.source_file.clone();
        for part in &self.title_path {
            key.push('\0');
            key.push_str(part);
        }
        key
    }

    /// Stable 12-hex scenario id, identical across runs for the same
    /// identity. Truncated SHA-256 over the flat key.
    #[must_use]
    pub fn scenario_id(&self) -> String {
        use fmt::Write;

        let digest = Sha256::digest(self.key().as_bytes());
        let mut id = String::with_capacity(SCENARIO_ID_LEN);
        for byte in digest.iter().take(SCENARIO_ID_LEN / 2) {
            let _ = write!(id, "{byte:02x}");
        }
        id
    }
}

impl fmt::Display for ScenarioIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.source_file, self.title_path.join(" > "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(file: &str, path: &[&str]) -> ScenarioIdentity {
        ScenarioIdentity::new(file, path.iter().map(|s| (*s).to_owned()).collect())
    }

    #[test]
    fn key_distinguishes_path_boundaries() {
        // A "::"-style separator inside a title must not collide with an
        // actual nesting boundary.
        let flat = ident("a", &["b::c"]);
        let nested = ident("a", &["b", "c"]);
        assert_ne!(flat.key(), nested.key());
    }

    #[test]
    fn scenario_id_is_stable_and_twelve_hex() {
        let id1 = ident("calc.test.ts", &["Calculator", "adds"]).scenario_id();
        let id2 = ident("calc.test.ts", &["Calculator", "adds"]).scenario_id();
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), SCENARIO_ID_LEN);
        assert!(id1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn scenario_id_differs_per_identity() {
        let a = ident("calc.test.ts", &["Calculator", "adds"]).scenario_id();
        let b = ident("calc.test.ts", &["Calculator", "subtracts"]).scenario_id();
        assert_ne!(a, b);
    }

    #[test]
    fn ordering_is_file_then_title_path() {
        let mut ids = vec![
            ident("b.test.ts", &["A"]),
            ident("a.test.ts", &["Z"]),
            ident("a.test.ts", &["A"]),
        ];
        ids.sort();
        assert_eq!(ids[0].source_file, "a.test.ts");
        assert_eq!(ids[0].title(), "A");
        assert_eq!(ids[2].source_file, "b.test.ts");
    }

    #[test]
    fn title_of_empty_path_is_empty() {
        assert_eq!(ident("f.ts", &[]).title(), "");
    }
}
