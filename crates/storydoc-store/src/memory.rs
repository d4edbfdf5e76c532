//! In-process store: append under a mutex, merge at drain.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use storydoc_error::Result;
use storydoc_types::{ScenarioIdentity, StoryPartial};

use crate::merge::{merge_partials, MergedRecord};
use crate::StorySink;

/// In-memory metadata store for runners whose tests share the reporting
/// process. Writers append; the single reader consumes once per run.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partials: Mutex<BTreeMap<ScenarioIdentity, Vec<StoryPartial>>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities currently holding partials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.partials.lock().len()
    }

    /// True when nothing has been recorded (or everything was drained).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partials.lock().is_empty()
    }

    /// Merge and consume everything recorded so far. Output is sorted by
    /// identity, so drain order is deterministic regardless of recording
    /// order.
    #[must_use]
    pub fn drain(&self) -> Vec<(ScenarioIdentity, MergedRecord)> {
        let buckets = std::mem::take(&mut *self.partials.lock());
        buckets
            .into_iter()
            .map(|(identity, partials)| {
                let merged = merge_partials(&partials);
                (identity, merged)
            })
            .collect()
    }
}

impl StorySink for MemoryStore {
    fn record(&self, identity: ScenarioIdentity, partial: StoryPartial) -> Result<()> {
        self.partials.lock().entry(identity).or_default().push(partial);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use storydoc_types::OutcomeCounts;

    fn ident(file: &str, title: &str) -> ScenarioIdentity {
        ScenarioIdentity::new(file, vec![title.to_owned()])
    }

    fn pass_delta(at: u64) -> StoryPartial {
        StoryPartial::outcome_delta(
            OutcomeCounts {
                passed: 1,
                failed: 0,
                skipped: 0,
                todo: 0,
            },
            1,
            at,
        )
    }

    #[test]
    fn drain_merges_per_identity_and_sorts() {
        let store = MemoryStore::new();
        store.record(ident("b.test.ts", "second"), pass_delta(1)).unwrap();
        store.record(ident("a.test.ts", "first"), pass_delta(2)).unwrap();
        store.record(ident("a.test.ts", "first"), pass_delta(3)).unwrap();

        let drained = store.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0.source_file, "a.test.ts");
        assert_eq!(drained[0].1.outcome.passed, 2);
        assert_eq!(drained[1].0.source_file, "b.test.ts");
    }

    #[test]
    fn drain_consumes() {
        let store = MemoryStore::new();
        store.record(ident("a.test.ts", "t"), pass_delta(1)).unwrap();
        assert_eq!(store.drain().len(), 1);
        assert!(store.is_empty());
        assert!(store.drain().is_empty());
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for worker in 0..8_u64 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for i in 0..50_u64 {
                    store
                        .record(ident("shared.test.ts", "hot"), pass_delta(worker * 100 + i))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let drained = store.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].1.outcome.passed, 400);
    }
}
