//! Metadata store and reconciler.
//!
//! Producers (tests, workers, a browser runtime on the far side of an IPC
//! channel) record [`StoryPartial`]s for a scenario identity without any
//! coordination between them. The single reader merges lazily at `drain()`
//! time, never at write time, so the hot test-execution path pays zero
//! locking cost across processes.
//!
//! Two stores share the merge:
//!
//! - [`MemoryStore`]: in-process, append under a mutex. For runners whose
//!   tests share the reporting process.
//! - [`FileChannelWriter`] / [`FileChannelReader`]: one JSON file per
//!   (source module, worker) pair, named `<base>.<hash12>.json`, for
//!   producers that cannot share memory with the reporting process.
//!
//! Delivery is at-least-once; the merge is idempotent under the per-write
//! token dedup, so replayed writes never double-count.

pub mod file;
pub mod memory;
pub mod merge;

pub use file::{partial_file_name, FileChannelReader, FileChannelWriter};
pub use memory::MemoryStore;
pub use merge::{merge_partials, MergedRecord};

use storydoc_error::Result;
use storydoc_types::{ScenarioIdentity, StoryPartial};

/// Destination for recorded partials. Implemented by both stores; the
/// runtime recorder flushes through this seam and never learns whether it
/// is writing to memory or to a file channel.
pub trait StorySink: Send + Sync {
    /// Record one partial for one scenario identity.
    ///
    /// Safe to call from multiple concurrent producers. Must never block
    /// on I/O belonging to other scenarios.
    ///
    /// # Errors
    /// Only on local I/O failure; never on contention.
    fn record(&self, identity: ScenarioIdentity, partial: StoryPartial) -> Result<()>;
}
