//! Cross-process file channel.
//!
//! Used when the executing environment cannot share memory with the
//! reporting process (browser-driven tests, multi-worker runners). Each
//! producer owns one file per source module, named
//! `<sourceFileBaseName>.<hash12>.json` where the hash covers the owning
//! module path plus the worker identifier. Locations are distinguishable,
//! so no cross-process locking exists. The reader merges everything at
//! drain.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use storydoc_error::Result;
use storydoc_types::{ScenarioIdentity, StoryPartial};

use crate::merge::{merge_partials, MergedRecord};
use crate::StorySink;

/// Version stamp written into every partial file.
const PARTIAL_SCHEMA_VERSION: u32 = 1;

/// Hex length of the file-name hash.
const FILE_HASH_LEN: usize = 12;

/// One (identity, partial) pair on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PartialEntry {
    identity: ScenarioIdentity,
    partial: StoryPartial,
}

/// On-disk shape of one producer's partial file.
#[derive(Debug, Serialize, Deserialize)]
struct PartialFile {
    schema_version: u32,
    worker_id: String,
    entries: Vec<PartialEntry>,
}

/// File name for one producer's partials of one source module:
/// `<base>.<hash12>.json`. The hash covers the full module path and the
/// worker id, so two workers (or two modules with the same base name)
/// never collide.
#[must_use]
pub fn partial_file_name(source_file: &str, worker_id: &str) -> String {
    let base = Path::new(source_file)
        .file_stem()
        .map_or_else(|| "unknown".to_owned(), |s| s.to_string_lossy().into_owned());
    let mut hasher = Sha256::new();
    hasher.update(source_file.as_bytes());
    hasher.update([0]);
    hasher.update(worker_id.as_bytes());
    let digest = hasher.finalize();
    let mut hash = String::with_capacity(FILE_HASH_LEN);
    for byte in digest.iter().take(FILE_HASH_LEN / 2) {
        let _ = write!(hash, "{byte:02x}");
    }
    format!("{base}.{hash}.json")
}

// ─── Writer side ────────────────────────────────────────────────────────

/// Producer half of the file channel. Buffers partials per source module
/// and writes one file per module on [`flush`](FileChannelWriter::flush).
///
/// Writes go through a temp file and a rename, so a crashed producer
/// leaves either a complete file or none; a truncated write surfaces as
/// a corrupt temp file the reader never looks at.
#[derive(Debug)]
pub struct FileChannelWriter {
    dir: PathBuf,
    worker_id: String,
    buffered: Mutex<BTreeMap<String, Vec<PartialEntry>>>,
}

impl FileChannelWriter {
    /// A writer for the given channel directory and worker identity.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, worker_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            worker_id: worker_id.into(),
            buffered: Mutex::new(BTreeMap::new()),
        }
    }

    /// Write all buffered partials to disk, one file per source module.
    /// Returns the paths written. The buffer is cleared on success.
    ///
    /// # Errors
    /// On directory creation or file write failure.
    pub fn flush(&self) -> Result<Vec<PathBuf>> {
        let buffered = std::mem::take(&mut *self.buffered.lock());
        if buffered.is_empty() {
            return Ok(Vec::new());
        }
        fs::create_dir_all(&self.dir)?;

        let mut written = Vec::with_capacity(buffered.len());
        for (source_file, entries) in buffered {
            let name = partial_file_name(&source_file, &self.worker_id);
            let path = self.dir.join(&name);
            let tmp = self.dir.join(format!("{name}.tmp"));
            let payload = PartialFile {
                schema_version: PARTIAL_SCHEMA_VERSION,
                worker_id: self.worker_id.clone(),
                entries,
            };
            fs::write(&tmp, serde_json::to_vec_pretty(&payload)?)?;
            fs::rename(&tmp, &path)?;
            written.push(path);
        }
        Ok(written)
    }
}

impl StorySink for FileChannelWriter {
    fn record(&self, identity: ScenarioIdentity, partial: StoryPartial) -> Result<()> {
        self.buffered
            .lock()
            .entry(identity.source_file.clone())
            .or_default()
            .push(PartialEntry { identity, partial });
        Ok(())
    }
}

// ─── Reader side ────────────────────────────────────────────────────────

/// Consumer half of the file channel: scans the channel directory once at
/// run end and merges every readable partial file.
#[derive(Debug)]
pub struct FileChannelReader {
    dir: PathBuf,
}

impl FileChannelReader {
    /// A reader over the given channel directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read and merge all partial files. Unreadable or corrupt files are
    /// skipped with a warning and never abort the drain for other records.
    /// A missing channel directory drains to nothing.
    ///
    /// Output is sorted by identity, matching [`MemoryStore::drain`]
    /// determinism.
    ///
    /// [`MemoryStore::drain`]: crate::MemoryStore::drain
    #[must_use]
    pub fn drain(&self) -> Vec<(ScenarioIdentity, MergedRecord)> {
        let mut buckets: BTreeMap<ScenarioIdentity, Vec<StoryPartial>> = BTreeMap::new();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::debug!(dir = %self.dir.display(), %error, "no channel directory");
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        // Deterministic ingest order: directory iteration order is not.
        paths.sort();

        for path in paths {
            let raw = match fs::read(&path) {
                Ok(raw) => raw,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable partial");
                    continue;
                }
            };
            let file: PartialFile = match serde_json::from_slice(&raw) {
                Ok(file) => file,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping corrupt partial");
                    continue;
                }
            };
            if file.schema_version != PARTIAL_SCHEMA_VERSION {
                tracing::warn!(
                    path = %path.display(),
                    version = file.schema_version,
                    "skipping partial with unknown schema version"
                );
                continue;
            }
            for entry in file.entries {
                buckets.entry(entry.identity).or_default().push(entry.partial);
            }
        }

        buckets
            .into_iter()
            .map(|(identity, partials)| {
                let merged = merge_partials(&partials);
                (identity, merged)
            })
            .collect()
    }
}
