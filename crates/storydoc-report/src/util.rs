//! Small formatting helpers shared by the renderers.

use chrono::{DateTime, Utc};

/// Human duration: `N ms` under one second, `N.NN s` above.
#[must_use]
pub fn format_duration(duration_ms: u64) -> String {
    if duration_ms < 1000 {
        format!("{duration_ms} ms")
    } else {
        #[allow(clippy::cast_precision_loss)]
        let secs = duration_ms as f64 / 1000.0;
        format!("{secs:.2} s")
    }
}

/// ISO 8601 UTC timestamp from epoch milliseconds.
#[must_use]
pub fn iso_timestamp(epoch_ms: u64) -> String {
    timestamp(epoch_ms).format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// `YYYY-MM-DD HH:MM:SS` rendering from epoch milliseconds.
#[must_use]
pub fn locale_timestamp(epoch_ms: u64) -> String {
    timestamp(epoch_ms).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn timestamp(epoch_ms: u64) -> DateTime<Utc> {
    let millis = i64::try_from(epoch_ms).unwrap_or(i64::MAX);
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Short (7-char) git SHA, passed through when already short.
#[must_use]
pub fn short_sha(sha: &str) -> &str {
    if sha.len() > 7 {
        &sha[..7]
    } else {
        sha
    }
}

/// Join a permalink base and a relative file path with exactly one slash.
#[must_use]
pub fn permalink(base: &str, file: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), file)
}
