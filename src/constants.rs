//! Shared constants for the store and queue layers.

use std::time::Duration;

/// Number of events a queue keeps in its in-memory head before spilling.
pub const MEMORY_BUFFER: u64 = 10;

/// Upper bound on the write index; its decimal width fixes the zero-padded
/// sequence format so lexicographic key order equals FIFO order.
pub const MAX_EVENTS: u64 = 100_000_000;

/// Default root directory for holding areas.
pub const DEFAULT_DATA_STORE: &str = "/tmp/reactive";

/// File name of the embedded store inside a holding area.
pub const STORE_FILE: &str = "events.redb";

/// Liveness marker file inside a holding area.
pub const RUNNING_MARKER: &str = "RUNNING";

/// How often the heartbeat rewrites the liveness marker.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

/// A holding area whose marker is older than this belongs to a dead process.
pub const STALE_AREA_AFTER: Duration = Duration::from_secs(60);

/// Rotated statistics files: `je.stat.<n>.csv`, kept next to the store.
pub const STATS_FILE_PREFIX: &str = "je.stat.";
pub const STATS_FILE_SUFFIX: &str = ".csv";

/// The active statistics file, never swept.
pub const STATS_FILE_CURRENT: &str = "je.stat.csv";

/// Rotated statistics files older than this are deleted by the cleaner.
pub const STATS_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Depth of the cleaner's command channel.
pub const CLEANER_QUEUE_DEPTH: usize = 64;
