//! Holding-area management.
//!
//! A holding area is the directory that contains the shared store files and
//! a `RUNNING` marker. The marker is rewritten every 20 seconds by the
//! heartbeat; a marker older than 60 seconds identifies the leftovers of a
//! crashed process, which are removed before a new store is opened.

use chrono::Utc;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants;

/// Stable identifier for this process, used as the holding-area directory
/// name so concurrent instances under the same root never collide.
pub(crate) fn instance_id() -> String {
    format!(
        "{}-{}",
        env!("CARGO_PKG_NAME"),
        uuid::Uuid::new_v4().simple()
    )
}

/// Resolve the active holding area for this process.
pub(crate) fn active_area(root: &Path, running_in_cloud: bool, instance: &str) -> PathBuf {
    if running_in_cloud {
        root.to_path_buf()
    } else {
        root.join(instance)
    }
}

/// Remove holding areas whose `RUNNING` marker has not been refreshed within
/// `max_age`. In cloud mode the root itself is the only candidate and is
/// emptied in place; otherwise each subdirectory of the root is a candidate
/// and is deleted wholesale.
pub(crate) fn sweep_stale_areas(root: &Path, running_in_cloud: bool, max_age: Duration) {
    if running_in_cloud {
        remove_if_expired(root, true, max_age);
        return;
    }
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            remove_if_expired(&path, false, max_age);
        }
    }
}

fn remove_if_expired(dir: &Path, keep_dir: bool, max_age: Duration) {
    let marker = dir.join(constants::RUNNING_MARKER);
    let Ok(meta) = fs::metadata(&marker) else {
        return;
    };
    let expired = meta
        .modified()
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > max_age);
    if !expired {
        return;
    }
    match remove_area(dir, keep_dir) {
        Ok(()) => info!("holding area {} expired", dir.display()),
        Err(e) => warn!("unable to remove expired holding area {}: {e}", dir.display()),
    }
}

/// Delete a holding area. `keep_dir` empties the directory but leaves it in
/// place, for roots shared with other tenants.
pub(crate) fn remove_area(dir: &Path, keep_dir: bool) -> io::Result<()> {
    if !keep_dir {
        return fs::remove_dir_all(dir);
    }
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Release the active holding area at shutdown. A shared root only loses its
/// liveness marker; a per-instance directory is deleted entirely.
pub(crate) fn release_area(dir: &Path, shared_root: bool) -> io::Result<()> {
    if shared_root {
        fs::remove_file(dir.join(constants::RUNNING_MARKER))
    } else {
        fs::remove_dir_all(dir)
    }
}

/// Rewrite the liveness marker with the current wall-clock time.
pub(crate) fn mark_running(dir: &Path) -> io::Result<()> {
    fs::write(
        dir.join(constants::RUNNING_MARKER),
        Utc::now().to_rfc3339(),
    )
}

/// Delete rotated statistics files older than `max_age`, keeping the active
/// one. Runs opportunistically after each cleaner pass.
pub(crate) fn sweep_stale_stats(dir: &Path, max_age: Duration) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(constants::STATS_FILE_PREFIX)
            || !name.ends_with(constants::STATS_FILE_SUFFIX)
            || name == constants::STATS_FILE_CURRENT
        {
            continue;
        }
        let path = entry.path();
        let outdated = fs::metadata(&path)
            .ok()
            .and_then(|meta| meta.modified().ok())
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > max_age);
        if !outdated {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => info!("outdated {} deleted", path.display()),
            Err(e) => warn!("unable to delete {}: {e}", path.display()),
        }
    }
}

/// Background worker that keeps the `RUNNING` marker fresh while the store
/// is open.
pub(crate) struct Heartbeat {
    stop_tx: Mutex<Option<Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    /// Spawn the heartbeat thread for the given holding area.
    pub(crate) fn start(dir: PathBuf) -> io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("holding-area-heartbeat".into())
            .spawn(move || run(&dir, &stop_rx))?;
        Ok(Self {
            stop_tx: Mutex::new(Some(stop_tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Stop the heartbeat and wait for the thread to exit. Idempotent.
    pub(crate) fn stop(&self) {
        drop(self.stop_tx.lock().take());
        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            warn!("heartbeat thread panicked");
        }
    }
}

fn run(dir: &Path, stop_rx: &Receiver<()>) {
    debug!("heartbeat started for {}", dir.display());
    loop {
        if let Err(e) = mark_running(dir) {
            warn!(
                "unable to refresh {} in {}: {e}",
                constants::RUNNING_MARKER,
                dir.display()
            );
        }
        match stop_rx.recv_timeout(constants::HEARTBEAT_INTERVAL) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("heartbeat stopped for {}", dir.display());
}
