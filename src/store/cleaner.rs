//! Background maintenance worker for the shared store.
//!
//! A single thread drains a bounded command channel. `close`/`destroy`
//! enqueue and return immediately; the worker deletes retired key ranges,
//! compacts the log and sweeps outdated statistics files. Failures here are
//! logged only: leftover keys under a retired version are inert because no
//! instance will ever read them again.

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use super::holding;
use super::kv::SharedStore;
use crate::constants;

/// Commands accepted by the cleaner thread.
pub(crate) enum Maintenance {
    /// Delete every key under `"{prefix}/"`, then compact.
    Purge(String),
    /// Compact without deleting anything.
    Compact,
    /// Reply once every previously enqueued command has been processed.
    Settle(Sender<()>),
}

/// Handle to the single cleaner thread.
pub(crate) struct Cleaner {
    tx: Mutex<Option<Sender<Maintenance>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Cleaner {
    /// Spawn the cleaner for the given store and holding area.
    pub(crate) fn start(store: SharedStore, area: PathBuf) -> io::Result<Self> {
        let (tx, rx) = bounded(constants::CLEANER_QUEUE_DEPTH);
        let handle = thread::Builder::new()
            .name("store-cleaner".into())
            .spawn(move || run(&rx, &store, &area))?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Enqueue maintenance without blocking the caller.
    pub(crate) fn request(&self, command: Maintenance) {
        let Some(tx) = self.tx.lock().clone() else {
            warn!("cleaner is not running, maintenance request dropped");
            return;
        };
        match tx.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("cleaner queue full, maintenance request dropped"),
            Err(TrySendError::Disconnected(_)) => warn!("cleaner is not running"),
        }
    }

    /// Block until every command enqueued before this call has been
    /// processed.
    pub(crate) fn settle(&self) {
        let Some(tx) = self.tx.lock().clone() else {
            return;
        };
        let (done_tx, done_rx) = bounded(1);
        if tx.send(Maintenance::Settle(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }

    /// Drain outstanding commands and join the worker. Idempotent.
    pub(crate) fn stop(&self) {
        drop(self.tx.lock().take());
        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            warn!("cleaner thread panicked");
        }
    }
}

fn run(rx: &Receiver<Maintenance>, store: &SharedStore, area: &Path) {
    debug!("cleaner started");
    while let Ok(command) = rx.recv() {
        match command {
            Maintenance::Purge(prefix) => purge(store, &prefix, area),
            Maintenance::Compact => compact(store),
            Maintenance::Settle(done) => drop(done.send(())),
        }
    }
    debug!("cleaner stopped");
}

fn purge(store: &SharedStore, prefix: &str, area: &Path) {
    // The trailing slash keeps "q/1" from bleeding into "q/10/...".
    let scoped = format!("{prefix}/");
    match store.purge_prefix(&scoped) {
        Ok(0) => {}
        Ok(n) => {
            compact(store);
            info!(
                "cleared {n} unread event{} for {prefix}",
                if n == 1 { "" } else { "s" }
            );
        }
        Err(e) => warn!("unable to scan {prefix}: {e}"),
    }
    holding::sweep_stale_stats(area, constants::STATS_MAX_AGE);
}

fn compact(store: &SharedStore) {
    if let Err(e) = store.compact() {
        warn!("compaction failed: {e}");
    }
}
