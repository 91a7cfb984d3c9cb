//! Process-wide lifecycle for the shared store.
//!
//! The first queue construction initializes a [`StoreRuntime`]: it resolves
//! the holding area from configuration, sweeps areas abandoned by crashed
//! processes, opens the store, and starts the heartbeat and cleaner threads.
//! Shutdown stops the workers, compacts the store and removes the holding
//! area, logging each failure individually so one does not mask another.

use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{error, info, warn};

use super::cleaner::{Cleaner, Maintenance};
use super::holding;
use super::kv::SharedStore;
use crate::config::StoreConfig;
use crate::constants;
use crate::error::StoreError;

static GLOBAL: OnceLock<Arc<StoreRuntime>> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Owner of the process-wide store, holding area, generation counter and
/// background workers. All queue instances share one runtime.
pub struct StoreRuntime {
    config: StoreConfig,
    area: PathBuf,
    store: SharedStore,
    generation: AtomicU64,
    heartbeat: holding::Heartbeat,
    cleaner: Cleaner,
    down: AtomicBool,
}

impl StoreRuntime {
    /// The process-wide runtime, initialized with default configuration on
    /// first use.
    ///
    /// A store that cannot be opened here terminates the process with a
    /// non-zero status: the queue subsystem cannot function without its
    /// backing store.
    pub fn global() -> Arc<Self> {
        if let Some(runtime) = GLOBAL.get() {
            return runtime.clone();
        }
        match Self::init(StoreConfig::default()) {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("unable to create holding area: {e}");
                process::exit(1);
            }
        }
    }

    /// Initialize the process-wide runtime with an explicit configuration.
    ///
    /// Returns the existing runtime if one was already initialized; the
    /// configuration argument is ignored in that case.
    pub fn init(config: StoreConfig) -> Result<Arc<Self>, StoreError> {
        let _guard = INIT_LOCK.lock();
        if let Some(runtime) = GLOBAL.get() {
            return Ok(runtime.clone());
        }
        let runtime = Self::new(config)?;
        let _ = GLOBAL.set(runtime.clone());
        Ok(runtime)
    }

    /// Create a standalone runtime. Embedders and tests use this to keep
    /// stores isolated; production code normally goes through [`global`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Fatal`] when the holding area or its store
    /// cannot be created, or the background workers cannot be spawned.
    ///
    /// [`global`]: StoreRuntime::global
    pub fn new(config: StoreConfig) -> Result<Arc<Self>, StoreError> {
        let root = config.data_store.clone();
        fs::create_dir_all(&root).map_err(StoreError::fatal)?;

        holding::sweep_stale_areas(&root, config.running_in_cloud, constants::STALE_AREA_AFTER);

        let area = holding::active_area(&root, config.running_in_cloud, &holding::instance_id());
        let started = Instant::now();
        let store = SharedStore::open(&area)?;
        holding::mark_running(&area).map_err(StoreError::fatal)?;
        let heartbeat = holding::Heartbeat::start(area.clone()).map_err(StoreError::fatal)?;
        let cleaner = Cleaner::start(store.clone(), area.clone()).map_err(StoreError::fatal)?;
        info!(
            "holding area {} ready in {:?}",
            area.display(),
            started.elapsed()
        );

        Ok(Arc::new(Self {
            config,
            area,
            store,
            generation: AtomicU64::new(0),
            heartbeat,
            cleaner,
            down: AtomicBool::new(false),
        }))
    }

    /// The shared key-value store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The active holding-area directory.
    pub fn holding_area(&self) -> &Path {
        &self.area
    }

    /// Next value of the process-wide generation counter. Each queue
    /// instance adopts a fresh value at construction and after every reset,
    /// which namespaces its disk keys away from earlier lifecycles.
    pub(crate) fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Ask the cleaner to delete every key under `"{prefix}/"`.
    pub(crate) fn request_purge(&self, prefix: String) {
        self.cleaner.request(Maintenance::Purge(prefix));
    }

    /// Ask the cleaner for a compaction pass.
    pub(crate) fn request_compact(&self) {
        self.cleaner.request(Maintenance::Compact);
    }

    /// Block until the cleaner has processed all maintenance enqueued before
    /// this call.
    pub fn settle(&self) {
        self.cleaner.settle();
    }

    /// Stop the background workers, release the store and remove the holding
    /// area. Safe to call more than once; later calls are no-ops.
    ///
    /// The host application is expected to invoke this on its exit path;
    /// areas left behind by a crash are reclaimed by the stale sweep of the
    /// next process instead.
    pub fn shutdown(&self) {
        if self.down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.heartbeat.stop();
        self.cleaner.stop();
        if let Err(e) = self.store.compact() {
            warn!("final compaction failed: {e}");
        }
        match holding::release_area(&self.area, self.config.running_in_cloud) {
            Ok(()) => info!("holding area {} cleared", self.area.display()),
            Err(e) => warn!(
                "unable to clear holding area {}: {e}",
                self.area.display()
            ),
        }
    }
}
