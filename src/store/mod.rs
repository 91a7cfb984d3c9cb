//! Shared persistence for elastic queues.
//!
//! One [`SharedStore`] per process lives inside an on-disk *holding area*
//! together with a `RUNNING` liveness marker. The [`StoreRuntime`] owns the
//! process-wide pieces: it sweeps holding areas left behind by crashed
//! predecessors, opens the store, keeps the marker fresh from a heartbeat
//! thread and runs a single cleaner thread that reclaims retired key ranges
//! in the background.

mod cleaner;
mod holding;
mod kv;
mod runtime;

pub use kv::SharedStore;
pub use runtime::StoreRuntime;
