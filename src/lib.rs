//! Elastic per-route event buffers over a shared embedded store.
//!
//! An [`ElasticQueue`] absorbs bursts addressed to a slow consumer without
//! unbounded heap growth: the first few events stay in an in-memory head and
//! the rest spill into a process-wide [`SharedStore`] under versioned keys.
//! Draining is strictly FIFO across both tiers, and a `close` boundary
//! retires a whole generation of spilled keys in the background without
//! touching live ones.
//!
//! # Example
//!
//! ```
//! use spillway::{ElasticQueue, StoreConfig, StoreRuntime};
//!
//! # fn main() -> anyhow::Result<()> {
//! # let tmp = tempfile::tempdir()?;
//! # let config = StoreConfig {
//! #     data_store: tmp.path().to_path_buf(),
//! #     ..StoreConfig::default()
//! # };
//! let runtime = StoreRuntime::new(config)?;
//! let queue = ElasticQueue::with_runtime(runtime.clone(), "demo.service");
//!
//! queue.write(b"first")?;
//! queue.write(b"second")?;
//!
//! assert_eq!(queue.read()?.as_deref(), Some(b"first".as_slice()));
//! assert_eq!(queue.peek()?.as_deref(), Some(b"second".as_slice()));
//! assert_eq!(queue.read()?.as_deref(), Some(b"second".as_slice()));
//! assert!(queue.read()?.is_none());
//! # runtime.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod queue;
pub mod store;
mod utils;

pub use config::StoreConfig;
pub use error::StoreError;
pub use queue::ElasticQueue;
pub use store::{SharedStore, StoreRuntime};
