//! Per-route elastic FIFO queues.
//!
//! Each queue serves one route with one producer and one consumer. The
//! first [`MEMORY_BUFFER`](crate::constants::MEMORY_BUFFER) events of a
//! generation stay in memory; everything beyond spills into the shared
//! store under `"{id}/{version}/{seq}"` keys, so draining stays strictly
//! FIFO across both tiers.
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
//! let queue = ElasticQueue::with_runtime(runtime.clone(), "billing.invoices");
//!
//! // A burst larger than the memory head spills to disk transparently.
//! for i in 0u8..25 {
//!     queue.write(&[i])?;
//! }
//! for i in 0u8..25 {
//!     assert_eq!(queue.read()?.as_deref(), Some([i].as_slice()));
//! }
//!
//! // Catching up resets the queue; it is immediately reusable.
//! assert!(queue.read()?.is_none());
//! assert!(queue.is_closed());
//! # runtime.shutdown();
//! # Ok(())
//! # }
//! ```

mod elastic;

pub use elastic::ElasticQueue;
