//! Two-tier FIFO buffer: in-memory head, disk-backed tail.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, warn};

use crate::constants::{MAX_EVENTS, MEMORY_BUFFER};
use crate::error::StoreError;
use crate::store::StoreRuntime;
use crate::utils;

/// A per-route FIFO event buffer that spills from memory to the shared
/// store once the memory quota is exceeded.
///
/// One producer writes, one consumer reads. `close` marks a drain boundary,
/// not end-of-life: counters reset, leftover disk keys are reclaimed in the
/// background, and the instance is immediately reusable on a fresh
/// generation whose keys cannot collide with the old ones.
pub struct ElasticQueue {
    id: String,
    runtime: Arc<StoreRuntime>,
    inner: Mutex<Inner>,
}

struct Inner {
    version: u64,
    write_counter: u64,
    read_counter: u64,
    empty: bool,
    peeked: Option<Vec<u8>>,
    memory: VecDeque<Vec<u8>>,
}

impl Inner {
    fn reset(&mut self, runtime: &StoreRuntime) {
        if !self.empty {
            self.empty = true;
            self.read_counter = 0;
            self.write_counter = 0;
            self.memory.clear();
            self.version = runtime.next_generation();
        }
    }
}

impl ElasticQueue {
    /// Open a queue for `id` bound to the process-wide store runtime,
    /// initializing the runtime if this is the first queue in the process.
    pub fn new(id: &str) -> Self {
        Self::with_runtime(StoreRuntime::global(), id)
    }

    /// Open a queue bound to an explicit runtime.
    ///
    /// An `id` that is not a well-formed service route is replaced by a
    /// sanitized surrogate.
    pub fn with_runtime(runtime: Arc<StoreRuntime>, id: &str) -> Self {
        let id = if utils::valid_route(id) {
            id.to_string()
        } else {
            utils::filtered_route(id)
        };
        let mut inner = Inner {
            version: 0,
            write_counter: 0,
            read_counter: 0,
            empty: false,
            peeked: None,
            memory: VecDeque::new(),
        };
        inner.reset(&runtime);
        Self {
            id,
            runtime,
            inner: Mutex::new(inner),
        }
    }

    /// The (possibly sanitized) route this queue serves.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when the queue holds no events of the current generation.
    /// Also true for a freshly constructed instance; callers probing for
    /// end-of-drain should observe `read()` returning `None` instead.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().write_counter == 0
    }

    /// Append an event. The first `MEMORY_BUFFER` events of a generation go
    /// to the in-memory head; the rest are spilled to the shared store.
    /// Never blocks beyond the underlying store write.
    ///
    /// # Errors
    ///
    /// Returns an error when the spill write fails; the event is not
    /// accounted as written in that case.
    pub fn write(&self, event: &[u8]) -> Result<(), StoreError> {
        let mut queue = self.inner.lock();
        if queue.write_counter < MEMORY_BUFFER {
            queue.memory.push_back(event.to_vec());
        } else {
            let key = self.disk_key(queue.version, queue.write_counter);
            self.runtime.store().put(&key, event)?;
        }
        queue.write_counter += 1;
        queue.empty = false;
        Ok(())
    }

    /// Look at the next event without consuming it. Repeated peeks without
    /// an intervening `read` return the same value.
    pub fn peek(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let mut queue = self.inner.lock();
        if queue.peeked.is_some() {
            return Ok(queue.peeked.clone());
        }
        let next = self.read_locked(&mut queue)?;
        queue.peeked.clone_from(&next);
        Ok(next)
    }

    /// Consume the next event, or `None` when the queue has caught up with
    /// the producer. Catching up closes out the current generation.
    ///
    /// # Errors
    ///
    /// Returns an error when the store lookup fails. The read position does
    /// not advance, so the next call retries the same offset.
    pub fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let mut queue = self.inner.lock();
        self.read_locked(&mut queue)
    }

    fn read_locked(&self, queue: &mut Inner) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(event) = queue.peeked.take() {
            return Ok(Some(event));
        }
        if queue.read_counter >= queue.write_counter {
            // caught up with the producer, nothing left to read
            self.close_locked(queue);
            return Ok(None);
        }
        if queue.read_counter < MEMORY_BUFFER {
            let event = queue.memory.pop_front();
            if event.is_some() {
                queue.read_counter += 1;
            } else {
                // the head must be populated while read_counter is below the
                // memory quota; return None rather than corrupt the counters
                warn!(
                    "memory head empty at offset {} for {}",
                    queue.read_counter, self.id
                );
            }
            return Ok(event);
        }
        let key = self.disk_key(queue.version, queue.read_counter);
        match self.runtime.store().get(&key)? {
            Some(event) => {
                queue.read_counter += 1;
                if let Err(e) = self.runtime.store().delete(&key) {
                    warn!("unable to delete {key}: {e}");
                }
                Ok(Some(event))
            }
            None => {
                // transient: the counter stays put so the next read retries
                // this offset
                error!("{}", StoreError::KeyNotFound { expected: key });
                Ok(None)
            }
        }
    }

    /// Mark a drain boundary: reset counters, clear the memory head and move
    /// to a fresh generation. Unread spilled events of the old generation
    /// are reclaimed by the cleaner in the background. No-op when the queue
    /// is already closed.
    pub fn close(&self) {
        let mut queue = self.inner.lock();
        self.close_locked(&mut queue);
    }

    fn close_locked(&self, queue: &mut Inner) {
        if queue.write_counter == 0 {
            return;
        }
        if queue.write_counter > MEMORY_BUFFER {
            if queue.read_counter < queue.write_counter {
                // only the abandoned generation is reclaimed, never the id
                self.runtime
                    .request_purge(format!("{}/{}", self.id, queue.version));
            } else {
                self.runtime.request_compact();
            }
        }
        queue.reset(&self.runtime);
    }

    /// Close and additionally reclaim every generation this id ever wrote.
    /// For when the route this queue serves is retired.
    pub fn destroy(&self) {
        self.close();
        self.runtime.request_purge(self.id.clone());
    }

    fn disk_key(&self, version: u64, seq: u64) -> String {
        format!(
            "{}/{}/{}",
            self.id,
            version,
            utils::zero_fill(seq, MAX_EVENTS)
        )
    }

    #[cfg(test)]
    pub(crate) fn counters(&self) -> (u64, u64, usize) {
        let queue = self.inner.lock();
        (queue.read_counter, queue.write_counter, queue.memory.len())
    }
}

impl Drop for ElasticQueue {
    fn drop(&mut self) {
        self.close();
    }
}
