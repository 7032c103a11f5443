//! # Scratch Buffer Pool
//!
//! A bounded recycling pool for the byte buffers the execution loop stages
//! memory reads into (hash input, call arguments, init code). Acquisition
//! never blocks and never fails; release silently drops buffers once the
//! pool is full. Pooling affects throughput only: results are identical
//! with a pool of any capacity, including zero.

/// Default number of buffers retained between uses.
pub const DEFAULT_POOL_CAPACITY: usize = 16;

/// Bounded free-list of reusable scratch buffers.
///
/// Each interpreter owns its own pool, so nothing here is shared across
/// in-flight executions. A released buffer must be fully handed over by the
/// caller; move semantics make retaining an alias impossible.
#[derive(Debug)]
pub struct BufferPool {
    free: Vec<Vec<u8>>,
    capacity: usize,
}

impl BufferPool {
    /// Creates a pool that retains up to `capacity` buffers.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Takes a cleared buffer from the pool, allocating fresh when empty.
    #[must_use]
    pub fn acquire(&mut self) -> Vec<u8> {
        match self.free.pop() {
            Some(mut buf) => {
                buf.clear();
                buf
            }
            None => Vec::new(),
        }
    }

    /// Returns a buffer to the pool; dropped silently when full.
    pub fn release(&mut self, buf: Vec<u8>) {
        if self.free.len() < self.capacity {
            self.free.push(buf);
        }
    }

    /// Number of buffers currently retained.
    #[must_use]
    pub fn retained(&self) -> usize {
        self.free.len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }
}

// =============================================================================
// TESTS
// =============================================================================
