//! Pool of reusable text buffers for SQL assembly

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::OnceLock;

/// Buffers kept around after release; extra buffers are dropped
const MAX_POOLED: usize = 64;

/// Buffers larger than this are not returned to the pool
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

const INITIAL_CAPACITY: usize = 256;

/// A thread-safe free list of `String` buffers.
///
/// Acquire a buffer with [`BufferPool::get`]; the returned guard hands it
/// back when dropped, including on early returns. A buffer is always empty
/// when acquired.
pub struct BufferPool {
    free: Mutex<Vec<String>>,
    max_pooled: usize,
}

impl BufferPool {
    pub fn new(max_pooled: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_pooled)),
            max_pooled,
        }
    }

    /// The process-wide pool used by the statement builders
    pub fn global() -> &'static BufferPool {
        static POOL: OnceLock<BufferPool> = OnceLock::new();
        POOL.get_or_init(|| BufferPool::new(MAX_POOLED))
    }

    /// Take a buffer from the pool, or allocate one if the pool is empty
    pub fn get(&self) -> PooledBuffer<'_> {
        let mut buf = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| String::with_capacity(INITIAL_CAPACITY));
        buf.clear();
        PooledBuffer {
            pool: self,
            buf: Some(buf),
        }
    }

    /// Number of idle buffers
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn put(&self, buf: String) {
        if buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        let mut free = self.free.lock();
        if free.len() < self.max_pooled {
            free.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(MAX_POOLED)
    }
}

/// A buffer on loan from a [`BufferPool`]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Option<String>,
}

impl PooledBuffer<'_> {
    /// Copy the contents out; the buffer itself goes back to the pool
    pub fn to_text(&self) -> String {
        self.as_str().to_string()
    }

    pub fn as_str(&self) -> &str {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = String;

    fn deref(&self) -> &String {
        // Only `Drop` takes the buffer out.
        self.buf.as_ref().expect("buffer already released")
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut String {
        self.buf.as_mut().expect("buffer already released")
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.put(buf);
        }
    }
}
