//! Reusable text buffers for emission scopes

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Buffers larger than this are dropped instead of returned to the pool
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// Mutex-guarded free list of `String` buffers
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<String>>,
    max_retained: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_max_retained(32)
    }

    /// Create a pool that keeps at most `max_retained` idle buffers
    pub fn with_max_retained(max_retained: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_retained,
        }
    }

    /// Take an empty buffer from the pool
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buffer = self
            .free
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
            .unwrap_or_default();
        debug_assert!(buffer.is_empty());
        PooledBuffer { pool: self, buffer }
    }

    /// Number of idle buffers
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn release(&self, mut buffer: String) {
        if buffer.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buffer.clear();
        let mut free = self.free.lock().unwrap_or_else(|e| e.into_inner());
        if free.len() < self.max_retained {
            free.push(buffer);
        }
    }
}

/// A buffer on loan from a [`BufferPool`]; cleared and returned on drop
#[derive(Debug)]
pub struct PooledBuffer<'p> {
    pool: &'p BufferPool,
    buffer: String,
}

impl Deref for PooledBuffer<'_> {
    type Target = String;

    fn deref(&self) -> &String {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut String {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buffer));
    }
}
