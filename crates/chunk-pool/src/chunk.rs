// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory chunks, the allocation strategy seam, and the RAII handle.
//!
//! A [`MemoryChunk`] is an opaque fixed-capacity buffer owned by exactly
//! one place at a time: a bucket's free list, a caller (via
//! [`PooledChunk`]), or nowhere (destroyed). Ownership transfers are moves,
//! so the borrow checker rules out use-after-release at compile time;
//! there is no runtime "is this chunk still valid" check to get wrong.

use crate::pool::PoolInner;
use crate::PoolError;
use std::sync::Arc;

/// A fixed-capacity, exclusively-owned memory buffer.
///
/// The capacity is set at allocation time and never changes; a chunk in a
/// bucket's free list always has capacity exactly equal to the bucket's
/// item size.
pub struct MemoryChunk {
    data: Box<[u8]>,
}

impl MemoryChunk {
    pub(crate) fn new(data: Box<[u8]>) -> Self {
        Self { data }
    }

    /// Returns the fixed capacity of this chunk in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl std::fmt::Debug for MemoryChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChunk")
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// The size-class allocation strategy.
///
/// The pool calls this on a free-list miss. Implementations decide *how*
/// backing memory is obtained; the pool decides *whether* the allocation is
/// admissible under its caps. Tests substitute failing or counting
/// allocators through this seam.
pub trait ChunkAllocator: Send + Sync {
    /// Allocates a zero-filled chunk of exactly `size` bytes.
    fn alloc(&self, size: usize) -> Result<MemoryChunk, PoolError>;
}

/// Default allocator: zero-filled managed heap memory.
#[derive(Debug, Default)]
pub struct HeapAllocator;

impl ChunkAllocator for HeapAllocator {
    fn alloc(&self, size: usize) -> Result<MemoryChunk, PoolError> {
        Ok(MemoryChunk::new(vec![0u8; size].into_boxed_slice()))
    }
}

/// An RAII handle to a pooled chunk.
///
/// While a `PooledChunk` is alive, its caller has exclusive ownership of
/// the underlying memory. Dropping the handle returns the chunk to the
/// pool (which retains or destroys it according to bucket limits and the
/// soft cap).
///
/// # Example
/// ```ignore
/// let chunk = pool.get(10_000)?;
/// chunk.as_slice();        // use the buffer
/// drop(chunk);             // returned to the pool
/// // chunk.as_slice();     // compile error: moved value
/// ```
pub struct PooledChunk {
    /// `Option` so `drop` can move the chunk back into the pool.
    chunk: Option<MemoryChunk>,
    pool: Arc<PoolInner>,
    bucketed_size: usize,
}

impl PooledChunk {
    pub(crate) fn new(chunk: MemoryChunk, pool: Arc<PoolInner>, bucketed_size: usize) -> Self {
        Self {
            chunk: Some(chunk),
            pool,
            bucketed_size,
        }
    }

    /// Returns an immutable view of the chunk.
    pub fn as_slice(&self) -> &[u8] {
        self.chunk
            .as_ref()
            .map(MemoryChunk::as_slice)
            .unwrap_or(&[])
    }

    /// Returns a mutable view of the chunk.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self.chunk.as_mut() {
            Some(chunk) => chunk.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Returns the bucketed capacity of this chunk in bytes.
    ///
    /// This is the size class the request was rounded up to, which may be
    /// larger than the size originally requested.
    pub fn capacity(&self) -> usize {
        self.bucketed_size
    }
}

impl Drop for PooledChunk {
    fn drop(&mut self) {
        if let Some(chunk) = self.chunk.take() {
            self.pool.release(chunk, self.bucketed_size);
        }
    }
}

impl std::fmt::Debug for PooledChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledChunk")
            .field("bucketed_size", &self.bucketed_size)
            .field("held", &self.chunk.is_some())
            .finish()
    }
}
