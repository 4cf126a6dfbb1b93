// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reading streams into pool-backed buffers.
//!
//! The factory has two fill strategies. When the source declares its
//! length, one pool request of exactly that size is made up front. When
//! the length is unknown (or the declaration turns out short), the buffer
//! grows geometrically: request a chunk twice the current capacity, copy
//! the filled prefix, release the old chunk. The pool's bucketing keeps
//! the doubling aligned to size classes.

use crate::error::FetchError;
use chunk_pool::{ChunkPool, PooledChunk};
use std::io::Read;

/// An immutable byte buffer backed by a pooled chunk.
///
/// The chunk's capacity is its bucket size and may exceed the logical
/// length; [`as_slice`](PooledBytes::as_slice) exposes only the filled
/// prefix. Dropping the buffer returns the chunk to the pool.
pub struct PooledBytes {
    chunk: PooledChunk,
    len: usize,
}

impl PooledBytes {
    /// Logical length in bytes.
    pub fn size(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The filled bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.chunk.as_slice()[..self.len]
    }

    /// Capacity of the backing chunk (its bucket size).
    pub fn capacity(&self) -> usize {
        self.chunk.capacity()
    }
}

impl std::fmt::Debug for PooledBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBytes")
            .field("len", &self.len)
            .field("capacity", &self.chunk.capacity())
            .finish()
    }
}

/// Builds [`PooledBytes`] from readers, drawing every buffer from one
/// pool.
#[derive(Clone)]
pub struct PooledBufferFactory {
    pool: ChunkPool,
}

impl PooledBufferFactory {
    pub fn new(pool: ChunkPool) -> Self {
        Self { pool }
    }

    /// Returns the backing pool.
    pub fn pool(&self) -> &ChunkPool {
        &self.pool
    }

    /// Reads `reader` to EOF into a pooled buffer.
    ///
    /// `declared_len` sizes the initial chunk; `locator` is only used for
    /// error context. A short declaration is tolerated and triggers the
    /// growth path rather than truncation.
    pub fn from_reader(
        &self,
        reader: &mut dyn Read,
        declared_len: Option<u64>,
        locator: &str,
    ) -> Result<PooledBytes, FetchError> {
        let initial = match declared_len {
            Some(len) if len > 0 => len as usize,
            _ => self.pool.params().min_bucket_size(),
        };
        let mut chunk = self.pool.get(initial)?;
        let mut len = 0;

        loop {
            if len == chunk.capacity() {
                // Probe before growing so an exact-fit source does not
                // cost an extra allocation just to discover EOF.
                let mut probe = [0u8; 1];
                let read = reader.read(&mut probe).map_err(|source| FetchError::Io {
                    locator: locator.to_string(),
                    source,
                })?;
                if read == 0 {
                    break;
                }
                chunk = self.grow(chunk, len)?;
                chunk.as_mut_slice()[len] = probe[0];
                len += 1;
                continue;
            }
            let read = reader
                .read(&mut chunk.as_mut_slice()[len..])
                .map_err(|source| FetchError::Io {
                    locator: locator.to_string(),
                    source,
                })?;
            if read == 0 {
                break;
            }
            len += read;
        }

        Ok(PooledBytes { chunk, len })
    }

    fn grow(&self, old: PooledChunk, len: usize) -> Result<PooledChunk, FetchError> {
        let mut bigger = self.pool.get(old.capacity() * 2)?;
        bigger.as_mut_slice()[..len].copy_from_slice(&old.as_slice()[..len]);
        Ok(bigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunk_pool::{PoolError, PoolParams};

    fn pool() -> ChunkPool {
        ChunkPool::new(PoolParams::small())
    }

    #[test]
    fn test_known_length_single_request() {
        let pool = pool();
        let factory = PooledBufferFactory::new(pool.clone());

        let data = vec![3u8; 1374];
        let bytes = factory
            .from_reader(&mut data.as_slice(), Some(1374), "mem")
            .unwrap();

        assert_eq!(bytes.size(), 1374);
        assert_eq!(bytes.as_slice(), &data[..]);
        assert_eq!(pool.snapshot().alloc_count, 1);
    }

    #[test]
    fn test_unknown_length_grows_geometrically() {
        let pool = pool();
        let factory = PooledBufferFactory::new(pool.clone());

        // 3x the minimum bucket forces at least one growth step.
        let total = pool.params().min_bucket_size() * 3;
        let data = vec![9u8; total];
        let bytes = factory
            .from_reader(&mut data.as_slice(), None, "mem")
            .unwrap();

        assert_eq!(bytes.size(), total);
        assert_eq!(bytes.as_slice(), &data[..]);
        assert!(bytes.capacity() >= total);
        assert!(pool.snapshot().get_count > 1);
    }

    #[test]
    fn test_short_declaration_still_reads_everything() {
        let factory = PooledBufferFactory::new(pool());

        let data = vec![1u8; 10_000];
        let bytes = factory
            .from_reader(&mut data.as_slice(), Some(100), "mem")
            .unwrap();
        assert_eq!(bytes.size(), 10_000);
    }

    #[test]
    fn test_empty_source_yields_empty_buffer() {
        let factory = PooledBufferFactory::new(pool());

        let bytes = factory
            .from_reader(&mut std::io::empty(), Some(0), "mem")
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_oversized_declaration_is_rejected() {
        let factory = PooledBufferFactory::new(pool());

        let max = factory.pool().params().max_bucket_size() as u64;
        let err = factory
            .from_reader(&mut std::io::empty(), Some(max + 1), "mem")
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Pool(PoolError::SizeTooLarge { .. })
        ));
    }

    #[test]
    fn test_drop_returns_chunk_to_pool() {
        let pool = pool();
        let factory = PooledBufferFactory::new(pool.clone());

        let data = vec![5u8; 4096];
        let bytes = factory
            .from_reader(&mut data.as_slice(), Some(4096), "mem")
            .unwrap();
        assert!(pool.used_bytes() > 0);
        drop(bytes);
        assert_eq!(pool.used_bytes(), 0);
        assert!(pool.free_bytes() > 0);
    }
}
