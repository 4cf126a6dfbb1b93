// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A single size class of the pool.
//!
//! Each [`Bucket`] owns a free list of chunks of one fixed size plus a
//! count of chunks currently handed out. Reuse is LIFO (the most recently
//! freed chunk comes back first, for cache locality); trimming evicts
//! oldest-freed first, so the chunks the LIFO path is about to reuse are
//! the last to go.

use crate::chunk::MemoryChunk;
use crate::params::UNBOUNDED_FREE;
use crate::PoolError;
use std::collections::VecDeque;

/// One size class: a free list plus in-use accounting.
pub(crate) struct Bucket {
    /// The bucketed chunk size in bytes; every chunk in `free` has exactly
    /// this capacity.
    item_size: usize,
    /// Free chunks. `push_back` on release, `pop_back` on get (LIFO),
    /// `pop_front` on trim (oldest-freed first).
    free: VecDeque<MemoryChunk>,
    /// Chunks currently handed out to callers.
    used_count: usize,
    /// Max free chunks retained, or `None` for unbounded.
    max_free: Option<usize>,
}

impl Bucket {
    pub(crate) fn new(item_size: usize, max_free: usize) -> Self {
        Self {
            item_size,
            free: VecDeque::new(),
            used_count: 0,
            max_free: (max_free != UNBOUNDED_FREE).then_some(max_free),
        }
    }

    pub(crate) fn item_size(&self) -> usize {
        self.item_size
    }

    pub(crate) fn used_count(&self) -> usize {
        self.used_count
    }

    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Pops the most recently freed chunk, if any, and marks it in use.
    pub(crate) fn get(&mut self) -> Option<MemoryChunk> {
        let chunk = self.free.pop_back()?;
        self.used_count += 1;
        Some(chunk)
    }

    /// Accounts for a freshly allocated chunk served through this bucket.
    pub(crate) fn increment_in_use(&mut self) {
        self.used_count += 1;
    }

    /// Rolls back [`increment_in_use`](Self::increment_in_use) after a
    /// failed fresh allocation.
    pub(crate) fn decrement_in_use(&mut self) -> Result<(), PoolError> {
        if self.used_count == 0 {
            return Err(PoolError::InvariantViolation(format!(
                "bucket {}: in-use count underflow",
                self.item_size
            )));
        }
        self.used_count -= 1;
        Ok(())
    }

    /// Returns a chunk to this bucket.
    ///
    /// The chunk is retained on the free list only when `retain` is set
    /// and the list is below its limit; otherwise it comes back as
    /// `Ok(Some(chunk))` for the caller to destroy and account for.
    /// Returns `Err(InvariantViolation)` on a double release (the in-use
    /// count would go negative) or a foreign chunk (capacity mismatch);
    /// the chunk is dropped rather than retained in either case.
    pub(crate) fn release(
        &mut self,
        chunk: MemoryChunk,
        retain: bool,
    ) -> Result<Option<MemoryChunk>, PoolError> {
        if chunk.capacity() != self.item_size {
            return Err(PoolError::InvariantViolation(format!(
                "bucket {}: released chunk has capacity {}",
                self.item_size,
                chunk.capacity()
            )));
        }
        if self.used_count == 0 {
            return Err(PoolError::InvariantViolation(format!(
                "bucket {}: double release (in-use count is zero)",
                self.item_size
            )));
        }
        self.used_count -= 1;

        let at_limit = self
            .max_free
            .is_some_and(|max| self.free.len() >= max);
        if !retain || at_limit {
            return Ok(Some(chunk));
        }
        self.free.push_back(chunk);
        Ok(None)
    }

    /// Destroys free-list entries beyond `target_free`, oldest-freed first.
    /// Returns bytes reclaimed. Never touches in-use chunks.
    pub(crate) fn trim_to(&mut self, target_free: usize) -> usize {
        let mut reclaimed = 0;
        while self.free.len() > target_free {
            // Oldest-first eviction; drop destroys the chunk.
            if self.free.pop_front().is_some() {
                reclaimed += self.item_size;
            }
        }
        reclaimed
    }

    /// The free-list length a soft trim shrinks toward: half the retention
    /// limit for bounded buckets, half the current free count otherwise.
    pub(crate) fn low_water_mark(&self) -> usize {
        match self.max_free {
            Some(max) => max / 2,
            None => self.free.len() / 2,
        }
    }
}
