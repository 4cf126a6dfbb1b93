// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The bucketed chunk pool.
//!
//! [`ChunkPool`] hands out fixed-size chunks grouped into size buckets,
//! reuses freed chunks to avoid repeated large allocations, and shrinks
//! its free lists under memory pressure. It enforces two caps:
//!
//! 1. **Soft cap**: exceeded totals trigger eager trimming of free lists
//!    before a fresh allocation, and released chunks are destroyed instead
//!    of retained while the pool stays above it.
//! 2. **Hard cap**: the last gate. If a fresh allocation would still push
//!    `used + free` past it after trimming, `get` fails with
//!    [`PoolError::OutOfMemory`]. Never exceeded (unless the
//!    `ignore_hard_cap` escape hatch is set).
//!
//! # Thread Safety
//! All bucket state and both aggregate byte counters live under a single
//! `Mutex`, so `get`, release-on-drop, and trim calls from arbitrary
//! threads (including a memory-pressure notifier) can interleave without
//! ever exposing a torn state.

use crate::bucket::Bucket;
use crate::chunk::{ChunkAllocator, HeapAllocator, PooledChunk};
use crate::stats::{PoolSnapshot, PoolStats};
use crate::trim::{MemoryPressureLevel, TrimAggressiveness, TrimRegistry, Trimmable};
use crate::{MemoryChunk, PoolError, PoolParams};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Mutable pool state. Counters and free lists are updated together under
/// one lock so they can never disagree.
struct PoolState {
    buckets: BTreeMap<usize, Bucket>,
    used_bytes: usize,
    free_bytes: usize,
    stats: PoolStats,
}

/// Shared pool internals. [`PooledChunk`] guards hold an `Arc` to this so
/// they can return chunks without a reference to the full [`ChunkPool`].
pub(crate) struct PoolInner {
    params: PoolParams,
    allocator: Box<dyn ChunkAllocator>,
    state: Mutex<PoolState>,
}

impl PoolInner {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        match self.state.lock() {
            Ok(state) => state,
            // Counter updates are shielded by the bucket invariant checks;
            // recover the data rather than wedging every caller.
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Called by `PooledChunk::drop`. Routes the chunk to its bucket and
    /// updates both byte counters in the same critical section.
    pub(crate) fn release(&self, chunk: MemoryChunk, bucketed_size: usize) {
        let mut state = self.lock_state();

        // Retaining keeps `used + free` constant, so the comparison is
        // against the current total.
        let over_soft_cap =
            state.used_bytes + state.free_bytes > self.params.max_size_soft_cap();

        let bucket = match state.buckets.get_mut(&bucketed_size) {
            Some(bucket) => bucket,
            None => {
                debug_assert!(false, "release for undeclared bucket {bucketed_size}");
                tracing::error!(bucketed_size, "release for undeclared bucket; dropping chunk");
                return;
            }
        };

        match bucket.release(chunk, !over_soft_cap) {
            Ok(retained_or_destroyed) => {
                state.used_bytes -= bucketed_size;
                state.stats.record_release();
                match retained_or_destroyed {
                    None => state.free_bytes += bucketed_size,
                    Some(chunk) => {
                        state.stats.record_destroyed(1);
                        drop(chunk);
                    }
                }
            }
            Err(violation) => {
                // Memory-safety corruption risk: fail loudly, don't guess
                // at the accounting.
                debug_assert!(false, "{violation}");
                tracing::error!(%violation, "bucket release rejected");
            }
        }
    }

    /// Trims free lists while holding the state lock. Returns bytes
    /// reclaimed. In-use chunks are never touched.
    fn trim_locked(state: &mut PoolState, aggressiveness: TrimAggressiveness) -> usize {
        let mut reclaimed = 0;
        for bucket in state.buckets.values_mut() {
            let target = match aggressiveness {
                TrimAggressiveness::Hard => 0,
                TrimAggressiveness::Soft => bucket.low_water_mark(),
            };
            let bytes = bucket.trim_to(target);
            if bytes > 0 {
                state.stats.record_destroyed((bytes / bucket.item_size()) as u64);
                reclaimed += bytes;
            }
        }
        state.free_bytes -= reclaimed;
        state.stats.record_trim(reclaimed);
        reclaimed
    }

    fn trim_impl(&self, aggressiveness: TrimAggressiveness) -> usize {
        let mut state = self.lock_state();
        let reclaimed = Self::trim_locked(&mut state, aggressiveness);
        drop(state);
        if reclaimed > 0 {
            tracing::debug!(?aggressiveness, reclaimed, "pool trimmed");
        }
        reclaimed
    }
}

impl Trimmable for PoolInner {
    fn trim(&self, level: MemoryPressureLevel) {
        if let Some(aggressiveness) = level.aggressiveness() {
            let reclaimed = self.trim_impl(aggressiveness);
            tracing::info!(?level, reclaimed, "pool responded to memory pressure");
        }
    }
}

/// A bucketed, capacity-capped chunk pool.
///
/// Cloning is cheap (shared handle). See the [module docs](self) for the
/// capacity model.
///
/// # Example
/// ```
/// use chunk_pool::{ChunkPool, PoolParams};
///
/// let pool = ChunkPool::new(PoolParams::small());
///
/// let chunk = pool.get(10_000).unwrap();
/// assert!(chunk.capacity() >= 10_000);
/// assert_eq!(pool.used_bytes(), chunk.capacity());
///
/// drop(chunk); // back to the free list
/// assert_eq!(pool.used_bytes(), 0);
/// assert!(pool.free_bytes() > 0);
/// ```
#[derive(Clone)]
pub struct ChunkPool {
    inner: Arc<PoolInner>,
}

impl ChunkPool {
    /// Creates a pool with the default heap allocation strategy.
    pub fn new(params: PoolParams) -> Self {
        Self::with_allocator(params, Box::new(HeapAllocator))
    }

    /// Creates a pool with a custom size-class allocation strategy.
    pub fn with_allocator(params: PoolParams, allocator: Box<dyn ChunkAllocator>) -> Self {
        let buckets = params
            .bucket_table()
            .iter()
            .map(|(&size, &max_free)| (size, Bucket::new(size, max_free)))
            .collect();
        tracing::info!(
            buckets = params.bucket_table().len(),
            soft_cap = params.max_size_soft_cap(),
            hard_cap = params.max_size_hard_cap(),
            "chunk pool created"
        );
        Self {
            inner: Arc::new(PoolInner {
                params,
                allocator,
                state: Mutex::new(PoolState {
                    buckets,
                    used_bytes: 0,
                    free_bytes: 0,
                    stats: PoolStats::default(),
                }),
            }),
        }
    }

    /// Creates a pool and registers it with a memory-pressure registry.
    ///
    /// The registration is weak: dropping the last pool handle deregisters
    /// it, no explicit disposal step required.
    pub fn with_registry(params: PoolParams, registry: &TrimRegistry) -> Self {
        let pool = Self::new(params);
        pool.register_with(registry);
        pool
    }

    /// Registers this pool with `registry` for pressure notifications.
    pub fn register_with(&self, registry: &TrimRegistry) {
        registry.register(Arc::downgrade(&self.inner) as Weak<dyn Trimmable>);
    }

    /// Requests a chunk of at least `requested` bytes.
    ///
    /// The request is rounded up to the smallest declared bucket size.
    /// Free-list hits return the most recently freed chunk of that size.
    /// On a miss, the soft cap is checked (and free lists trimmed) before
    /// a fresh allocation; the hard cap is the final gate after trimming.
    ///
    /// # Errors
    /// - [`PoolError::SizeTooLarge`]: `requested` exceeds the largest bucket.
    /// - [`PoolError::OutOfMemory`]: the hard cap would be exceeded even
    ///   after trimming. The caller decides how to recover; the pool never
    ///   silently substitutes a smaller chunk.
    pub fn get(&self, requested: usize) -> Result<PooledChunk, PoolError> {
        let bucketed = self.inner.params.bucketed_size(requested)?;
        let params = &self.inner.params;

        {
            let mut state = self.inner.lock_state();

            // Free-list hit: reuse the most recently freed chunk.
            let hit = state
                .buckets
                .get_mut(&bucketed)
                .and_then(Bucket::get);
            if let Some(chunk) = hit {
                state.free_bytes -= bucketed;
                state.used_bytes += bucketed;
                let used = state.used_bytes;
                state.stats.record_hit();
                state.stats.update_peak(used);
                return Ok(PooledChunk::new(chunk, Arc::clone(&self.inner), bucketed));
            }

            // Miss. Soft cap first: trim free lists toward their low-water
            // marks before growing the footprint.
            if state.used_bytes + state.free_bytes + bucketed > params.max_size_soft_cap() {
                PoolInner::trim_locked(&mut state, TrimAggressiveness::Soft);
            }
            // Still headed past the hard cap? Give back everything free.
            if state.used_bytes + state.free_bytes + bucketed > params.max_size_hard_cap() {
                PoolInner::trim_locked(&mut state, TrimAggressiveness::Hard);
            }
            // Hard cap is the last gate after trimming.
            if !params.ignores_hard_cap()
                && state.used_bytes + state.free_bytes + bucketed > params.max_size_hard_cap()
            {
                state.stats.record_oom();
                let err = PoolError::OutOfMemory {
                    requested,
                    used_bytes: state.used_bytes,
                    free_bytes: state.free_bytes,
                    hard_cap: params.max_size_hard_cap(),
                };
                tracing::warn!(%err, "hard cap rejection");
                return Err(err);
            }

            // Reserve the accounting before allocating so a concurrent
            // `get` cannot race the pool past the hard cap.
            state.used_bytes += bucketed;
            let used = state.used_bytes;
            state.stats.update_peak(used);
            if let Some(bucket) = state.buckets.get_mut(&bucketed) {
                bucket.increment_in_use();
            }
        }

        // Allocate outside the lock; allocation may be slow.
        match self.inner.allocator.alloc(bucketed) {
            Ok(chunk) => {
                let mut state = self.inner.lock_state();
                state.stats.record_alloc();
                Ok(PooledChunk::new(chunk, Arc::clone(&self.inner), bucketed))
            }
            Err(err) => {
                // Roll back the reservation.
                let mut state = self.inner.lock_state();
                state.used_bytes -= bucketed;
                if let Some(bucket) = state.buckets.get_mut(&bucketed) {
                    if let Err(violation) = bucket.decrement_in_use() {
                        debug_assert!(false, "{violation}");
                        tracing::error!(%violation, "rollback after failed allocation");
                    }
                }
                tracing::warn!(%err, bucketed, "fresh allocation failed");
                Err(err)
            }
        }
    }

    /// Reclaims free-list memory. Returns bytes reclaimed.
    ///
    /// Safe to call from any thread, concurrent with `get` and releases;
    /// in-use chunks are never touched.
    pub fn trim(&self, aggressiveness: TrimAggressiveness) -> usize {
        self.inner.trim_impl(aggressiveness)
    }

    /// Returns the bytes currently handed out to callers.
    pub fn used_bytes(&self) -> usize {
        self.inner.lock_state().used_bytes
    }

    /// Returns the bytes currently parked in free lists.
    pub fn free_bytes(&self) -> usize {
        self.inner.lock_state().free_bytes
    }

    /// Returns the pool parameters.
    pub fn params(&self) -> &PoolParams {
        &self.inner.params
    }

    /// Returns a consistent, read-only snapshot of counters and per-bucket
    /// occupancy.
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.inner.lock_state();
        PoolSnapshot {
            get_count: state.stats.get_count,
            free_list_hit_count: state.stats.free_list_hit_count,
            alloc_count: state.stats.alloc_count,
            release_count: state.stats.release_count,
            destroyed_count: state.stats.destroyed_count,
            oom_count: state.stats.oom_count,
            trimmed_bytes: state.stats.trimmed_bytes,
            peak_used_bytes: state.stats.peak_used_bytes,
            current_used_bytes: state.used_bytes,
            current_free_bytes: state.free_bytes,
            buckets: state
                .buckets
                .iter()
                .map(|(&size, bucket)| (size, (bucket.used_count(), bucket.free_count())))
                .collect(),
        }
    }
}

impl std::fmt::Debug for ChunkPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("ChunkPool")
            .field("used_bytes", &state.used_bytes)
            .field("free_bytes", &state.free_bytes)
            .field("buckets", &state.buckets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// 1 KB / 4 KB / 16 KB buckets, 4 free chunks each; 32 KB soft cap,
    /// 64 KB hard cap.
    fn test_params() -> PoolParams {
        let table: BTreeMap<usize, usize> =
            [(1024, 4), (4096, 4), (16 * 1024, 4)].into_iter().collect();
        PoolParams::new(table, 32 * 1024, 64 * 1024).unwrap()
    }

    #[test]
    fn test_get_rounds_up_to_bucket() {
        let pool = ChunkPool::new(test_params());
        let chunk = pool.get(100).unwrap();
        assert_eq!(chunk.capacity(), 1024);
        assert_eq!(pool.used_bytes(), 1024);
    }

    #[test]
    fn test_size_too_large() {
        let pool = ChunkPool::new(test_params());
        assert!(matches!(
            pool.get(16 * 1024 + 1),
            Err(PoolError::SizeTooLarge { .. })
        ));
    }

    #[test]
    fn test_release_returns_to_free_list() {
        let pool = ChunkPool::new(test_params());
        let chunk = pool.get(4096).unwrap();
        drop(chunk);
        assert_eq!(pool.used_bytes(), 0);
        assert_eq!(pool.free_bytes(), 4096);
    }

    #[test]
    fn test_release_then_get_reuses_chunk() {
        let pool = ChunkPool::new(test_params());
        let mut chunk = pool.get(4096).unwrap();
        chunk.as_mut_slice()[0] = 0x5A;
        drop(chunk);

        // Same bucketed size, no trim in between: free-list hit returning
        // the just-released chunk.
        let again = pool.get(4000).unwrap();
        assert_eq!(again.as_slice()[0], 0x5A);

        let snap = pool.snapshot();
        assert_eq!(snap.free_list_hit_count, 1);
        assert_eq!(snap.alloc_count, 1);
    }

    #[test]
    fn test_hard_cap_never_exceeded() {
        let pool = ChunkPool::new(test_params());
        let mut held = Vec::new();

        // Interleave gets and releases; the total must never pass the cap.
        for round in 0..50 {
            match pool.get(16 * 1024) {
                Ok(chunk) => held.push(chunk),
                Err(PoolError::OutOfMemory { .. }) => {
                    held.pop();
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
            if round % 3 == 0 {
                held.pop();
            }
            assert!(pool.used_bytes() + pool.free_bytes() <= 64 * 1024);
        }
    }

    #[test]
    fn test_oom_when_everything_in_use() {
        let pool = ChunkPool::new(test_params());
        // 4 × 16 KB = 64 KB fills the hard cap.
        let _held: Vec<_> = (0..4).map(|_| pool.get(16 * 1024).unwrap()).collect();

        let result = pool.get(1024);
        assert!(matches!(result, Err(PoolError::OutOfMemory { .. })));
        assert_eq!(pool.snapshot().oom_count, 1);
    }

    #[test]
    fn test_get_over_hard_cap_trims_free_lists_first() {
        let pool = ChunkPool::new(test_params());
        // Park what the soft cap allows in the free list (the first
        // release happens over the cap and is destroyed).
        let held: Vec<_> = (0..3).map(|_| pool.get(16 * 1024).unwrap()).collect();
        drop(held);
        assert_eq!(pool.free_bytes(), 32 * 1024);

        // 64 KB of fresh requests: free chunks are reused or trimmed away,
        // never counted against the new allocations.
        let _all: Vec<_> = (0..4).map(|_| pool.get(16 * 1024).unwrap()).collect();
        assert_eq!(pool.used_bytes(), 64 * 1024);
        assert!(pool.used_bytes() + pool.free_bytes() <= 64 * 1024);
    }

    #[test]
    fn test_ignore_hard_cap_escape_hatch() {
        let pool = ChunkPool::new(test_params().ignore_hard_cap(true));
        // 5 × 16 KB = 80 KB > 64 KB hard cap, but allowed.
        let held: Vec<_> = (0..5).map(|_| pool.get(16 * 1024).unwrap()).collect();
        assert_eq!(held.len(), 5);
        assert_eq!(pool.used_bytes(), 80 * 1024);
    }

    #[test]
    fn test_hard_trim_reclaims_all_free_bytes() {
        let pool = ChunkPool::new(test_params());
        let chunks: Vec<_> = (0..3).map(|_| pool.get(4096).unwrap()).collect();
        let keeper = pool.get(1024).unwrap();
        drop(chunks);

        let free_before = pool.free_bytes();
        assert_eq!(free_before, 3 * 4096);

        let reclaimed = pool.trim(TrimAggressiveness::Hard);
        assert_eq!(reclaimed, free_before);
        assert_eq!(pool.free_bytes(), 0);
        // In-use chunks are untouched.
        assert_eq!(pool.used_bytes(), 1024);
        drop(keeper);
    }

    #[test]
    fn test_soft_trim_respects_low_water_mark() {
        let pool = ChunkPool::new(test_params());
        let chunks: Vec<_> = (0..4).map(|_| pool.get(1024).unwrap()).collect();
        drop(chunks);
        assert_eq!(pool.free_bytes(), 4 * 1024);

        // max_free = 4 → low-water mark 2: deterministic reclaim of 2 KB.
        let reclaimed = pool.trim(TrimAggressiveness::Soft);
        assert_eq!(reclaimed, 2 * 1024);
        assert_eq!(pool.free_bytes(), 2 * 1024);
    }

    #[test]
    fn test_release_over_soft_cap_destroys() {
        let pool = ChunkPool::new(test_params());
        // 48 KB in use puts the pool over the 32 KB soft cap.
        let chunks: Vec<_> = (0..3).map(|_| pool.get(16 * 1024).unwrap()).collect();
        assert_eq!(pool.used_bytes(), 48 * 1024);

        drop(chunks);
        // Releases over the soft cap destroy rather than retain, until the
        // total falls back to the cap.
        assert!(pool.free_bytes() <= 32 * 1024);
        assert!(pool.snapshot().destroyed_count >= 1);
    }

    #[test]
    fn test_pressure_notification_trims_pool() {
        let registry = TrimRegistry::new();
        let pool = ChunkPool::with_registry(test_params(), &registry);
        assert_eq!(registry.len(), 1);

        let chunk = pool.get(4096).unwrap();
        drop(chunk);
        assert_eq!(pool.free_bytes(), 4096);

        registry.notify(MemoryPressureLevel::Critical);
        assert_eq!(pool.free_bytes(), 0);

        registry.notify(MemoryPressureLevel::None);
        assert_eq!(pool.snapshot().oom_count, 0);
    }

    #[test]
    fn test_dropping_pool_deregisters() {
        let registry = TrimRegistry::new();
        let pool = ChunkPool::with_registry(test_params(), &registry);
        drop(pool);
        registry.notify(MemoryPressureLevel::Critical);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failing_allocator_rolls_back() {
        struct FailingAllocator;
        impl ChunkAllocator for FailingAllocator {
            fn alloc(&self, size: usize) -> Result<MemoryChunk, PoolError> {
                Err(PoolError::AllocationFailed(format!(
                    "no backing memory for {size} bytes"
                )))
            }
        }

        let pool = ChunkPool::with_allocator(test_params(), Box::new(FailingAllocator));
        let result = pool.get(1024);
        assert!(matches!(result, Err(PoolError::AllocationFailed(_))));
        assert_eq!(pool.used_bytes(), 0);
        assert_eq!(pool.free_bytes(), 0);
    }

    #[test]
    fn test_concurrent_get_release_and_trim() {
        let pool = ChunkPool::new(test_params());
        let trimmer = pool.clone();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        if let Ok(chunk) = pool.get(1024) {
                            assert_eq!(chunk.capacity(), 1024);
                        }
                    }
                })
            })
            .collect();
        let trim_thread = std::thread::spawn(move || {
            for i in 0..100 {
                let aggressiveness = if i % 2 == 0 {
                    TrimAggressiveness::Soft
                } else {
                    TrimAggressiveness::Hard
                };
                trimmer.trim(aggressiveness);
            }
        });

        for worker in workers {
            worker.join().unwrap();
        }
        trim_thread.join().unwrap();

        // Everything released; accounting must be consistent.
        assert_eq!(pool.used_bytes(), 0);
        let snap = pool.snapshot();
        assert_eq!(snap.get_count, snap.free_list_hit_count + snap.alloc_count + snap.oom_count);
        assert!(pool.used_bytes() + pool.free_bytes() <= 64 * 1024);
    }

    #[test]
    fn test_snapshot_histogram() {
        let pool = ChunkPool::new(test_params());
        let _a = pool.get(1024).unwrap();
        let b = pool.get(4096).unwrap();
        drop(b);

        let snap = pool.snapshot();
        assert_eq!(snap.buckets[&1024], (1, 0));
        assert_eq!(snap.buckets[&4096], (0, 1));
        assert_eq!(snap.current_used_bytes, 1024);
        assert_eq!(snap.current_free_bytes, 4096);
    }
}
