// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool usage statistics.
//!
//! [`PoolStats`] accumulates counters as the pool runs; [`PoolSnapshot`]
//! is the read-only view handed to external monitoring. Snapshots have no
//! behavioural effect on the pool.

use std::collections::BTreeMap;

/// Cumulative counters, updated under the pool lock.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Total number of `get` requests (hits, misses, and failures).
    pub get_count: u64,
    /// `get` requests served from a bucket free list.
    pub free_list_hit_count: u64,
    /// `get` requests that required a fresh allocation.
    pub alloc_count: u64,
    /// Chunks returned to the pool.
    pub release_count: u64,
    /// Chunks physically destroyed (trim, or release past retention).
    pub destroyed_count: u64,
    /// `get` requests rejected over the hard cap.
    pub oom_count: u64,
    /// Total bytes reclaimed by trims.
    pub trimmed_bytes: u64,
    /// High-water mark of in-use bytes.
    pub peak_used_bytes: usize,
}

impl PoolStats {
    pub(crate) fn record_hit(&mut self) {
        self.get_count += 1;
        self.free_list_hit_count += 1;
    }

    pub(crate) fn record_alloc(&mut self) {
        self.get_count += 1;
        self.alloc_count += 1;
    }

    pub(crate) fn record_oom(&mut self) {
        self.get_count += 1;
        self.oom_count += 1;
    }

    pub(crate) fn record_release(&mut self) {
        self.release_count += 1;
    }

    pub(crate) fn record_destroyed(&mut self, count: u64) {
        self.destroyed_count += count;
    }

    pub(crate) fn record_trim(&mut self, bytes: usize) {
        self.trimmed_bytes += bytes as u64;
    }

    pub(crate) fn update_peak(&mut self, used_bytes: usize) {
        if used_bytes > self.peak_used_bytes {
            self.peak_used_bytes = used_bytes;
        }
    }

    /// Returns the free-list hit ratio in `[0.0, 1.0]` (0.0 before any
    /// successful `get`).
    pub fn hit_ratio(&self) -> f64 {
        let served = self.free_list_hit_count + self.alloc_count;
        if served == 0 {
            return 0.0;
        }
        self.free_list_hit_count as f64 / served as f64
    }
}

/// A read-only, serializable snapshot of the pool's state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolSnapshot {
    /// Total `get` requests.
    pub get_count: u64,
    /// Requests served from free lists.
    pub free_list_hit_count: u64,
    /// Requests that allocated fresh memory.
    pub alloc_count: u64,
    /// Chunks returned to the pool.
    pub release_count: u64,
    /// Chunks physically destroyed.
    pub destroyed_count: u64,
    /// Requests rejected over the hard cap.
    pub oom_count: u64,
    /// Bytes reclaimed by trims.
    pub trimmed_bytes: u64,
    /// High-water mark of in-use bytes.
    pub peak_used_bytes: usize,
    /// Bytes currently handed out to callers.
    pub current_used_bytes: usize,
    /// Bytes currently parked in free lists.
    pub current_free_bytes: usize,
    /// Per-bucket histogram: size → (in-use chunks, free chunks).
    pub buckets: BTreeMap<usize, (usize, usize)>,
}

impl PoolSnapshot {
    /// Returns a human-readable one-line summary.
    pub fn summary(&self) -> String {
        let served = self.free_list_hit_count + self.alloc_count;
        let hit_pct = if served == 0 {
            0.0
        } else {
            self.free_list_hit_count as f64 / served as f64 * 100.0
        };
        format!(
            "Pool: {} gets ({} hits, {} allocs, {:.0}% hit rate), {} OOMs, \
             {} used / {} free bytes, peak {} bytes, {} trimmed",
            self.get_count,
            self.free_list_hit_count,
            self.alloc_count,
            hit_pct,
            self.oom_count,
            self.current_used_bytes,
            self.current_free_bytes,
            self.peak_used_bytes,
            self.trimmed_bytes,
        )
    }
}
