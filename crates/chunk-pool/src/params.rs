// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Immutable pool configuration.
//!
//! [`PoolParams`] declares the pool's size classes up front: which bucket
//! sizes exist, how many free chunks each bucket may retain, and the two
//! capacity caps. All consistency checks happen at construction so the pool
//! itself never has to re-validate.

use crate::PoolError;
use std::collections::BTreeMap;

/// Sentinel for "retain an unlimited number of free chunks in this bucket".
pub const UNBOUNDED_FREE: usize = usize::MAX;

/// Immutable configuration for a [`ChunkPool`](crate::ChunkPool).
///
/// # Invariants (checked by [`PoolParams::new`])
/// - `min_bucket_size <= max_bucket_size`
/// - `max_size_hard_cap >= max_size_soft_cap`
/// - the bucket table is non-empty, every declared size lies in
///   `[min_bucket_size, max_bucket_size]`, and the largest declared size
///   equals `max_bucket_size`, so every request up to the maximum maps to
///   a bucket.
#[derive(Debug, Clone)]
pub struct PoolParams {
    min_bucket_size: usize,
    max_bucket_size: usize,
    /// Declared bucket size → max free chunks retained ([`UNBOUNDED_FREE`]
    /// for no limit).
    max_free: BTreeMap<usize, usize>,
    max_size_soft_cap: usize,
    max_size_hard_cap: usize,
    ignore_hard_cap: bool,
}

impl PoolParams {
    /// Creates and validates pool parameters.
    pub fn new(
        max_free: BTreeMap<usize, usize>,
        max_size_soft_cap: usize,
        max_size_hard_cap: usize,
    ) -> Result<Self, PoolError> {
        if max_free.is_empty() {
            return Err(PoolError::InvalidParams(
                "at least one bucket size must be declared".to_string(),
            ));
        }
        if max_size_hard_cap < max_size_soft_cap {
            return Err(PoolError::InvalidParams(format!(
                "hard cap ({max_size_hard_cap}) must be >= soft cap ({max_size_soft_cap})"
            )));
        }
        if let Some((&size, _)) = max_free.iter().find(|(&size, _)| size == 0) {
            return Err(PoolError::InvalidParams(format!(
                "bucket size must be positive, got {size}"
            )));
        }

        // Non-empty map, so both bounds exist.
        let min_bucket_size = *max_free.keys().next().unwrap_or(&0);
        let max_bucket_size = *max_free.keys().next_back().unwrap_or(&0);

        Ok(Self {
            min_bucket_size,
            max_bucket_size,
            max_free,
            max_size_soft_cap,
            max_size_hard_cap,
            ignore_hard_cap: false,
        })
    }

    /// Disables hard-cap rejection. Test/debug escape hatch only.
    pub fn ignore_hard_cap(mut self, ignore: bool) -> Self {
        self.ignore_hard_cap = ignore;
        self
    }

    /// A small default layout: power-of-two buckets from 4 KB to 1 MB,
    /// 16 free chunks each, 4 MB soft cap, 8 MB hard cap.
    pub fn small() -> Self {
        let mut max_free = BTreeMap::new();
        let mut size = 4 * 1024;
        while size <= 1024 * 1024 {
            max_free.insert(size, 16);
            size *= 2;
        }
        // Caps are consistent by construction.
        Self::new(max_free, 4 * 1024 * 1024, 8 * 1024 * 1024)
            .expect("default params are valid")
    }

    /// Returns the smallest declared bucket size.
    pub fn min_bucket_size(&self) -> usize {
        self.min_bucket_size
    }

    /// Returns the largest declared bucket size.
    pub fn max_bucket_size(&self) -> usize {
        self.max_bucket_size
    }

    /// Returns the soft cap in bytes.
    pub fn max_size_soft_cap(&self) -> usize {
        self.max_size_soft_cap
    }

    /// Returns the hard cap in bytes.
    pub fn max_size_hard_cap(&self) -> usize {
        self.max_size_hard_cap
    }

    /// Returns `true` if hard-cap rejection is disabled.
    pub fn ignores_hard_cap(&self) -> bool {
        self.ignore_hard_cap
    }

    /// Returns the declared bucket table (size → max free chunks).
    pub fn bucket_table(&self) -> &BTreeMap<usize, usize> {
        &self.max_free
    }

    /// Computes the bucketed size for a request: the smallest declared
    /// bucket size that is >= `requested`.
    pub fn bucketed_size(&self, requested: usize) -> Result<usize, PoolError> {
        if requested == 0 {
            return Err(PoolError::ZeroSizedRequest);
        }
        match self.max_free.range(requested..).next() {
            Some((&size, _)) => Ok(size),
            None => Err(PoolError::SizeTooLarge {
                requested,
                max: self.max_bucket_size,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(usize, usize)]) -> BTreeMap<usize, usize> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_valid_params() {
        let p = PoolParams::new(table(&[(1024, 4), (4096, 2)]), 16 * 1024, 64 * 1024).unwrap();
        assert_eq!(p.min_bucket_size(), 1024);
        assert_eq!(p.max_bucket_size(), 4096);
        assert!(!p.ignores_hard_cap());
    }

    #[test]
    fn test_empty_table_rejected() {
        let result = PoolParams::new(BTreeMap::new(), 1024, 2048);
        assert!(matches!(result, Err(PoolError::InvalidParams(_))));
    }

    #[test]
    fn test_hard_cap_below_soft_cap_rejected() {
        let result = PoolParams::new(table(&[(1024, 4)]), 2048, 1024);
        assert!(matches!(result, Err(PoolError::InvalidParams(_))));
    }

    #[test]
    fn test_zero_bucket_size_rejected() {
        let result = PoolParams::new(table(&[(0, 4)]), 1024, 2048);
        assert!(matches!(result, Err(PoolError::InvalidParams(_))));
    }

    #[test]
    fn test_bucketed_size_rounds_up() {
        let p = PoolParams::new(table(&[(1024, 4), (4096, 2)]), 16 * 1024, 64 * 1024).unwrap();
        assert_eq!(p.bucketed_size(1).unwrap(), 1024);
        assert_eq!(p.bucketed_size(1024).unwrap(), 1024);
        assert_eq!(p.bucketed_size(1025).unwrap(), 4096);
        assert_eq!(p.bucketed_size(4096).unwrap(), 4096);
    }

    #[test]
    fn test_bucketed_size_too_large() {
        let p = PoolParams::new(table(&[(1024, 4)]), 16 * 1024, 64 * 1024).unwrap();
        assert!(matches!(
            p.bucketed_size(1025),
            Err(PoolError::SizeTooLarge { requested: 1025, max: 1024 })
        ));
    }

    #[test]
    fn test_bucketed_size_zero() {
        let p = PoolParams::small();
        assert!(matches!(p.bucketed_size(0), Err(PoolError::ZeroSizedRequest)));
    }

    #[test]
    fn test_small_default() {
        let p = PoolParams::small();
        assert_eq!(p.min_bucket_size(), 4 * 1024);
        assert_eq!(p.max_bucket_size(), 1024 * 1024);
        assert!(p.max_size_hard_cap() >= p.max_size_soft_cap());
    }
}
