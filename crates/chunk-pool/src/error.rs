// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the chunk pool.

/// Errors that can occur during pool configuration and allocation.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The requested size exceeds the largest configured bucket.
    #[error("requested size {requested} exceeds the maximum bucket size {max}")]
    SizeTooLarge { requested: usize, max: usize },

    /// The allocation would exceed the hard cap, even after trimming.
    #[error(
        "out of memory: requested {requested} bytes with {used_bytes} in use \
         and {free_bytes} free (hard cap: {hard_cap})"
    )]
    OutOfMemory {
        requested: usize,
        used_bytes: usize,
        free_bytes: usize,
        hard_cap: usize,
    },

    /// Attempted to request a zero-sized chunk.
    #[error("cannot request a zero-sized chunk")]
    ZeroSizedRequest,

    /// The pool parameters are inconsistent.
    #[error("invalid pool parameters: {0}")]
    InvalidParams(String),

    /// Bucket accounting was corrupted (e.g., a double release).
    ///
    /// This is a programmer error, not a recoverable condition.
    #[error("pool invariant violation: {0}")]
    InvariantViolation(String),

    /// The underlying allocation strategy failed to produce a chunk.
    #[error("chunk allocation failed: {0}")]
    AllocationFailed(String),
}
