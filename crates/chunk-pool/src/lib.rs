// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # chunk-pool
//!
//! A bucketed chunk pool for short-lived fetch buffers: fixed-size chunks
//! grouped into declared size classes, freed chunks reused LIFO, and free
//! lists shrunk under memory pressure.
//!
//! # Key Components
//!
//! - [`PoolParams`]: the declared bucket table plus soft/hard capacity
//!   caps, validated at construction.
//! - [`ChunkPool`]: the allocator. Bucketed lookup, cap enforcement,
//!   graded trimming, statistics.
//! - [`PooledChunk`]: an RAII handle. Dropping it returns the chunk to
//!   the pool; the borrow checker rules out use-after-release at compile
//!   time.
//! - [`TrimRegistry`] / [`Trimmable`]: the memory-pressure contract. The
//!   registry is an explicit dependency handed to the pool at
//!   construction, not an ambient global.
//! - [`ChunkAllocator`]: the size-class allocation strategy seam
//!   ([`HeapAllocator`] by default).
//!
//! # Ownership Model
//!
//! ```text
//! ChunkPool::get(size)
//!       │  rounds up to a declared bucket size
//!       ▼
//!   PooledChunk  ◄─── owns the chunk, holds Arc<PoolInner>
//!       │
//!       │  drop()
//!       ▼
//!   bucket free list (LIFO reuse), or destroyed past retention limits
//! ```
//!
//! A chunk is always in exactly one place: a bucket's free list, a
//! caller's hands, or destroyed.
//!
//! # Example
//! ```
//! use chunk_pool::{ChunkPool, MemoryPressureLevel, PoolParams, TrimRegistry};
//!
//! let registry = TrimRegistry::new();
//! let pool = ChunkPool::with_registry(PoolParams::small(), &registry);
//!
//! let chunk = pool.get(10_000).unwrap();
//! drop(chunk);
//!
//! // Under pressure, the registry shrinks the pool's free lists.
//! registry.notify(MemoryPressureLevel::Critical);
//! assert_eq!(pool.free_bytes(), 0);
//! ```

mod bucket;
mod chunk;
mod error;
mod params;
pub mod pool;
mod stats;
mod trim;

pub use chunk::{ChunkAllocator, HeapAllocator, MemoryChunk, PooledChunk};
pub use error::PoolError;
pub use params::{PoolParams, UNBOUNDED_FREE};
pub use pool::ChunkPool;
pub use stats::{PoolSnapshot, PoolStats};
pub use trim::{MemoryPressureLevel, TrimAggressiveness, TrimRegistry, Trimmable};
