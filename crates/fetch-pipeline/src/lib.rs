// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cancelable asynchronous fetch pipeline over pooled buffers.
//!
//! A fetch is a chain of [`Producer`] stages sharing one
//! [`ProducerContext`]. The caller supplies a [`Consumer`] for the
//! outcome and a [`ProducerListener`] for stage lifecycle events, then
//! may cancel at any time. The contract in one line: **exactly one
//! terminal callback per request**, whatever races between completion
//! and cancellation.
//!
//! Stage layout of a typical chain:
//!
//! ```text
//!   caller thread                 executor (blocking pool)
//!   ─────────────                 ────────────────────────
//!   HandoffProducer ── schedule ─▶ LocalThumbnailFetchProducer
//!                                       │ policy gate
//!                                       ▼
//!                                  LocalFetchProducer
//!                                       │ open → read into pool chunk
//!                                       ▼
//!                                  Consumer::on_new_result
//! ```
//!
//! Buffers come from a [`chunk_pool::ChunkPool`]; dropping a result
//! returns its chunk to the pool.

pub mod buffer;
pub mod config;
pub mod consumer;
pub mod context;
pub mod error;
pub mod executor;
pub mod handoff;
pub mod listener;
pub mod local_fetch;
pub mod producer;
pub mod request;
pub mod source;
pub mod thumbnail;

pub use buffer::{PooledBufferFactory, PooledBytes};
pub use config::{BucketConfig, PipelineConfig};
pub use consumer::Consumer;
pub use context::{ProducerContext, RequestState, TerminalOutcome};
pub use error::FetchError;
pub use executor::{DeferredExecutor, Executor, TokioExecutor};
pub use handoff::HandoffProducer;
pub use listener::{NullListener, ProducerListener, TracingListener};
pub use local_fetch::LocalFetchProducer;
pub use producer::Producer;
pub use request::{FetchRequest, Priority, ResizeOptions};
pub use source::{FsSourceOpener, SourceOpener, SourceStream};
pub use thumbnail::{LocalThumbnailFetchProducer, THUMBNAIL_MAX_DIMENSION};
