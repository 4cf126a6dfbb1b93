// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the fetch pipeline.
//!
//! Cancellation is deliberately *not* represented here: it is a distinct
//! terminal outcome with its own consumer callback, never an error.

/// Errors that can occur while fetching a source into pooled buffers.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Reading from the source failed.
    #[error("I/O error reading '{locator}': {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    /// The source locator does not resolve to readable data.
    #[error("source not found: '{locator}'")]
    SourceNotFound { locator: String },

    /// The pool could not supply a buffer (capacity errors included).
    #[error("pool error: {0}")]
    Pool(#[from] chunk_pool::PoolError),

    /// Configuration file problems: unreadable, unparsable, or invalid.
    #[error("config error: {0}")]
    Config(String),
}
