// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for pressure monitoring.

/// Errors that can occur when sampling system memory state.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Failed to read a procfs file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse a value from a system file.
    #[error("failed to parse value from {path}: {detail}")]
    ParseError { path: String, detail: String },

    /// Threshold configuration is inconsistent.
    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),
}
