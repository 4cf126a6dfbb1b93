// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! System memory pressure detection.
//!
//! Samples `/proc/meminfo`, classifies utilisation against thresholds,
//! and notifies a [`chunk_pool::TrimRegistry`] when the pressure level
//! changes, so every registered pool sheds free memory without any pool
//! knowing about procfs.

pub mod error;
pub mod meminfo;
pub mod monitor;

pub use error::MonitorError;
pub use meminfo::MemInfo;
pub use monitor::{PressureMonitor, PressureThresholds};
