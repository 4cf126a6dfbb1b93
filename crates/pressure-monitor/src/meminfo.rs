// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! System memory sampling via `/proc/meminfo`.
//!
//! Only `MemTotal` and `MemAvailable` are read. `MemAvailable` already
//! accounts for reclaimable cache, so it is the right basis for a
//! pressure signal; `MemFree` alone would trip the thresholds constantly
//! on any host with a warm page cache.

use crate::MonitorError;
use std::path::Path;

const MEMINFO_PATH: &str = "/proc/meminfo";

/// A sample of system memory state.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MemInfo {
    /// Total physical memory in bytes.
    pub total_bytes: u64,
    /// Kernel-estimated available memory in bytes.
    pub available_bytes: u64,
}

impl MemInfo {
    /// Samples `/proc/meminfo`.
    pub fn read() -> Result<Self, MonitorError> {
        Self::read_from(Path::new(MEMINFO_PATH))
    }

    /// Samples a `/proc/meminfo`-formatted file (fixtures in tests).
    pub fn read_from(path: &Path) -> Result<Self, MonitorError> {
        let content = std::fs::read_to_string(path).map_err(|e| MonitorError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, source_path: &Path) -> Result<Self, MonitorError> {
        let mut total_kb = None;
        let mut available_kb = None;

        for line in content.lines() {
            let mut fields = line.split_whitespace();
            let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
                continue;
            };
            let slot = match key {
                "MemTotal:" => &mut total_kb,
                "MemAvailable:" => &mut available_kb,
                _ => continue,
            };
            *slot = Some(value.parse::<u64>().map_err(|_| MonitorError::ParseError {
                path: source_path.display().to_string(),
                detail: format!("expected integer kB value for {key} got '{value}'"),
            })?);
            if total_kb.is_some() && available_kb.is_some() {
                break;
            }
        }

        let missing = |field: &str| MonitorError::ParseError {
            path: source_path.display().to_string(),
            detail: format!("{field} not found"),
        };
        Ok(Self {
            total_bytes: total_kb.ok_or_else(|| missing("MemTotal"))? * 1024,
            available_bytes: available_kb.ok_or_else(|| missing("MemAvailable"))? * 1024,
        })
    }

    /// Bytes in use (`total - available`).
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    /// Memory utilisation as a fraction in `[0.0, 1.0]`.
    pub fn utilisation(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes() as f64 / self.total_bytes as f64
    }

    /// Available memory in megabytes.
    pub fn available_mb(&self) -> u64 {
        self.available_bytes / (1024 * 1024)
    }
}
