// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pipeline configuration loaded from TOML files or constructed
//! programmatically.
//!
//! # TOML Format
//! ```toml
//! soft_cap = "4M"
//! hard_cap = "8M"
//! ignore_hard_cap = false
//! thumbnail_max_dimension = 512
//! num_threads = 4
//!
//! [[buckets]]
//! size = "16K"
//! max_free = 16
//!
//! [[buckets]]
//! size = "64K"
//! max_free = 8
//! ```

use crate::error::FetchError;
use chunk_pool::PoolParams;
use std::collections::BTreeMap;
use std::path::Path;

/// One declared size class.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BucketConfig {
    /// Bucket size (human-readable, e.g. `"64K"` or `"1M"`).
    pub size: String,
    /// Maximum free chunks retained in this bucket.
    pub max_free: usize,
}

/// Configuration for a fetch pipeline and its backing pool.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Declared size classes, smallest to largest.
    pub buckets: Vec<BucketConfig>,
    /// Soft capacity cap (human-readable, e.g. `"4M"`).
    pub soft_cap: String,
    /// Hard capacity cap (human-readable, e.g. `"8M"`).
    pub hard_cap: String,
    /// Disables hard-cap rejection. Test/debug escape hatch only.
    #[serde(default)]
    pub ignore_hard_cap: bool,
    /// Largest thumbnail dimension the pipeline will serve.
    #[serde(default = "default_thumbnail_max_dimension")]
    pub thumbnail_max_dimension: u32,
    /// Number of worker threads (defaults to number of online CPU cores).
    pub num_threads: Option<usize>,
}

fn default_thumbnail_max_dimension() -> u32 {
    crate::thumbnail::THUMBNAIL_MAX_DIMENSION
}

/// Parses a human-readable byte size: plain digits, or a `K`/`M`/`G`
/// suffix (binary multiples).
pub fn parse_size(input: &str) -> Result<usize, FetchError> {
    let trimmed = input.trim();
    let (digits, multiplier) = match trimmed.chars().last() {
        Some('K') | Some('k') => (&trimmed[..trimmed.len() - 1], 1024),
        Some('M') | Some('m') => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        Some('G') | Some('g') => (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024),
        _ => (trimmed, 1),
    };
    let value: usize = digits
        .trim()
        .parse()
        .map_err(|_| FetchError::Config(format!("invalid size '{input}'")))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| FetchError::Config(format!("size '{input}' overflows")))
}

impl PipelineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, FetchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FetchError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, FetchError> {
        toml::from_str(toml_str)
            .map_err(|e| FetchError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, FetchError> {
        toml::to_string_pretty(self)
            .map_err(|e| FetchError::Config(format!("TOML serialise error: {e}")))
    }

    /// Builds validated pool parameters from this config.
    pub fn to_pool_params(&self) -> Result<PoolParams, FetchError> {
        let mut max_free = BTreeMap::new();
        for bucket in &self.buckets {
            let size = parse_size(&bucket.size)?;
            max_free.insert(size, bucket.max_free);
        }
        let soft_cap = parse_size(&self.soft_cap)?;
        let hard_cap = parse_size(&self.hard_cap)?;
        let params = PoolParams::new(max_free, soft_cap, hard_cap)
            .map_err(|e| FetchError::Config(format!("invalid pool layout: {e}")))?;
        Ok(params.ignore_hard_cap(self.ignore_hard_cap))
    }

    /// Resolves the number of worker threads.
    pub fn resolve_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut buckets = Vec::new();
        let mut size = 4;
        while size <= 1024 {
            buckets.push(BucketConfig {
                size: format!("{size}K"),
                max_free: 16,
            });
            size *= 2;
        }
        Self {
            buckets,
            soft_cap: "4M".to_string(),
            hard_cap: "8M".to_string(),
            ignore_hard_cap: false,
            thumbnail_max_dimension: default_thumbnail_max_dimension(),
            num_threads: None,
        }
    }
}
