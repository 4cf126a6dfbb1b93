// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fetch request descriptors.
//!
//! A [`FetchRequest`] is created once per external fetch call and is
//! immutable; the mutable per-request state (cancellation, terminal
//! outcome) lives on the [`ProducerContext`](crate::ProducerContext).

use std::path::{Path, PathBuf};

/// Requested output dimensions, used by thumbnail policy gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResizeOptions {
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
}

impl ResizeOptions {
    /// Creates resize options for the given target dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the larger of the two requested dimensions.
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// Scheduling priority for a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// An immutable fetch descriptor: where to read from and what the caller
/// wants back.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    source: PathBuf,
    resize: Option<ResizeOptions>,
    priority: Priority,
}

impl FetchRequest {
    /// Creates a request for the given source locator.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            resize: None,
            priority: Priority::default(),
        }
    }

    /// Sets the requested output dimensions.
    pub fn with_resize(mut self, resize: ResizeOptions) -> Self {
        self.resize = Some(resize);
        self
    }

    /// Sets the scheduling priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Returns the source locator.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the requested output dimensions, if any.
    pub fn resize(&self) -> Option<ResizeOptions> {
        self.resize
    }

    /// Returns the scheduling priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = FetchRequest::new("/tmp/image.jpg");
        assert_eq!(req.source(), Path::new("/tmp/image.jpg"));
        assert!(req.resize().is_none());
        assert_eq!(req.priority(), Priority::Medium);
    }

    #[test]
    fn test_builder_style() {
        let req = FetchRequest::new("/tmp/image.jpg")
            .with_resize(ResizeOptions::new(512, 384))
            .with_priority(Priority::High);
        assert_eq!(req.resize().unwrap().max_dimension(), 512);
        assert_eq!(req.priority(), Priority::High);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }
}
