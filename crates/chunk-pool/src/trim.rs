// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory-pressure trimming: levels, the trimmable contract, and the
//! registry that broadcasts pressure notifications.
//!
//! The registry is an explicit dependency, constructed by the host
//! process and handed to each pool, rather than an ambient global.
//! Registrations are weak, so dropping a pool deregisters it.

use std::sync::{Mutex, Weak};

/// Process-wide memory-pressure level reported by an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum MemoryPressureLevel {
    /// No pressure; notifications at this level are no-ops.
    None,
    /// Reclaim opportunistically, keep warm free lists.
    Moderate,
    /// Reclaim everything that is not in use.
    Critical,
}

/// How aggressively a trim pass reclaims free-list memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimAggressiveness {
    /// Shrink each bucket's free list toward its low-water mark.
    Soft,
    /// Empty all free lists.
    Hard,
}

impl MemoryPressureLevel {
    /// Maps a pressure level to a trim aggressiveness, or `None` when no
    /// trimming is called for.
    pub fn aggressiveness(self) -> Option<TrimAggressiveness> {
        match self {
            MemoryPressureLevel::None => None,
            MemoryPressureLevel::Moderate => Some(TrimAggressiveness::Soft),
            MemoryPressureLevel::Critical => Some(TrimAggressiveness::Hard),
        }
    }
}

/// Something that can shed memory when the process comes under pressure.
pub trait Trimmable: Send + Sync {
    /// Handles a pressure notification. Must be safe to call at any time,
    /// from any thread, concurrent with normal use of the receiver.
    fn trim(&self, level: MemoryPressureLevel);
}

/// Broadcasts memory-pressure notifications to registered trimmables.
///
/// Holds weak references: an entry whose target has been dropped is pruned
/// on the next [`notify`](Self::notify), so disposal of a pool is all the
/// deregistration it needs.
#[derive(Default)]
pub struct TrimRegistry {
    entries: Mutex<Vec<Weak<dyn Trimmable>>>,
}

impl TrimRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a trimmable for future notifications.
    pub fn register(&self, trimmable: Weak<dyn Trimmable>) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(trimmable);
        tracing::debug!("trim registry: {} registrations", entries.len());
    }

    /// Notifies every live registration of `level`, pruning dead entries.
    pub fn notify(&self, level: MemoryPressureLevel) {
        let live: Vec<_> = {
            let mut entries = match self.entries.lock() {
                Ok(entries) => entries,
                Err(poisoned) => poisoned.into_inner(),
            };
            entries.retain(|weak| weak.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };

        if level != MemoryPressureLevel::None {
            tracing::info!(?level, targets = live.len(), "memory pressure notification");
        }
        // Dispatch outside the registry lock so a trim cannot deadlock
        // against a concurrent register call from the same target.
        for trimmable in live {
            trimmable.trim(level);
        }
    }

    /// Returns the number of live registrations.
    pub fn len(&self) -> usize {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.retain(|weak| weak.strong_count() > 0);
        entries.len()
    }

    /// Returns `true` if there are no live registrations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTrimmable {
        calls: AtomicUsize,
    }

    impl Trimmable for CountingTrimmable {
        fn trim(&self, _level: MemoryPressureLevel) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_level_to_aggressiveness() {
        assert_eq!(MemoryPressureLevel::None.aggressiveness(), None);
        assert_eq!(
            MemoryPressureLevel::Moderate.aggressiveness(),
            Some(TrimAggressiveness::Soft)
        );
        assert_eq!(
            MemoryPressureLevel::Critical.aggressiveness(),
            Some(TrimAggressiveness::Hard)
        );
    }

    #[test]
    fn test_notify_reaches_registrations() {
        let registry = TrimRegistry::new();
        let target = Arc::new(CountingTrimmable {
            calls: AtomicUsize::new(0),
        });
        registry.register(Arc::downgrade(&target) as Weak<dyn Trimmable>);

        registry.notify(MemoryPressureLevel::Moderate);
        registry.notify(MemoryPressureLevel::Critical);
        assert_eq!(target.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dropped_target_is_pruned() {
        let registry = TrimRegistry::new();
        let target = Arc::new(CountingTrimmable {
            calls: AtomicUsize::new(0),
        });
        registry.register(Arc::downgrade(&target) as Weak<dyn Trimmable>);
        assert_eq!(registry.len(), 1);

        drop(target);
        registry.notify(MemoryPressureLevel::Critical);
        assert!(registry.is_empty());
    }
}
