// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pressure classification and the polling loop.
//!
//! The monitor samples system memory, classifies it against two
//! utilisation thresholds, and notifies the trim registry when the level
//! *changes*. Steady pressure does not re-notify; pools already trimmed
//! at that level and repeated notifications would only churn free lists.

use crate::meminfo::MemInfo;
use crate::MonitorError;
use chunk_pool::{MemoryPressureLevel, TrimRegistry};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Utilisation fractions at which pressure levels begin.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PressureThresholds {
    /// Utilisation at or above this is at least moderate pressure.
    pub moderate: f64,
    /// Utilisation at or above this is critical pressure.
    pub critical: f64,
}

impl PressureThresholds {
    /// Creates validated thresholds: `0 < moderate < critical <= 1`.
    pub fn new(moderate: f64, critical: f64) -> Result<Self, MonitorError> {
        if !(moderate > 0.0 && moderate < critical && critical <= 1.0) {
            return Err(MonitorError::InvalidThresholds(format!(
                "need 0 < moderate < critical <= 1, got {moderate} / {critical}"
            )));
        }
        Ok(Self { moderate, critical })
    }

    /// Classifies a utilisation fraction.
    pub fn level_for(&self, utilisation: f64) -> MemoryPressureLevel {
        if utilisation >= self.critical {
            MemoryPressureLevel::Critical
        } else if utilisation >= self.moderate {
            MemoryPressureLevel::Moderate
        } else {
            MemoryPressureLevel::None
        }
    }
}

impl Default for PressureThresholds {
    fn default() -> Self {
        Self {
            moderate: 0.75,
            critical: 0.90,
        }
    }
}

/// Polls system memory and drives registered pools through the registry.
pub struct PressureMonitor {
    registry: Arc<TrimRegistry>,
    thresholds: PressureThresholds,
    meminfo_path: PathBuf,
    last_level: Mutex<MemoryPressureLevel>,
}

impl PressureMonitor {
    /// Creates a monitor over the default `/proc/meminfo` source.
    pub fn new(registry: Arc<TrimRegistry>, thresholds: PressureThresholds) -> Self {
        Self::with_source(registry, thresholds, Path::new("/proc/meminfo"))
    }

    /// Creates a monitor sampling an explicit meminfo-formatted file.
    pub fn with_source(
        registry: Arc<TrimRegistry>,
        thresholds: PressureThresholds,
        meminfo_path: &Path,
    ) -> Self {
        Self {
            registry,
            thresholds,
            meminfo_path: meminfo_path.to_path_buf(),
            last_level: Mutex::new(MemoryPressureLevel::None),
        }
    }

    /// Samples once, classifies, and notifies the registry on a level
    /// change. Returns the classified level.
    pub fn poll_once(&self) -> Result<MemoryPressureLevel, MonitorError> {
        let info = MemInfo::read_from(&self.meminfo_path)?;
        let level = self.thresholds.level_for(info.utilisation());

        let changed = {
            let mut last = match self.last_level.lock() {
                Ok(last) => last,
                Err(poisoned) => poisoned.into_inner(),
            };
            let changed = *last != level;
            *last = level;
            changed
        };

        if changed {
            tracing::info!(
                ?level,
                utilisation = format_args!("{:.2}", info.utilisation()),
                available_mb = info.available_mb(),
                "memory pressure level changed"
            );
            self.registry.notify(level);
        }
        Ok(level)
    }

    /// Polls forever at `interval`. Sampling errors are logged and the
    /// loop keeps going; a transient procfs hiccup must not kill the
    /// monitor.
    pub async fn run(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.poll_once() {
                tracing::warn!(error = %err, "pressure sample failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunk_pool::Trimmable;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingTrimmable {
        notifications: Mutex<Vec<MemoryPressureLevel>>,
        count: AtomicUsize,
    }

    impl RecordingTrimmable {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                notifications: Mutex::new(Vec::new()),
                count: AtomicUsize::new(0),
            })
        }
    }

    impl Trimmable for RecordingTrimmable {
        fn trim(&self, level: MemoryPressureLevel) {
            self.notifications.lock().unwrap().push(level);
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn meminfo_fixture(total_kb: u64, available_kb: u64) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            format!("MemTotal: {total_kb} kB\nMemAvailable: {available_kb} kB\n"),
        )
        .unwrap();
        file
    }

    #[test]
    fn test_threshold_classification() {
        let t = PressureThresholds::default();
        assert_eq!(t.level_for(0.10), MemoryPressureLevel::None);
        assert_eq!(t.level_for(0.75), MemoryPressureLevel::Moderate);
        assert_eq!(t.level_for(0.89), MemoryPressureLevel::Moderate);
        assert_eq!(t.level_for(0.90), MemoryPressureLevel::Critical);
        assert_eq!(t.level_for(1.0), MemoryPressureLevel::Critical);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert!(PressureThresholds::new(0.9, 0.7).is_err());
        assert!(PressureThresholds::new(0.0, 0.9).is_err());
        assert!(PressureThresholds::new(0.5, 1.5).is_err());
    }

    #[test]
    fn test_poll_notifies_on_level_change_only() {
        let registry = Arc::new(TrimRegistry::new());
        let trimmable = RecordingTrimmable::new();
        registry.register(Arc::downgrade(&trimmable) as _);

        // 95% utilisation: critical.
        let fixture = meminfo_fixture(1000, 50);
        let monitor = PressureMonitor::with_source(
            Arc::clone(&registry),
            PressureThresholds::default(),
            fixture.path(),
        );

        assert_eq!(monitor.poll_once().unwrap(), MemoryPressureLevel::Critical);
        assert_eq!(trimmable.count.load(Ordering::SeqCst), 1);

        // Same level again: no second notification.
        assert_eq!(monitor.poll_once().unwrap(), MemoryPressureLevel::Critical);
        assert_eq!(trimmable.count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_recovery_notifies_level_none() {
        let registry = Arc::new(TrimRegistry::new());
        let trimmable = RecordingTrimmable::new();
        registry.register(Arc::downgrade(&trimmable) as _);

        let fixture = meminfo_fixture(1000, 50);
        let monitor = PressureMonitor::with_source(
            Arc::clone(&registry),
            PressureThresholds::default(),
            fixture.path(),
        );
        monitor.poll_once().unwrap();

        // Pressure clears: 20% utilisation.
        std::fs::write(fixture.path(), "MemTotal: 1000 kB\nMemAvailable: 800 kB\n").unwrap();
        assert_eq!(monitor.poll_once().unwrap(), MemoryPressureLevel::None);

        let seen = trimmable.notifications.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![MemoryPressureLevel::Critical, MemoryPressureLevel::None]
        );
    }

    #[test]
    fn test_idle_system_never_notifies() {
        let registry = Arc::new(TrimRegistry::new());
        let trimmable = RecordingTrimmable::new();
        registry.register(Arc::downgrade(&trimmable) as _);

        let fixture = meminfo_fixture(1000, 800);
        let monitor = PressureMonitor::with_source(
            Arc::clone(&registry),
            PressureThresholds::default(),
            fixture.path(),
        );
        assert_eq!(monitor.poll_once().unwrap(), MemoryPressureLevel::None);
        assert_eq!(trimmable.count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_source_surfaces_error() {
        let registry = Arc::new(TrimRegistry::new());
        let monitor = PressureMonitor::with_source(
            registry,
            PressureThresholds::default(),
            Path::new("/nonexistent/meminfo"),
        );
        assert!(matches!(
            monitor.poll_once(),
            Err(MonitorError::ReadError { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_on_interval() {
        let registry = Arc::new(TrimRegistry::new());
        let trimmable = RecordingTrimmable::new();
        registry.register(Arc::downgrade(&trimmable) as _);

        let fixture = meminfo_fixture(1000, 50);
        let monitor = Arc::new(PressureMonitor::with_source(
            Arc::clone(&registry),
            PressureThresholds::default(),
            fixture.path(),
        ));

        let task = {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move {
                monitor.run(Duration::from_secs(1)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(1500)).await;
        task.abort();

        assert_eq!(trimmable.count.load(Ordering::SeqCst), 1);
    }
}
