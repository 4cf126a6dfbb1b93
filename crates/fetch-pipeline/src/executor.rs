// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Work scheduling seam for producer stages.
//!
//! Producers never spawn threads themselves; they hand closures to an
//! [`Executor`]. Production code uses [`TokioExecutor`], which runs stage
//! work on the runtime's blocking pool. Tests use [`DeferredExecutor`] to
//! hold submitted work in a queue and step it manually, which makes
//! cancel-before-run and completion/cancel races deterministic.

use std::collections::VecDeque;
use std::sync::Mutex;

/// A unit of stage work.
pub type Task = Box<dyn FnOnce() + Send>;

/// Schedules producer stage work.
pub trait Executor: Send + Sync {
    /// Submits a task for execution. Must not block on the task itself.
    fn execute(&self, task: Task);
}

/// Runs tasks on a tokio runtime's blocking thread pool.
///
/// Stage work is file I/O, so `spawn_blocking` keeps it off the async
/// worker threads.
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    /// Creates an executor bound to the given runtime handle.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates an executor bound to the current runtime.
    ///
    /// Panics outside a tokio runtime context, same as
    /// [`tokio::runtime::Handle::current`].
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: Task) {
        self.handle.spawn_blocking(task);
    }
}

/// Queues tasks and runs them only when explicitly stepped.
///
/// Nothing runs until [`run_next`](DeferredExecutor::run_next) or
/// [`run_all`](DeferredExecutor::run_all) is called, so a test can submit
/// work, cancel the request, then step the queue and observe the
/// checkpoint behavior.
#[derive(Default)]
pub struct DeferredExecutor {
    queue: Mutex<VecDeque<Task>>,
}

impl DeferredExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Task>> {
        match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.lock_queue().len()
    }

    /// Runs the oldest queued task, if any. Returns whether one ran.
    pub fn run_next(&self) -> bool {
        let task = self.lock_queue().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs queued tasks until the queue is empty, including tasks that
    /// earlier tasks submit. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Executor for DeferredExecutor {
    fn execute(&self, task: Task) {
        self.lock_queue().push_back(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_deferred_holds_until_stepped() {
        let executor = DeferredExecutor::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&ran);
        executor.execute(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(executor.pending(), 1);

        assert!(executor.run_next());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(!executor.run_next());
    }

    #[test]
    fn test_run_all_drains_resubmissions() {
        let executor = Arc::new(DeferredExecutor::new());
        let ran = Arc::new(AtomicUsize::new(0));

        let inner_exec = Arc::clone(&executor);
        let inner_ran = Arc::clone(&ran);
        executor.execute(Box::new(move || {
            let seen = Arc::clone(&inner_ran);
            inner_ran.fetch_add(1, Ordering::SeqCst);
            inner_exec.execute(Box::new(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        assert_eq!(executor.run_all(), 2);
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tokio_executor_runs_task() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let executor = TokioExecutor::current();
        executor.execute(Box::new(move || {
            let _ = tx.send(42u32);
        }));
        assert_eq!(rx.await.unwrap(), 42);
    }
}
