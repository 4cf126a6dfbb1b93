// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-request shared state threaded through the producer chain.
//!
//! A [`ProducerContext`] carries exactly two pieces of mutable state, with
//! documented read/write contracts:
//!
//! 1. **Cancellation flag**: an `AtomicBool` the caller may set from any
//!    thread at any time. Stages read it at defined checkpoints with
//!    `SeqCst`, so a checkpoint never misses an earlier cancel.
//! 2. **Request state machine**: `PENDING -> RUNNING -> {SUCCEEDED, FAILED,
//!    CANCELLED}`. Terminal states are absorbing. [`try_finish`] performs
//!    the transition with a compare-exchange: the first terminal outcome
//!    wins, every later attempt returns `false` and must no-op. This is
//!    what makes terminal delivery exactly-once under races between
//!    natural completion and cancellation.
//!
//! [`try_finish`]: ProducerContext::try_finish

use crate::listener::ProducerListener;
use crate::request::FetchRequest;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// Lifecycle of a single fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestState {
    /// Created, not yet scheduled.
    Pending = 0,
    /// Work is scheduled or in flight.
    Running = 1,
    /// Terminal: result delivered.
    Succeeded = 2,
    /// Terminal: failure delivered.
    Failed = 3,
    /// Terminal: cancellation delivered.
    Cancelled = 4,
}

impl RequestState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RequestState::Pending,
            1 => RequestState::Running,
            2 => RequestState::Succeeded,
            3 => RequestState::Failed,
            _ => RequestState::Cancelled,
        }
    }

    /// Returns `true` for an absorbing state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Succeeded | RequestState::Failed | RequestState::Cancelled
        )
    }
}

/// The three possible terminal outcomes of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

impl TerminalOutcome {
    fn as_state(self) -> RequestState {
        match self {
            TerminalOutcome::Succeeded => RequestState::Succeeded,
            TerminalOutcome::Failed => RequestState::Failed,
            TerminalOutcome::Cancelled => RequestState::Cancelled,
        }
    }
}

/// Shared per-request state: one per [`FetchRequest`], threaded through
/// every stage of the producer chain.
pub struct ProducerContext {
    request: FetchRequest,
    request_id: String,
    listener: Arc<dyn ProducerListener>,
    cancelled: AtomicBool,
    state: AtomicU8,
    /// Callbacks run synchronously by `cancel()`. Stages register one so a
    /// cancel that lands while their work is still queued produces its
    /// terminal delivery promptly instead of waiting for the executor.
    cancel_callbacks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl ProducerContext {
    /// Creates the context for one request.
    pub fn new(
        request: FetchRequest,
        request_id: impl Into<String>,
        listener: Arc<dyn ProducerListener>,
    ) -> Arc<Self> {
        Arc::new(Self {
            request,
            request_id: request_id.into(),
            listener,
            cancelled: AtomicBool::new(false),
            state: AtomicU8::new(RequestState::Pending as u8),
            cancel_callbacks: Mutex::new(Vec::new()),
        })
    }

    /// Returns the immutable request descriptor.
    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    /// Returns the request identifier used in listener callbacks.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the listener for this request.
    pub fn listener(&self) -> &Arc<dyn ProducerListener> {
        &self.listener
    }

    /// Returns the latest value of the cancellation flag.
    ///
    /// Checkpoint contract: a read here observes every `cancel()` that
    /// happened-before it; there are no stale misses.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Requests cooperative cancellation.
    ///
    /// Callable from any thread at any time; idempotent. In-flight I/O is
    /// not preempted; stages observe the flag at their checkpoints. Any
    /// registered cancellation callbacks run synchronously, exactly once.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(request_id = %self.request_id, "cancellation requested");
        let callbacks = {
            let mut slot = match self.cancel_callbacks.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::take(&mut *slot)
        };
        for callback in callbacks {
            callback();
        }
    }

    /// Registers a callback to run when cancellation is requested.
    ///
    /// If the request is already cancelled, the callback runs immediately
    /// on the calling thread.
    pub fn on_cancellation_requested(&self, callback: Box<dyn FnOnce() + Send>) {
        let callback = {
            let mut slot = match self.cancel_callbacks.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Checked under the lock so a concurrent cancel() either sees
            // this callback in the vector or we run it here, never both
            // and never neither.
            if self.is_cancelled() {
                callback
            } else {
                slot.push(callback);
                return;
            }
        };
        callback();
    }

    /// Marks the request as running. No-op if it already left `Pending`.
    pub fn mark_running(&self) {
        let _ = self.state.compare_exchange(
            RequestState::Pending as u8,
            RequestState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Attempts the terminal transition to `outcome`.
    ///
    /// Returns `true` exactly once per request, for the first caller to
    /// reach a terminal state. All later attempts (any outcome) return
    /// `false`, and the caller must deliver nothing.
    pub fn try_finish(&self, outcome: TerminalOutcome) -> bool {
        let target = outcome.as_state() as u8;
        let mut current = self.state.load(Ordering::SeqCst);
        loop {
            if RequestState::from_u8(current).is_terminal() {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                target,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    tracing::debug!(
                        request_id = %self.request_id,
                        ?outcome,
                        "terminal transition"
                    );
                    return true;
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Returns the current request state.
    pub fn state(&self) -> RequestState {
        RequestState::from_u8(self.state.load(Ordering::SeqCst))
    }
}

impl std::fmt::Debug for ProducerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerContext")
            .field("request_id", &self.request_id)
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::NullListener;
    use std::sync::atomic::AtomicUsize;

    fn context() -> Arc<ProducerContext> {
        ProducerContext::new(
            FetchRequest::new("/tmp/x"),
            "req-1",
            Arc::new(NullListener),
        )
    }

    #[test]
    fn test_initial_state() {
        let ctx = context();
        assert_eq!(ctx.state(), RequestState::Pending);
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_first_terminal_wins() {
        let ctx = context();
        ctx.mark_running();
        assert!(ctx.try_finish(TerminalOutcome::Succeeded));
        // The losing side of the race must see `false` for any outcome.
        assert!(!ctx.try_finish(TerminalOutcome::Cancelled));
        assert!(!ctx.try_finish(TerminalOutcome::Failed));
        assert_eq!(ctx.state(), RequestState::Succeeded);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        ctx.on_cancellation_requested(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        ctx.cancel();
        ctx.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_after_cancel_runs_immediately() {
        let ctx = context();
        ctx.cancel();

        let ran = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&ran);
        ctx.on_cancellation_requested(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_terminal_race_single_winner() {
        let ctx = context();
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = [
            TerminalOutcome::Succeeded,
            TerminalOutcome::Failed,
            TerminalOutcome::Cancelled,
            TerminalOutcome::Succeeded,
        ]
        .into_iter()
        .map(|outcome| {
            let ctx = Arc::clone(&ctx);
            let wins = Arc::clone(&wins);
            std::thread::spawn(move || {
                if ctx.try_finish(outcome) {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert!(ctx.state().is_terminal());
    }
}
