// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Result delivery to the caller.
//!
//! Exactly one terminal callback per request: the last `on_new_result`
//! (flagged `is_last`), or `on_failure`, or `on_cancellation`. The
//! terminal gate on the request context enforces this even when natural
//! completion races a cancel.

use crate::buffer::PooledBytes;
use crate::error::FetchError;

/// Receives the outcome of a fetch request.
///
/// `on_new_result` with `result: None` is the policy-rejection path: the
/// request completed successfully but produced no data (for example a
/// thumbnail request whose dimensions exceed the supported maximum).
pub trait Consumer: Send + Sync {
    /// A result is available. `is_last` marks the terminal delivery.
    fn on_new_result(&self, result: Option<PooledBytes>, is_last: bool);

    /// The request failed. Terminal.
    fn on_failure(&self, error: FetchError);

    /// The request was cancelled. Terminal, and not a failure.
    fn on_cancellation(&self);
}
