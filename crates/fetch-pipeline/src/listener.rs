// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Observability hooks for the producer chain.
//!
//! A [`ProducerListener`] sees the lifecycle of every stage of a request:
//! exactly one `on_producer_start` per started stage, exactly one of the
//! three `on_producer_finish_*` callbacks for it, and at most one
//! `on_ultimate_producer_reached` per request. The ultimate notification
//! is not delivered for cancelled requests.

use crate::error::FetchError;

/// Lifecycle observer for producer stages.
///
/// Implementations must be cheap and non-blocking; callbacks may run on
/// worker threads or on the caller thread that issued a cancel.
pub trait ProducerListener: Send + Sync {
    /// A stage began work for the request.
    fn on_producer_start(&self, request_id: &str, producer_name: &str);

    /// The stage finished by producing its result.
    fn on_producer_finish_with_success(&self, request_id: &str, producer_name: &str);

    /// The stage finished with an error.
    fn on_producer_finish_with_failure(
        &self,
        request_id: &str,
        producer_name: &str,
        error: &FetchError,
    );

    /// The stage finished because the request was cancelled.
    fn on_producer_finish_with_cancellation(&self, request_id: &str, producer_name: &str);

    /// The stage that actually sourced the data was reached.
    ///
    /// `success` reports whether that ultimate stage produced a result.
    /// Not called for cancelled requests.
    fn on_ultimate_producer_reached(&self, request_id: &str, producer_name: &str, success: bool);
}

/// A listener that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl ProducerListener for NullListener {
    fn on_producer_start(&self, _request_id: &str, _producer_name: &str) {}
    fn on_producer_finish_with_success(&self, _request_id: &str, _producer_name: &str) {}
    fn on_producer_finish_with_failure(
        &self,
        _request_id: &str,
        _producer_name: &str,
        _error: &FetchError,
    ) {
    }
    fn on_producer_finish_with_cancellation(&self, _request_id: &str, _producer_name: &str) {}
    fn on_ultimate_producer_reached(
        &self,
        _request_id: &str,
        _producer_name: &str,
        _success: bool,
    ) {
    }
}

/// A listener that logs stage transitions through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl ProducerListener for TracingListener {
    fn on_producer_start(&self, request_id: &str, producer_name: &str) {
        tracing::debug!(request_id, producer = producer_name, "producer start");
    }

    fn on_producer_finish_with_success(&self, request_id: &str, producer_name: &str) {
        tracing::debug!(request_id, producer = producer_name, "producer success");
    }

    fn on_producer_finish_with_failure(
        &self,
        request_id: &str,
        producer_name: &str,
        error: &FetchError,
    ) {
        tracing::warn!(
            request_id,
            producer = producer_name,
            error = %error,
            "producer failure"
        );
    }

    fn on_producer_finish_with_cancellation(&self, request_id: &str, producer_name: &str) {
        tracing::debug!(request_id, producer = producer_name, "producer cancelled");
    }

    fn on_ultimate_producer_reached(&self, request_id: &str, producer_name: &str, success: bool) {
        tracing::debug!(
            request_id,
            producer = producer_name,
            success,
            "ultimate producer reached"
        );
    }
}
