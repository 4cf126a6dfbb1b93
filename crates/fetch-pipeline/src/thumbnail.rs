// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Thumbnail policy gate.
//!
//! A thumbnail stage can only satisfy requests up to a fixed maximum
//! dimension. Requests outside that bound are answered immediately with
//! an empty (None) result, on the caller thread, without touching the
//! pool or the source. In-policy requests delegate to the wrapped fetch
//! stage.

use crate::consumer::Consumer;
use crate::context::{ProducerContext, TerminalOutcome};
use crate::producer::Producer;
use std::sync::Arc;

/// Largest width or height a thumbnail request may ask for.
pub const THUMBNAIL_MAX_DIMENSION: u32 = 512;

/// Gates thumbnail requests by dimension, delegating in-policy requests
/// to the wrapped producer.
pub struct LocalThumbnailFetchProducer {
    inner: Arc<dyn Producer>,
    max_dimension: u32,
}

impl LocalThumbnailFetchProducer {
    pub const NAME: &'static str = "LocalThumbnailFetchProducer";

    /// Wraps `inner` with the default dimension bound.
    pub fn new(inner: Arc<dyn Producer>) -> Self {
        Self::with_max_dimension(inner, THUMBNAIL_MAX_DIMENSION)
    }

    /// Wraps `inner` with an explicit dimension bound.
    pub fn with_max_dimension(inner: Arc<dyn Producer>, max_dimension: u32) -> Self {
        Self {
            inner,
            max_dimension,
        }
    }

    /// Policy check: a request is in-policy only if it declares target
    /// dimensions and the larger one fits the bound. An unconstrained
    /// request cannot be satisfied by a bounded thumbnail.
    fn can_satisfy(&self, context: &ProducerContext) -> bool {
        match context.request().resize() {
            Some(resize) => resize.max_dimension() <= self.max_dimension,
            None => false,
        }
    }
}

impl Producer for LocalThumbnailFetchProducer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn produce_results(&self, consumer: Arc<dyn Consumer>, context: Arc<ProducerContext>) {
        context
            .listener()
            .on_producer_start(context.request_id(), Self::NAME);

        if !self.can_satisfy(&context) {
            // Fast rejection path: terminal None result, no I/O, no pool
            // traffic, delivered synchronously.
            context.mark_running();
            if context.try_finish(TerminalOutcome::Succeeded) {
                tracing::debug!(
                    request_id = %context.request_id(),
                    resize = ?context.request().resize(),
                    max_dimension = self.max_dimension,
                    "thumbnail request out of policy"
                );
                let listener = context.listener();
                listener.on_producer_finish_with_success(context.request_id(), Self::NAME);
                listener.on_ultimate_producer_reached(context.request_id(), Self::NAME, false);
                consumer.on_new_result(None, true);
            }
            return;
        }

        context
            .listener()
            .on_producer_finish_with_success(context.request_id(), Self::NAME);
        self.inner.produce_results(consumer, context);
    }
}
