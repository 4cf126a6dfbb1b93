// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Thread handoff stage.
//!
//! Moves the rest of the chain off the caller thread: the wrapped
//! producer's `produce_results` runs on the executor, so the caller's
//! `fetch` returns as soon as the work is queued. A cancel while the
//! handoff is still queued resolves the request from the cancelling
//! thread and the queued task becomes a no-op.

use crate::consumer::Consumer;
use crate::context::{ProducerContext, TerminalOutcome};
use crate::executor::Executor;
use crate::producer::Producer;
use std::sync::Arc;

/// Re-schedules the wrapped producer onto an executor.
pub struct HandoffProducer {
    inner: Arc<dyn Producer>,
    executor: Arc<dyn Executor>,
}

impl HandoffProducer {
    pub const NAME: &'static str = "HandoffProducer";

    pub fn new(inner: Arc<dyn Producer>, executor: Arc<dyn Executor>) -> Self {
        Self { inner, executor }
    }

    fn deliver_cancellation(consumer: &Arc<dyn Consumer>, context: &Arc<ProducerContext>) {
        if context.try_finish(TerminalOutcome::Cancelled) {
            context
                .listener()
                .on_producer_finish_with_cancellation(context.request_id(), Self::NAME);
            consumer.on_cancellation();
        }
    }
}

impl Producer for HandoffProducer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn produce_results(&self, consumer: Arc<dyn Consumer>, context: Arc<ProducerContext>) {
        context
            .listener()
            .on_producer_start(context.request_id(), Self::NAME);
        context.mark_running();

        {
            let consumer = Arc::clone(&consumer);
            let context_for_cb = Arc::clone(&context);
            context.on_cancellation_requested(Box::new(move || {
                Self::deliver_cancellation(&consumer, &context_for_cb);
            }));
        }

        let inner = Arc::clone(&self.inner);
        self.executor.execute(Box::new(move || {
            if context.state().is_terminal() {
                return;
            }
            context
                .listener()
                .on_producer_finish_with_success(context.request_id(), Self::NAME);
            inner.produce_results(consumer, context);
        }));
    }
}
