// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The ultimate producer: reads a local source into a pooled buffer.
//!
//! Cancellation checkpoints sit at the two defined points: before the
//! source is opened and before the result is delivered. A cancel that
//! lands between checkpoints wastes at most one read; it never corrupts
//! state and never produces a second terminal callback.

use crate::buffer::PooledBufferFactory;
use crate::consumer::Consumer;
use crate::context::{ProducerContext, TerminalOutcome};
use crate::executor::Executor;
use crate::producer::Producer;
use crate::source::SourceOpener;
use std::sync::Arc;

/// Reads the request's source from local storage into pool-backed bytes.
///
/// This is the last stage of every chain: it is the one that reports
/// `on_ultimate_producer_reached` (except for cancelled requests, which
/// never report it).
pub struct LocalFetchProducer {
    factory: PooledBufferFactory,
    opener: Arc<dyn SourceOpener>,
    executor: Arc<dyn Executor>,
}

impl LocalFetchProducer {
    pub const NAME: &'static str = "LocalFetchProducer";

    pub fn new(
        factory: PooledBufferFactory,
        opener: Arc<dyn SourceOpener>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            factory,
            opener,
            executor,
        }
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

impl Producer for LocalFetchProducer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn produce_results(&self, consumer: Arc<dyn Consumer>, context: Arc<ProducerContext>) {
        context
            .listener()
            .on_producer_start(context.request_id(), Self::NAME);
        context.mark_running();

        // A cancel that lands while the task is still queued delivers the
        // terminal callback from the cancelling thread instead of waiting
        // for the executor to reach the task.
        {
            let consumer = Arc::clone(&consumer);
            let context_for_cb = Arc::clone(&context);
            context.on_cancellation_requested(Box::new(move || {
                Self::deliver_cancellation(&consumer, &context_for_cb);
            }));
        }

        let factory = self.factory.clone();
        let opener = Arc::clone(&self.opener);
        self.executor.execute(Box::new(move || {
            // Checkpoint: before opening the source.
            if context.is_cancelled() {
                Self::deliver_cancellation(&consumer, &context);
                return;
            }

            let locator = context.request().source().display().to_string();
            let result = opener.open(context.request().source()).and_then(|stream| {
                let declared_len = stream.declared_len();
                let mut reader = stream.into_reader();
                factory.from_reader(&mut reader, declared_len, &locator)
            });

            // Checkpoint: before delivering.
            if context.is_cancelled() {
                Self::deliver_cancellation(&consumer, &context);
                return;
            }

            match result {
                Ok(bytes) => {
                    if context.try_finish(TerminalOutcome::Succeeded) {
                        let listener = context.listener();
                        listener.on_producer_finish_with_success(context.request_id(), Self::NAME);
                        listener.on_ultimate_producer_reached(
                            context.request_id(),
                            Self::NAME,
                            true,
                        );
                        consumer.on_new_result(Some(bytes), true);
                    }
                    // A lost race drops `bytes`, returning the chunk to
                    // the pool.
                }
                Err(err) => {
                    if context.try_finish(TerminalOutcome::Failed) {
                        tracing::warn!(
                            request_id = %context.request_id(),
                            error = %err,
                            "local fetch failed"
                        );
                        let listener = context.listener();
                        listener.on_producer_finish_with_failure(
                            context.request_id(),
                            Self::NAME,
                            &err,
                        );
                        listener.on_ultimate_producer_reached(
                            context.request_id(),
                            Self::NAME,
                            false,
                        );
                        consumer.on_failure(err);
                    }
                }
            }
        }));
    }
}
