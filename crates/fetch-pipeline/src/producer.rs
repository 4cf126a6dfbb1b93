// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The producer abstraction.
//!
//! A pipeline is a chain of producers; each stage either produces the
//! result itself or delegates to the next stage. Stages communicate
//! through the shared [`ProducerContext`](crate::ProducerContext) and
//! deliver outcomes to the caller's [`Consumer`](crate::Consumer) through
//! the terminal gate.

use crate::consumer::Consumer;
use crate::context::ProducerContext;
use std::sync::Arc;

/// One stage of a fetch pipeline.
pub trait Producer: Send + Sync {
    /// Stable stage name, used in listener callbacks and logs.
    fn name(&self) -> &'static str;

    /// Starts this stage for the given request.
    ///
    /// Must return promptly: long-running work goes through the stage's
    /// executor. Whatever happens afterwards, the request's terminal gate
    /// guarantees the consumer sees exactly one terminal callback.
    fn produce_results(&self, consumer: Arc<dyn Consumer>, context: Arc<ProducerContext>);
}
