// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `poolfetch fetch` command: run one request through the full chain.
//!
//! Builds the production assembly: trim registry, pool, tokio-backed
//! executor, handoff → (optional thumbnail gate) → local fetch; then
//! waits for the single terminal callback and prints the pool summary.

use anyhow::Context;
use chunk_pool::{ChunkPool, TrimRegistry};
use fetch_pipeline::{
    Consumer, Executor, FetchError, FetchRequest, FsSourceOpener, HandoffProducer,
    LocalFetchProducer, LocalThumbnailFetchProducer, PipelineConfig, PooledBufferFactory,
    PooledBytes, Producer, ProducerContext, ResizeOptions, TokioExecutor, TracingListener,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Terminal outcome carried back to the waiting command.
enum Outcome {
    Result(Option<usize>),
    Failure(String),
    Cancelled,
}

/// Bridges the callback contract to an awaitable channel.
struct OneshotConsumer {
    tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl OneshotConsumer {
    fn new() -> (Arc<Self>, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                tx: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }

    fn send(&self, outcome: Outcome) {
        // The terminal gate upstream guarantees a single delivery; the
        // Option is just the channel's single-use shape.
        if let Some(tx) = self.tx.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = tx.send(outcome);
        }
    }
}

impl Consumer for OneshotConsumer {
    fn on_new_result(&self, result: Option<PooledBytes>, _is_last: bool) {
        self.send(Outcome::Result(result.map(|bytes| bytes.size())));
    }

    fn on_failure(&self, error: FetchError) {
        self.send(Outcome::Failure(error.to_string()));
    }

    fn on_cancellation(&self) {
        self.send(Outcome::Cancelled);
    }
}

fn parse_dimensions(input: &str) -> anyhow::Result<ResizeOptions> {
    let (width, height) = input
        .split_once(['x', 'X'])
        .with_context(|| format!("expected WxH, got '{input}'"))?;
    Ok(ResizeOptions::new(
        width.trim().parse().context("invalid width")?,
        height.trim().parse().context("invalid height")?,
    ))
}

pub async fn execute(
    source: PathBuf,
    thumbnail: Option<String>,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => PipelineConfig::from_file(&path)?,
        None => PipelineConfig::default(),
    };

    let registry = Arc::new(TrimRegistry::new());
    let pool = ChunkPool::with_registry(config.to_pool_params()?, &registry);
    let executor: Arc<dyn Executor> = Arc::new(TokioExecutor::current());

    let fetch_stage = Arc::new(LocalFetchProducer::new(
        PooledBufferFactory::new(pool.clone()),
        Arc::new(FsSourceOpener),
        Arc::clone(&executor),
    ));
    let downstream: Arc<dyn Producer> = if thumbnail.is_some() {
        Arc::new(LocalThumbnailFetchProducer::with_max_dimension(
            fetch_stage,
            config.thumbnail_max_dimension,
        ))
    } else {
        fetch_stage
    };
    let chain = HandoffProducer::new(downstream, Arc::clone(&executor));

    let mut request = FetchRequest::new(source.clone());
    if let Some(dims) = &thumbnail {
        request = request.with_resize(parse_dimensions(dims)?);
    }
    let context = ProducerContext::new(request, "cli-1", Arc::new(TracingListener));

    let (consumer, done) = OneshotConsumer::new();
    chain.produce_results(consumer, context);

    match done.await.context("pipeline dropped without delivering")? {
        Outcome::Result(Some(size)) => {
            println!("Fetched {} ({size} bytes)", source.display());
        }
        Outcome::Result(None) => {
            println!(
                "No result: request is outside thumbnail policy \
                 (max dimension {})",
                config.thumbnail_max_dimension
            );
        }
        Outcome::Failure(message) => anyhow::bail!("fetch failed: {message}"),
        Outcome::Cancelled => println!("Fetch cancelled"),
    }

    println!("{}", pool.snapshot().summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimensions() {
        let dims = parse_dimensions("512x384").unwrap();
        assert_eq!(dims.width, 512);
        assert_eq!(dims.height, 384);
        assert!(parse_dimensions("512").is_err());
        assert!(parse_dimensions("ax384").is_err());
    }
}
