//! # Batch and Streaming Processing
//!
//! ## Description
//! Fan-out machinery for large books. [`BatchProcessor`] chunks the input
//! and feeds a fixed pool of tokio workers that pull batch indices from a
//! shared counter; results merge in completion order. Progress reports are
//! best-effort: when the consumer lags they are dropped, never queued.
//! Cancellation stops new batch pickup while in-flight batches finish.
//!
//! [`StreamingProcessor`] filters a live contract stream, flushing its
//! buffer on fill, on a timer tick, and once more when the input closes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use drishti_models::{OptionContract, VerticalSpread};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::chain::FilterChain;

const DEFAULT_BATCH_SIZE: usize = 1000;
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Progress report emitted while a batch run is underway.
///
/// # Fields
/// * `processed_items` - Items consumed so far
/// * `filtered_items` - Survivors accumulated so far
/// * `batch_number` - Zero-based index of the batch just finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub processed_items: usize,
    pub total_items: usize,
    pub filtered_items: usize,
    pub batch_number: usize,
    pub total_batches: usize,
}

/// Chunked fan-out over a shared [`FilterChain`].
pub struct BatchProcessor {
    chain: Arc<FilterChain>,
    batch_size: usize,
    workers: usize,
    progress: Option<mpsc::Sender<BatchProgress>>,
}

impl BatchProcessor {
    pub fn new(chain: Arc<FilterChain>) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            chain,
            batch_size: DEFAULT_BATCH_SIZE,
            workers,
            progress: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Attaches a progress channel. Reports are sent with `try_send`.
    pub fn with_progress(mut self, progress: mpsc::Sender<BatchProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Filters a contract book, fanning out when it exceeds one batch.
    pub async fn process_contracts(
        &self,
        cancel: &CancellationToken,
        contracts: Vec<OptionContract>,
    ) -> Vec<OptionContract> {
        if contracts.len() <= self.batch_size {
            return self.chain.apply_to_contracts(&contracts);
        }
        self.fan_out(cancel, contracts, |chain, slice| {
            chain.apply_to_contracts(slice)
        })
        .await
    }

    /// Filters a spread population, fanning out when it exceeds one batch.
    pub async fn process_spreads(
        &self,
        cancel: &CancellationToken,
        spreads: Vec<VerticalSpread>,
    ) -> Vec<VerticalSpread> {
        if spreads.len() <= self.batch_size {
            return self.chain.apply_to_spreads(&spreads);
        }
        self.fan_out(cancel, spreads, |chain, slice| chain.apply_to_spreads(slice))
            .await
    }

    /// Workers pull batch indices from a shared counter until the input is
    /// exhausted or cancellation is observed.
    async fn fan_out<T, F>(
        &self,
        cancel: &CancellationToken,
        items: Vec<T>,
        apply: F,
    ) -> Vec<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&FilterChain, &[T]) -> Vec<T> + Send + Sync + Copy + 'static,
    {
        let total = items.len();
        let total_batches = total.div_ceil(self.batch_size);
        let shared = Arc::new(items);
        let next_batch = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel::<(usize, usize, Vec<T>)>(self.workers);

        for _ in 0..self.workers {
            let chain = Arc::clone(&self.chain);
            let shared = Arc::clone(&shared);
            let next_batch = Arc::clone(&next_batch);
            let tx = tx.clone();
            let cancel = cancel.clone();
            let batch_size = self.batch_size;

            tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let batch = next_batch.fetch_add(1, Ordering::SeqCst);
                    let start = batch * batch_size;
                    if start >= shared.len() {
                        return;
                    }
                    let end = (start + batch_size).min(shared.len());
                    let filtered = apply(&chain, &shared[start..end]);
                    debug!(batch, items_in = end - start, items_out = filtered.len(), "batch done");
                    if tx.send((batch, end - start, filtered)).await.is_err() {
                        return;
                    }
                }
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(total / 2);
        let mut processed = 0;
        while let Some((batch_number, batch_len, filtered)) = rx.recv().await {
            processed += batch_len;
            results.extend(filtered);

            if let Some(progress) = &self.progress {
                // Best-effort: a slow consumer drops reports, never blocks us.
                let _ = progress.try_send(BatchProgress {
                    processed_items: processed,
                    total_items: total,
                    filtered_items: results.len(),
                    batch_number,
                    total_batches,
                });
            }
        }

        info!(
            total,
            surviving = results.len(),
            batches = total_batches,
            "batch filtering complete"
        );
        results
    }
}

/// Buffered filtering over a live contract stream.
pub struct StreamingProcessor {
    chain: Arc<FilterChain>,
    buffer_size: usize,
    flush_interval: Duration,
}

impl StreamingProcessor {
    pub fn new(chain: Arc<FilterChain>, buffer_size: usize) -> Self {
        Self {
            chain,
            buffer_size: buffer_size.max(1),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }

    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Spawns the stream worker and returns the filtered output stream.
    ///
    /// The buffer flushes when full and on every interval tick; when the
    /// input closes a final flush drains what is left. Cancellation winds
    /// the worker down promptly, dropping the buffered remainder.
    pub fn process_contract_stream(
        &self,
        cancel: CancellationToken,
        mut input: mpsc::Receiver<OptionContract>,
    ) -> mpsc::Receiver<OptionContract> {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let chain = Arc::clone(&self.chain);
        let buffer_size = self.buffer_size;
        let flush_interval = self.flush_interval;

        tokio::spawn(async move {
            let mut buffer: Vec<OptionContract> = Vec::with_capacity(buffer_size);
            let mut ticker = tokio::time::interval(flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    maybe = input.recv() => match maybe {
                        Some(contract) => {
                            buffer.push(contract);
                            if buffer.len() >= buffer_size
                                && !flush(&chain, &mut buffer, &tx, &cancel).await
                            {
                                return;
                            }
                        }
                        None => {
                            let _ = flush(&chain, &mut buffer, &tx, &cancel).await;
                            return;
                        }
                    },
                    _ = ticker.tick() => {
                        if !flush(&chain, &mut buffer, &tx, &cancel).await {
                            return;
                        }
                    }
                    _ = cancel.cancelled() => return,
                }
            }
        });

        rx
    }
}

/// Filters the buffer and forwards survivors; false once the downstream is
/// gone or cancellation fired.
async fn flush(
    chain: &FilterChain,
    buffer: &mut Vec<OptionContract>,
    tx: &mpsc::Sender<OptionContract>,
    cancel: &CancellationToken,
) -> bool {
    if buffer.is_empty() {
        return true;
    }
    let filtered = chain.apply_to_contracts(buffer);
    buffer.clear();

    for contract in filtered {
        tokio::select! {
            sent = tx.send(contract) => {
                if sent.is_err() {
                    return false;
                }
            }
            _ = cancel.cancelled() => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::contract_filters::DeltaFilter;
    use crate::testutil::contract;
    use std::collections::HashSet;

    fn delta_chain() -> Arc<FilterChain> {
        let config = FilterConfig {
            delta: Some(DeltaFilter {
                min_delta: 0.20,
                max_delta: 0.40,
                absolute: true,
            }),
            ..FilterConfig::default()
        };
        Arc::new(FilterChain::from_config(&config, false, false))
    }

    fn big_book(n: usize) -> Vec<OptionContract> {
        (0..n)
            .map(|i| {
                let delta = if i % 2 == 0 { 0.30 } else { 0.90 };
                contract("SPY", 400.0 + i as f64, delta, 40)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_small_input_processed_inline() {
        let processor = BatchProcessor::new(delta_chain()).with_batch_size(100);
        let book = big_book(10);

        let out = processor
            .process_contracts(&CancellationToken::new(), book)
            .await;
        assert_eq!(out.len(), 5);
    }

    #[tokio::test]
    async fn test_fan_out_matches_inline_result_set() {
        let chain = delta_chain();
        let book = big_book(500);
        let expected: HashSet<_> = chain
            .apply_to_contracts(&book)
            .iter()
            .map(OptionContract::key)
            .collect();

        let processor = BatchProcessor::new(chain).with_batch_size(64).with_workers(4);
        let out = processor
            .process_contracts(&CancellationToken::new(), book)
            .await;

        let got: HashSet<_> = out.iter().map(OptionContract::key).collect();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn test_cancelled_run_stops_early() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let processor = BatchProcessor::new(delta_chain()).with_batch_size(10).with_workers(2);
        let out = processor.process_contracts(&cancel, big_book(1000)).await;
        // Workers observe cancellation before pulling work.
        assert!(out.len() < 500);
    }

    #[tokio::test]
    async fn test_progress_reports_are_best_effort() {
        let (tx, mut rx) = mpsc::channel(1);
        let processor = BatchProcessor::new(delta_chain())
            .with_batch_size(50)
            .with_workers(2)
            .with_progress(tx);

        let out = processor
            .process_contracts(&CancellationToken::new(), big_book(400))
            .await;
        assert_eq!(out.len(), 200);

        // A one-slot channel cannot hold every report; some arrive, none block.
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert!(received >= 1);
        assert!(received <= 8);
    }

    #[tokio::test]
    async fn test_stream_flushes_on_close() {
        let processor = StreamingProcessor::new(delta_chain(), 100);
        let (tx, input) = mpsc::channel(16);
        let mut output = processor.process_contract_stream(CancellationToken::new(), input);

        for c in big_book(6) {
            tx.send(c).await.unwrap();
        }
        drop(tx);

        let mut survivors = Vec::new();
        while let Some(c) = output.recv().await {
            survivors.push(c);
        }
        assert_eq!(survivors.len(), 3);
    }

    #[tokio::test]
    async fn test_stream_flushes_when_buffer_fills() {
        let processor =
            StreamingProcessor::new(delta_chain(), 4).with_flush_interval(Duration::from_secs(60));
        let (tx, input) = mpsc::channel(16);
        let mut output = processor.process_contract_stream(CancellationToken::new(), input);

        // Buffer size 4, all passing: first flush happens without closing input.
        for i in 0..4 {
            tx.send(contract("SPY", 400.0 + i as f64, 0.30, 40)).await.unwrap();
        }

        let first = tokio::time::timeout(Duration::from_secs(5), output.recv())
            .await
            .expect("flush before timeout");
        assert!(first.is_some());
        drop(tx);
    }

    #[tokio::test]
    async fn test_stream_winds_down_on_cancel() {
        let cancel = CancellationToken::new();
        let processor = StreamingProcessor::new(delta_chain(), 100);
        let (tx, input) = mpsc::channel(16);
        let mut output = processor.process_contract_stream(cancel.clone(), input);

        tx.send(contract("SPY", 400.0, 0.30, 40)).await.unwrap();
        cancel.cancel();

        // Worker exits and the output closes; anything flushed by a racing
        // tick is drained on the way.
        let mut closed = false;
        for _ in 0..4 {
            match tokio::time::timeout(Duration::from_secs(5), output.recv()).await {
                Ok(None) => {
                    closed = true;
                    break;
                }
                Ok(Some(_)) => continue,
                Err(_) => break,
            }
        }
        assert!(closed);
        drop(tx);
    }
}
