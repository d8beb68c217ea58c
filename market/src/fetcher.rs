//! Batched Concurrent Fetcher
//!
//! Turns a set of identifiers into [`SignalResult`]s while staying under
//! provider rate limits:
//!
//! ```text
//! identifiers ─ dedup ─ batches of `batch_size`
//!    batch 1: ≤ max_parallel in flight ─ await all ─ sleep(inter_batch_delay)
//!    batch 2: ...                        ─ await all ─ sleep(inter_batch_delay)
//!    batch N: ...                        ─ await all ─ done
//! ```
//!
//! Batches never overlap and the pause is skipped after the last batch.
//! A failure (provider error, short series, panic) removes only that
//! identifier from the output and is logged with it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::error::MarketError;
use crate::metrics::FetchCounters;
use crate::provider::MarketDataApi;
use crate::signal::{SignalParams, compute_signal_from_samples};
use crate::types::{SignalResult, dedup_symbols};

pub const DEFAULT_MAX_PARALLEL: usize = 10;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_INTER_BATCH_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct FetchConfig {
    /// Ceiling on concurrent provider calls within a batch.
    pub max_parallel: usize,
    /// Identifiers per batch.
    pub batch_size: usize,
    /// Pause between consecutive batches.
    pub inter_batch_delay: Duration,
    /// Window and threshold applied to every fetched series.
    pub signal: SignalParams,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay: DEFAULT_INTER_BATCH_DELAY,
            signal: SignalParams::default(),
        }
    }
}

pub struct BatchFetcher<P: ?Sized> {
    provider: Arc<P>,
    cfg: FetchConfig,
    counters: FetchCounters,
}

impl<P> BatchFetcher<P>
where
    P: MarketDataApi + ?Sized,
{
    pub fn new(provider: Arc<P>, cfg: FetchConfig) -> Self {
        Self {
            provider,
            cfg,
            counters: FetchCounters::default(),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.cfg
    }

    pub fn counters(&self) -> &FetchCounters {
        &self.counters
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Fetches with the configured parallelism and batch size.
    pub async fn fetch<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<SignalResult> {
        self.fetch_with(symbols, self.cfg.max_parallel, self.cfg.batch_size)
            .await
    }

    /// Fetches `symbols` in consecutive batches of `batch_size`, at most
    /// `max_parallel` calls in flight. Output order follows completion.
    #[instrument(skip_all, target = "fetcher", fields(requested = symbols.len()))]
    pub async fn fetch_with<S: AsRef<str>>(
        &self,
        symbols: &[S],
        max_parallel: usize,
        batch_size: usize,
    ) -> Vec<SignalResult> {
        let symbols = dedup_symbols(symbols);
        let max_parallel = max_parallel.max(1);
        let batch_size = batch_size.max(1);

        let total = symbols.len();
        let batch_count = total.div_ceil(batch_size);
        let mut out = Vec::with_capacity(total);

        for (idx, batch) in symbols.chunks(batch_size).enumerate() {
            let first = idx * batch_size + 1;
            info!(
                batch = idx + 1,
                of = batch_count,
                from = first,
                to = first + batch.len() - 1,
                total,
                "processing batch"
            );

            out.extend(self.run_batch(batch, max_parallel).await);
            FetchCounters::bump(&self.counters.batches, 1);

            if idx + 1 < batch_count {
                debug!(
                    delay_ms = self.cfg.inter_batch_delay.as_millis() as u64,
                    "rate limiting: pausing before next batch"
                );
                tokio::time::sleep(self.cfg.inter_batch_delay).await;
            }
        }

        info!(succeeded = out.len(), total, "fetch complete");
        out
    }

    /// Single-identifier path: no batching, no pacing.
    pub async fn fetch_one(
        &self,
        symbol: &str,
        params: SignalParams,
    ) -> Result<SignalResult, MarketError> {
        fetch_and_compute(self.provider.as_ref(), symbol, params).await
    }

    async fn run_batch(&self, batch: &[String], max_parallel: usize) -> Vec<SignalResult> {
        let permits = Arc::new(Semaphore::new(max_parallel));
        let mut tasks = JoinSet::new();
        let mut by_task = HashMap::with_capacity(batch.len());

        FetchCounters::bump(&self.counters.requested, batch.len() as u64);

        // Dispatch in input order; a permit is taken before each spawn so
        // the pool never exceeds `max_parallel` running fetches.
        for symbol in batch {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                error!("fetch permit pool closed; abandoning rest of batch");
                break;
            };

            let provider = Arc::clone(&self.provider);
            let params = self.cfg.signal;
            let sym = symbol.clone();

            let handle = tasks.spawn(async move {
                let res = fetch_and_compute(provider.as_ref(), &sym, params).await;
                drop(permit);
                res
            });
            by_task.insert(handle.id(), symbol.clone());
        }

        let mut out = Vec::with_capacity(batch.len());

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok(result))) => {
                    FetchCounters::bump(&self.counters.succeeded, 1);
                    out.push(result);
                }
                Ok((id, Err(e))) => {
                    let symbol = by_task.get(&id).map(String::as_str).unwrap_or("?");
                    if e.is_insufficient_data() {
                        FetchCounters::bump(&self.counters.failed_insufficient, 1);
                    } else {
                        FetchCounters::bump(&self.counters.failed_provider, 1);
                    }
                    warn!(symbol = %symbol, error = %e, "fetch failed; skipping");
                }
                Err(join_err) => {
                    let symbol = by_task
                        .get(&join_err.id())
                        .map(String::as_str)
                        .unwrap_or("?");
                    FetchCounters::bump(&self.counters.failed_panic, 1);
                    error!(symbol = %symbol, error = %join_err, "fetch task aborted");
                }
            }
        }

        out
    }
}

async fn fetch_and_compute<P>(
    provider: &P,
    symbol: &str,
    params: SignalParams,
) -> Result<SignalResult, MarketError>
where
    P: MarketDataApi + ?Sized,
{
    let samples = provider
        .fetch_series(symbol, params.lookback_periods())
        .await?;

    if samples.is_empty() {
        return Err(MarketError::EmptySeries(symbol.to_string()));
    }

    compute_signal_from_samples(symbol, &samples, params)
        .map_err(|e| MarketError::signal(symbol, e))
}
