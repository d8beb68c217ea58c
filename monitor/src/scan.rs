//! Universe scan: the read-heavy consumer of the batched fetcher.
//!
//! Results are cached per universe variant (`stocks_default`, or
//! `stocks_{A,B,..}` for a normalized custom list) and the resolved
//! universe itself under `sp500_tickers`, all with the same TTL.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, instrument};

use common::logger::warn_if_slow;
use market::types::dedup_symbols;
use market::universe::{UniverseSource, resolve_universe};
use market::{BatchFetcher, Direction, MarketDataApi, SignalResult, TtlCache};

const TICKERS_KEY: &str = "sp500_tickers";
const UNIVERSE_SLOW: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Serialize)]
pub struct ScanResponse {
    pub stocks: Vec<SignalResult>,
    pub total_count: usize,
    /// Seconds, two decimals. Zero on a cache hit.
    pub processing_time: f64,
    pub cache_hit: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_tickers: usize,
    pub near_ma_count: usize,
    pub above_count: usize,
    pub below_count: usize,
}

pub struct ScanService<P: ?Sized> {
    fetcher: BatchFetcher<P>,
    universe: Arc<dyn UniverseSource>,
    tickers: TtlCache<String, Vec<String>>,
    stocks: TtlCache<String, Vec<SignalResult>>,
}

impl<P> ScanService<P>
where
    P: MarketDataApi + ?Sized,
{
    pub fn new(fetcher: BatchFetcher<P>, universe: Arc<dyn UniverseSource>, ttl: Duration) -> Self {
        Self {
            fetcher,
            universe,
            tickers: TtlCache::new(ttl),
            stocks: TtlCache::new(ttl),
        }
    }

    pub fn fetcher(&self) -> &BatchFetcher<P> {
        &self.fetcher
    }

    /// The resolved universe, cached.
    pub async fn tickers(&self) -> Vec<String> {
        if let Some(hit) = self.tickers.get(TICKERS_KEY) {
            return hit;
        }

        let list = warn_if_slow(
            "universe_fetch",
            UNIVERSE_SLOW,
            resolve_universe(self.universe.as_ref()),
        )
        .await;
        self.tickers.set(TICKERS_KEY.to_string(), list.clone());
        list
    }

    /// Scans the universe, plus the comma-separated `include_custom`
    /// identifiers when given.
    #[instrument(skip(self), level = "info")]
    pub async fn stocks(&self, include_custom: Option<&str>) -> ScanResponse {
        let custom = include_custom.map(parse_custom).filter(|c| !c.is_empty());
        let cache_key = stocks_key(custom.as_deref());

        if let Some(stocks) = self.stocks.get(&cache_key) {
            info!(%cache_key, count = stocks.len(), "scan served from cache");
            return ScanResponse {
                total_count: stocks.len(),
                stocks,
                processing_time: 0.0,
                cache_hit: true,
            };
        }

        let started = Instant::now();

        let mut symbols = self.tickers().await;
        if let Some(custom) = custom {
            symbols.extend(custom);
            symbols = dedup_symbols(symbols);
        }

        let stocks = self.fetcher.fetch(&symbols).await;
        self.stocks.set(cache_key.clone(), stocks.clone());

        let processing_time = round2(started.elapsed().as_secs_f64());
        info!(
            %cache_key,
            requested = symbols.len(),
            count = stocks.len(),
            processing_time,
            "scan complete"
        );

        ScanResponse {
            total_count: stocks.len(),
            stocks,
            processing_time,
            cache_hit: false,
        }
    }

    pub async fn statistics_for(&self, include_custom: Option<&str>) -> Statistics {
        statistics(&self.stocks(include_custom).await.stocks)
    }

    pub fn clear_cache(&self) {
        self.tickers.clear();
        self.stocks.clear();
        info!("scan cache cleared");
    }
}

pub fn statistics(results: &[SignalResult]) -> Statistics {
    results.iter().fold(
        Statistics {
            total_tickers: results.len(),
            ..Statistics::default()
        },
        |mut acc, r| {
            if r.near {
                acc.near_ma_count += 1;
            }
            match r.direction {
                Direction::Above => acc.above_count += 1,
                Direction::Below => acc.below_count += 1,
            }
            acc
        },
    )
}

fn stocks_key(custom: Option<&[String]>) -> String {
    match custom {
        Some(list) => format!("stocks_{}", list.join(",")),
        None => "stocks_default".to_string(),
    }
}

fn parse_custom(raw: &str) -> Vec<String> {
    dedup_symbols(raw.split(','))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(symbol: &str, direction: Direction, near: bool) -> SignalResult {
        SignalResult {
            symbol: symbol.into(),
            current_price: 100.0,
            moving_average: 100.0,
            distance_percent: 0.0,
            distance_abs: 0.0,
            direction,
            near,
        }
    }

    #[test]
    fn statistics_count_directions_and_proximity() {
        let rows = vec![
            result("A", Direction::Above, true),
            result("B", Direction::Below, true),
            result("C", Direction::Below, false),
        ];

        let s = statistics(&rows);

        assert_eq!(
            s,
            Statistics {
                total_tickers: 3,
                near_ma_count: 2,
                above_count: 1,
                below_count: 2,
            }
        );
    }

    #[test]
    fn statistics_of_nothing_are_zero() {
        assert_eq!(statistics(&[]), Statistics::default());
    }

    #[test]
    fn cache_key_carries_the_normalized_custom_list() {
        assert_eq!(stocks_key(None), "stocks_default");
        assert_eq!(
            stocks_key(Some(&parse_custom(" tsla,nvda,TSLA"))),
            "stocks_TSLA,NVDA"
        );
    }

    #[test]
    fn custom_list_is_trimmed_uppercased_and_deduplicated() {
        assert_eq!(parse_custom(" tsla, AAPL ,,tsla"), vec!["TSLA", "AAPL"]);
    }
}
