pub mod yahoo;

use async_trait::async_trait;

use crate::error::MarketError;
use crate::types::Sample;

pub use yahoo::YahooChartClient;

/// Source of daily close series.
///
/// Implementations return samples in ascending timestamp order and at most
/// `lookback_periods` of them (the most recent ones).
#[async_trait]
pub trait MarketDataApi: Send + Sync + 'static {
    async fn fetch_series(
        &self,
        symbol: &str,
        lookback_periods: usize,
    ) -> Result<Vec<Sample>, MarketError>;
}
