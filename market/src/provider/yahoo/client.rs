use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::MarketError;
use crate::provider::MarketDataApi;
use crate::provider::yahoo::types::{ChartEnvelope, ChartError};
use crate::types::Sample;

pub const DEFAULT_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Market-data provider backed by the Yahoo chart endpoint.
#[derive(Clone)]
pub struct YahooChartClient {
    http: Client,
    url: String,
}

impl YahooChartClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, MarketError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self { http, url })
    }

    /// Uses `YAHOO_CHART_URL` when set, the public endpoint otherwise.
    pub fn from_env(timeout: Duration) -> Result<Self, MarketError> {
        let url = std::env::var("YAHOO_CHART_URL").unwrap_or_else(|_| DEFAULT_CHART_URL.to_string());
        Self::new(url, timeout)
    }
}

/// Calendar range that holds at least `periods` trading sessions
/// (five sessions a week plus a holiday allowance).
pub fn range_for_periods(periods: usize) -> String {
    let days = periods.max(1) * 7 / 5 + 10;
    format!("{days}d")
}

/// Turns a chart payload into ascending samples, keeping the newest `lookback`.
pub fn parse_chart(
    symbol: &str,
    envelope: ChartEnvelope,
    lookback: usize,
) -> Result<Vec<Sample>, MarketError> {
    if let Some(ChartError { code, description }) = envelope.chart.error {
        return Err(if code == "Not Found" {
            MarketError::UnknownSymbol(symbol.to_string())
        } else {
            MarketError::InvalidResponse(format!(
                "{code}: {}",
                description.unwrap_or_default()
            ))
        });
    }

    let result = envelope
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or_else(|| MarketError::EmptySeries(symbol.to_string()))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    if timestamps.len() != closes.len() {
        return Err(MarketError::InvalidResponse(format!(
            "{symbol}: {} timestamps vs {} closes",
            timestamps.len(),
            closes.len()
        )));
    }

    let mut samples: Vec<Sample> = timestamps
        .into_iter()
        .zip(closes)
        .filter_map(|(ts, close)| match close {
            Some(c) if c.is_finite() => Some(Sample::new(ts, c)),
            _ => None,
        })
        .collect();

    if samples.is_empty() {
        return Err(MarketError::EmptySeries(symbol.to_string()));
    }

    samples.sort_by_key(|s| s.ts);

    if samples.len() > lookback {
        samples.drain(..samples.len() - lookback);
    }

    Ok(samples)
}

#[async_trait]
impl MarketDataApi for YahooChartClient {
    #[instrument(skip(self), fields(symbol = %symbol), level = "debug")]
    async fn fetch_series(
        &self,
        symbol: &str,
        lookback_periods: usize,
    ) -> Result<Vec<Sample>, MarketError> {
        let url = format!("{}/{}", self.url, symbol);
        let range = range_for_periods(lookback_periods);

        let resp = self
            .http
            .get(&url)
            .query(&[("range", range.as_str()), ("interval", "1d")])
            .send()
            .await?;

        let status = resp.status();

        // Yahoo reports unknown symbols as 404 with an error body, so try the body first.
        let envelope: ChartEnvelope = match resp.json().await {
            Ok(e) => e,
            Err(_) if !status.is_success() => {
                return Err(MarketError::Status {
                    symbol: symbol.to_string(),
                    status: status.as_u16(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let samples = parse_chart(symbol, envelope, lookback_periods)?;

        debug!(samples = samples.len(), range = %range, "yahoo series fetched");

        Ok(samples)
    }
}
