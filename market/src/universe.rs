//! Ticker universe: the S&P 500 constituents plus a fixed set of ETFs
//! and individual names, with a static fallback when the list page
//! cannot be fetched.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, instrument, warn};

use crate::error::MarketError;
use crate::types::dedup_symbols;

pub const DEFAULT_CONSTITUENTS_URL: &str =
    "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// ETFs always monitored alongside the index members.
pub const CUSTOM_ETFS: &[&str] = &[
    "SPY", "QQQ", "DIA", "IWM", "VTI", "VOO", // market indexes
    "XLF", "XLK", "XLE", "XLV", "XLI", "XLY", "XLP", // sectors
    "VEA", "VWO", "EFA", // international
    "AGG", "BND", "TLT", // bonds
    "GLD", "SLV", "NLR", // commodities / other
];

/// Individual names always monitored.
pub const CUSTOM_STOCKS: &[&str] = &[
    "TSLA", "AAPL", "AMZN", "MSFT", "GOOGL", "META", "NVDA", "PLTR", "NFLX", "CEG", "VST", "AMD",
    "INTC",
];

/// Supplies the ordered list of identifiers to scan.
#[async_trait]
pub trait UniverseSource: Send + Sync {
    async fn fetch_universe(&self) -> Result<Vec<String>, MarketError>;
}

/// The list used when the universe source is unavailable.
pub fn fallback_universe() -> Vec<String> {
    CUSTOM_ETFS
        .iter()
        .chain(CUSTOM_STOCKS)
        .map(|s| s.to_string())
        .collect()
}

/// Fetches the universe, substituting [`fallback_universe`] on failure
/// or an empty answer. The result is normalized and de-duplicated.
#[instrument(skip(source), level = "debug")]
pub async fn resolve_universe<S>(source: &S) -> Vec<String>
where
    S: UniverseSource + ?Sized,
{
    match source.fetch_universe().await {
        Ok(list) if !list.is_empty() => {
            let out = dedup_symbols(list);
            info!(count = out.len(), "ticker universe resolved");
            out
        }
        Ok(_) => {
            warn!("ticker source returned an empty list; using fallback universe");
            dedup_symbols(fallback_universe())
        }
        Err(e) => {
            warn!(error = %e, "ticker source failed; using fallback universe");
            dedup_symbols(fallback_universe())
        }
    }
}

/// S&P 500 constituents scraped from the Wikipedia list page, followed by
/// the custom ETFs and stocks.
#[derive(Clone)]
pub struct WikipediaUniverse {
    http: Client,
    url: String,
}

impl WikipediaUniverse {
    pub fn new(url: String, timeout: Duration) -> Result<Self, MarketError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { http, url })
    }
}

#[async_trait]
impl UniverseSource for WikipediaUniverse {
    async fn fetch_universe(&self) -> Result<Vec<String>, MarketError> {
        let html = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut tickers = parse_constituents(&html);
        if tickers.is_empty() {
            return Err(MarketError::InvalidResponse(
                "constituents table not found".into(),
            ));
        }

        tickers.extend(fallback_universe());
        Ok(tickers)
    }
}

/// Extracts the first column of the constituents table.
///
/// Share-class dots are rewritten to dashes (`BRK.B` -> `BRK-B`), the form
/// quote providers expect.
pub fn parse_constituents(html: &str) -> Vec<String> {
    let start = html
        .find("id=\"constituents\"")
        .or_else(|| html.find("<table"));
    let Some(start) = start else {
        return Vec::new();
    };

    let table = &html[start..];
    let table = match table.find("</table>") {
        Some(end) => &table[..end],
        None => table,
    };

    table
        .split("<tr")
        .skip(1)
        .filter_map(|row| {
            let cell_start = row.find("<td")?;
            let cell = &row[cell_start..];
            let body_start = cell.find('>')? + 1;
            let body_end = cell.find("</td>").unwrap_or(cell.len());
            let text = decode_entities(&strip_tags(cell.get(body_start..body_end)?));
            let text = text.trim();

            if text.is_empty() {
                None
            } else {
                Some(text.replace('.', "-"))
            }
        })
        .collect()
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out
}

/// Decodes the handful of entities the constituents page uses.
/// `&amp;` goes last so `&amp;lt;` stays literal `&lt;`.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    s.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
