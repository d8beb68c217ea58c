use serde::{Deserialize, Serialize};

/// One daily bar reduced to what the signal needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Unix seconds of the bar.
    pub ts: i64,
    pub close: f64,
}

impl Sample {
    pub fn new(ts: i64, close: f64) -> Self {
        Self { ts, close }
    }
}

/// Side of the moving average the latest close sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Above => "ABOVE",
            Direction::Below => "BELOW",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distance of one instrument from its trailing moving average.
///
/// Serialized with the field names dashboard readers already consume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub symbol: String,

    #[serde(rename = "price")]
    pub current_price: f64,

    #[serde(rename = "ma_150")]
    pub moving_average: f64,

    /// Signed: positive above the average, negative below.
    pub distance_percent: f64,

    pub distance_abs: f64,

    pub direction: Direction,

    #[serde(rename = "near_ma")]
    pub near: bool,
}

/// Trims and upper-cases a ticker. Blank input yields `None`.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_ascii_uppercase())
    }
}

/// Normalizes and de-duplicates tickers, keeping first-seen order.
pub fn dedup_symbols<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for s in raw {
        if let Some(sym) = normalize_symbol(s.as_ref()) {
            if seen.insert(sym.clone()) {
                out.push(sym);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_symbol("  brk-b "), Some("BRK-B".to_string()));
        assert_eq!(normalize_symbol("   "), None);
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let out = dedup_symbols(["msft", "AAPL", " aapl", "", "MSFT", "nvda"]);
        assert_eq!(out, vec!["MSFT", "AAPL", "NVDA"]);
    }

    #[test]
    fn direction_serializes_uppercase() {
        let json = serde_json::to_string(&Direction::Below).unwrap();
        assert_eq!(json, "\"BELOW\"");
    }
}
