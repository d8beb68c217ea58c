use std::fmt;

use crate::condition::ConditionKind;

/// Cooldown key: `{SYMBOL}_{condition_kind}`.
///
/// Parameters are deliberately not part of the key, so two `near_ma`
/// alerts on one symbol with different thresholds share a cooldown.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertKey(String);

impl AlertKey {
    pub fn new(symbol: &str, kind: ConditionKind) -> Self {
        Self(format!("{}_{}", symbol, kind.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_symbol_and_kind() {
        assert_eq!(AlertKey::new("AAPL", ConditionKind::NearMa).as_str(), "AAPL_near_ma");
        assert_eq!(
            AlertKey::new("SPY", ConditionKind::PercentChange).to_string(),
            "SPY_percent_change"
        );
    }
}
