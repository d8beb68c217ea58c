//! Alert conditions.
//!
//! The configured `condition` string is resolved once into the closed
//! [`Condition`] enum; an unknown kind never reaches evaluation.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;

use market::signal::{
    DEFAULT_THRESHOLD_PERCENT, DEFAULT_WINDOW_LENGTH, LOOKBACK_PADDING, SignalParams,
    compute_signal,
};
use market::{Direction, Sample, SignalError, SignalResult};

use crate::error::{ConfigError, EvalError};

/// Periods fetched for the price-level and daily-change conditions.
pub const SHORT_LOOKBACK: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    NearMa,
    Above,
    Below,
    PercentChange,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::NearMa => "near_ma",
            ConditionKind::Above => "above",
            ConditionKind::Below => "below",
            ConditionKind::PercentChange => "percent_change",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "near_ma" => Ok(ConditionKind::NearMa),
            "above" => Ok(ConditionKind::Above),
            "below" => Ok(ConditionKind::Below),
            "percent_change" => Ok(ConditionKind::PercentChange),
            other => Err(ConfigError::UnknownCondition(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NearMaParams {
    #[serde(default = "default_ma_period")]
    pub ma_period: usize,
    #[serde(default = "default_threshold")]
    pub threshold_percent: f64,
}

impl Default for NearMaParams {
    fn default() -> Self {
        Self {
            ma_period: DEFAULT_WINDOW_LENGTH,
            threshold_percent: DEFAULT_THRESHOLD_PERCENT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default, Deserialize)]
pub struct PriceParams {
    pub price: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PercentChangeParams {
    #[serde(default = "default_threshold")]
    pub threshold_percent: f64,
}

impl Default for PercentChangeParams {
    fn default() -> Self {
        Self {
            threshold_percent: DEFAULT_THRESHOLD_PERCENT,
        }
    }
}

fn default_ma_period() -> usize {
    DEFAULT_WINDOW_LENGTH
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_PERCENT
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Latest close within `threshold_percent` of the `ma_period` average.
    NearMa {
        ma_period: usize,
        threshold_percent: f64,
    },
    /// Latest close strictly above `price`.
    Above { price: f64 },
    /// Latest close strictly below `price`.
    Below { price: f64 },
    /// Last daily move strictly larger than `threshold_percent` either way.
    PercentChange { threshold_percent: f64 },
}

/// Outcome of evaluating one condition against a series.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub triggered: bool,
    pub message: Option<String>,
    pub current_price: f64,
    /// Present for `near_ma`.
    pub signal: Option<SignalResult>,
}

impl Condition {
    /// Builds a condition from its configured kind and raw parameters.
    pub fn from_parts(kind: &str, params: &Value) -> Result<Self, ConfigError> {
        let kind: ConditionKind = kind.parse()?;
        let name = kind.as_str();

        let cond = match kind {
            ConditionKind::NearMa => {
                let p: NearMaParams = parse_params(name, params)?;
                if p.ma_period == 0 {
                    return Err(ConfigError::InvalidParams {
                        kind: name,
                        reason: "ma_period must be at least 1".into(),
                    });
                }
                Condition::NearMa {
                    ma_period: p.ma_period,
                    threshold_percent: finite(name, "threshold_percent", p.threshold_percent)?,
                }
            }
            ConditionKind::Above | ConditionKind::Below => {
                let p: PriceParams = parse_params(name, params)?;
                let price = p.price.ok_or(ConfigError::MissingParam {
                    kind: name,
                    param: "price",
                })?;
                let price = finite(name, "price", price)?;
                if kind == ConditionKind::Above {
                    Condition::Above { price }
                } else {
                    Condition::Below { price }
                }
            }
            ConditionKind::PercentChange => {
                let p: PercentChangeParams = parse_params(name, params)?;
                Condition::PercentChange {
                    threshold_percent: finite(name, "threshold_percent", p.threshold_percent)?,
                }
            }
        };

        Ok(cond)
    }

    pub fn kind(&self) -> ConditionKind {
        match self {
            Condition::NearMa { .. } => ConditionKind::NearMa,
            Condition::Above { .. } => ConditionKind::Above,
            Condition::Below { .. } => ConditionKind::Below,
            Condition::PercentChange { .. } => ConditionKind::PercentChange,
        }
    }

    /// Periods of history the condition needs from the provider.
    pub fn lookback_periods(&self) -> usize {
        match self {
            Condition::NearMa { ma_period, .. } => ma_period + LOOKBACK_PADDING,
            _ => SHORT_LOOKBACK,
        }
    }

    /// Evaluates against an ascending series for `symbol`.
    pub fn evaluate(&self, symbol: &str, samples: &[Sample]) -> Result<Evaluation, EvalError> {
        let Some(last) = samples.last() else {
            return Err(EvalError::NoData);
        };
        let current = last.close;

        match *self {
            Condition::NearMa {
                ma_period,
                threshold_percent,
            } => {
                let closes: Vec<f64> = samples.iter().map(|s| s.close).collect();
                let signal = compute_signal(
                    symbol,
                    &closes,
                    SignalParams::new(ma_period, threshold_percent),
                )
                .map_err(|e| match e {
                    SignalError::InsufficientData {
                        required,
                        available,
                    } => EvalError::InsufficientData {
                        required,
                        available,
                    },
                    other => EvalError::Signal(other),
                })?;

                let message = signal.near.then(|| {
                    let from = match signal.direction {
                        Direction::Above => "from ABOVE",
                        Direction::Below => "from BELOW",
                    };
                    format!(
                        "Price ${:.2} is {:.2}% from {}-day MA (${:.2}) - approaching {}",
                        signal.current_price,
                        signal.distance_abs,
                        ma_period,
                        signal.moving_average,
                        from
                    )
                });

                Ok(Evaluation {
                    triggered: signal.near,
                    message,
                    current_price: current,
                    signal: Some(signal),
                })
            }
            Condition::Above { price } => {
                let hit = current > price;
                Ok(Evaluation {
                    triggered: hit,
                    message: hit.then(|| format!("Price ${current:.2} is above ${price:.2}")),
                    current_price: current,
                    signal: None,
                })
            }
            Condition::Below { price } => {
                let hit = current < price;
                Ok(Evaluation {
                    triggered: hit,
                    message: hit.then(|| format!("Price ${current:.2} is below ${price:.2}")),
                    current_price: current,
                    signal: None,
                })
            }
            Condition::PercentChange { threshold_percent } => {
                if samples.len() < 2 {
                    return Err(EvalError::InsufficientData {
                        required: 2,
                        available: samples.len(),
                    });
                }
                let prev = samples[samples.len() - 2].close;
                if prev <= 0.0 {
                    return Err(EvalError::InvalidPrice(prev));
                }

                let change = ((current - prev) / prev * 100.0).abs();
                let hit = change > threshold_percent;
                let direction = if current > prev { "up" } else { "down" };

                Ok(Evaluation {
                    triggered: hit,
                    message: hit.then(|| {
                        format!(
                            "Price changed {change:.2}% {direction} (${prev:.2} → ${current:.2})"
                        )
                    }),
                    current_price: current,
                    signal: None,
                })
            }
        }
    }
}

fn parse_params<T>(kind: &'static str, params: &Value) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    if params.is_null() {
        return Ok(T::default());
    }

    serde_yaml::from_value(params.clone()).map_err(|e| ConfigError::InvalidParams {
        kind,
        reason: e.to_string(),
    })
}

fn finite(kind: &'static str, param: &'static str, v: f64) -> Result<f64, ConfigError> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(ConfigError::InvalidParams {
            kind,
            reason: format!("{param} must be a non-negative number, got {v}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn series(closes: &[f64]) -> Vec<Sample> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Sample::new(i as i64, *c))
            .collect()
    }

    #[test]
    fn unknown_kind_is_rejected_at_construction() {
        let err = Condition::from_parts("crosses_moon", &Value::Null).unwrap_err();
        assert_eq!(err, ConfigError::UnknownCondition("crosses_moon".into()));
    }

    #[test]
    fn near_ma_defaults_apply_without_params() {
        let c = Condition::from_parts("near_ma", &Value::Null).unwrap();
        assert_eq!(
            c,
            Condition::NearMa {
                ma_period: 150,
                threshold_percent: 5.0
            }
        );
        assert_eq!(c.lookback_periods(), 180);
    }

    #[test]
    fn price_conditions_require_price() {
        let err = Condition::from_parts("above", &yaml("{}")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingParam {
                kind: "above",
                param: "price"
            }
        );

        let c = Condition::from_parts("below", &yaml("price: 12.5")).unwrap();
        assert_eq!(c, Condition::Below { price: 12.5 });
        assert_eq!(c.lookback_periods(), SHORT_LOOKBACK);
    }

    #[test]
    fn malformed_params_are_config_errors() {
        let err = Condition::from_parts("near_ma", &yaml("ma_period: soon")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParams { kind: "near_ma", .. }));

        let err = Condition::from_parts("near_ma", &yaml("ma_period: 0")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParams { .. }));

        let err = Condition::from_parts("percent_change", &yaml("threshold_percent: -1")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParams { .. }));
    }

    #[test]
    fn near_ma_triggers_inside_threshold_with_message() {
        let c = Condition::NearMa {
            ma_period: 3,
            threshold_percent: 5.0,
        };

        let e = c.evaluate("AAPL", &series(&[100.0, 100.0, 103.0])).unwrap();

        assert!(e.triggered);
        let msg = e.message.unwrap();
        assert!(msg.starts_with("Price $103.00 is 1.98% from 3-day MA ($101.00)"));
        assert!(msg.ends_with("approaching from ABOVE"));
        assert_eq!(e.signal.unwrap().direction, Direction::Above);
    }

    #[test]
    fn near_ma_outside_threshold_keeps_signal_without_message() {
        let c = Condition::NearMa {
            ma_period: 2,
            threshold_percent: 1.0,
        };

        let e = c.evaluate("AAPL", &series(&[100.0, 80.0])).unwrap();

        assert!(!e.triggered);
        assert!(e.message.is_none());
        assert_eq!(e.signal.unwrap().direction, Direction::Below);
    }

    #[test]
    fn near_ma_short_series_is_insufficient() {
        let c = Condition::NearMa {
            ma_period: 150,
            threshold_percent: 5.0,
        };

        let err = c.evaluate("AAPL", &series(&[1.0; 149])).unwrap_err();
        assert_eq!(
            err,
            EvalError::InsufficientData {
                required: 150,
                available: 149
            }
        );
    }

    #[test]
    fn above_and_below_are_strict() {
        let s = series(&[9.0, 10.0]);

        assert!(!Condition::Above { price: 10.0 }.evaluate("X", &s).unwrap().triggered);
        assert!(!Condition::Below { price: 10.0 }.evaluate("X", &s).unwrap().triggered);

        let e = Condition::Above { price: 9.5 }.evaluate("X", &s).unwrap();
        assert!(e.triggered);
        assert_eq!(e.message.as_deref(), Some("Price $10.00 is above $9.50"));

        let e = Condition::Below { price: 11.0 }.evaluate("X", &s).unwrap();
        assert_eq!(e.message.as_deref(), Some("Price $10.00 is below $11.00"));
    }

    #[test]
    fn percent_change_uses_last_two_closes() {
        let c = Condition::PercentChange {
            threshold_percent: 5.0,
        };

        let e = c.evaluate("X", &series(&[50.0, 100.0, 90.0])).unwrap();
        assert!(e.triggered);
        assert_eq!(
            e.message.as_deref(),
            Some("Price changed 10.00% down ($100.00 → $90.00)")
        );

        let e = c.evaluate("X", &series(&[100.0, 104.0])).unwrap();
        assert!(!e.triggered);

        let err = c.evaluate("X", &series(&[100.0])).unwrap_err();
        assert!(matches!(err, EvalError::InsufficientData { required: 2, available: 1 }));
    }

    #[test]
    fn empty_series_is_no_data() {
        let err = Condition::Above { price: 1.0 }.evaluate("X", &[]).unwrap_err();
        assert_eq!(err, EvalError::NoData);
    }
}
