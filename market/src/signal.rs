use crate::error::SignalError;
use crate::types::{Direction, Sample, SignalResult};

/// Moving-average window in periods.
pub const DEFAULT_WINDOW_LENGTH: usize = 150;

/// Distance (percent) at or below which an instrument counts as near its average.
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 5.0;

/// Extra periods requested beyond the window so holidays and gaps
/// still leave a full window.
pub const LOOKBACK_PADDING: usize = 30;

/// Signal Calculator
///
/// Measures how far the latest close is from its trailing simple moving
/// average:
///
/// ```text
/// ma               = mean(last `window_length` closes)
/// distance_percent = (last - ma) / ma * 100
/// distance_abs     = |distance_percent|
/// direction        = ABOVE if last > ma else BELOW
/// near             = distance_abs <= threshold_percent
/// ```
///
/// A series shorter than the window is rejected; the calculator never
/// averages over a partial window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalParams {
    pub window_length: usize,
    pub threshold_percent: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW_LENGTH,
            threshold_percent: DEFAULT_THRESHOLD_PERCENT,
        }
    }
}

impl SignalParams {
    pub fn new(window_length: usize, threshold_percent: f64) -> Self {
        Self {
            window_length,
            threshold_percent,
        }
    }

    /// Number of periods to request from the provider.
    pub fn lookback_periods(&self) -> usize {
        self.window_length + LOOKBACK_PADDING
    }
}

/// Trailing simple moving average over exactly `window` closes.
pub fn moving_average(closes: &[f64], window: usize) -> Result<f64, SignalError> {
    if window == 0 {
        return Err(SignalError::ZeroWindow);
    }
    if closes.len() < window {
        return Err(SignalError::InsufficientData {
            required: window,
            available: closes.len(),
        });
    }

    let tail = &closes[closes.len() - window..];
    Ok(tail.iter().sum::<f64>() / window as f64)
}

/// Computes the signal for `symbol` from an ascending close series.
pub fn compute_signal(
    symbol: &str,
    closes: &[f64],
    params: SignalParams,
) -> Result<SignalResult, SignalError> {
    let ma = moving_average(closes, params.window_length)?;

    if ma <= 0.0 || !ma.is_finite() {
        return Err(SignalError::NonPositiveAverage(ma));
    }

    // moving_average guarantees at least one close
    let current = closes[closes.len() - 1];

    let distance_percent = (current - ma) / ma * 100.0;
    let distance_abs = distance_percent.abs();

    let direction = if current > ma {
        Direction::Above
    } else {
        Direction::Below
    };

    Ok(SignalResult {
        symbol: symbol.to_string(),
        current_price: current,
        moving_average: ma,
        distance_percent,
        distance_abs,
        direction,
        near: distance_abs <= params.threshold_percent,
    })
}

/// Same as [`compute_signal`] over raw samples.
pub fn compute_signal_from_samples(
    symbol: &str,
    samples: &[Sample],
    params: SignalParams,
) -> Result<SignalResult, SignalError> {
    let closes: Vec<f64> = samples.iter().map(|s| s.close).collect();
    compute_signal(symbol, &closes, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn flat_then(last: f64) -> Vec<f64> {
        let mut v = vec![100.0; 150];
        v.push(last);
        v
    }

    #[test]
    fn spike_after_flat_series_matches_hand_computation() {
        let closes = flat_then(110.0);

        let r = compute_signal("SPY", &closes, SignalParams::default()).unwrap();

        let ma = (149.0 * 100.0 + 110.0) / 150.0;
        let dist = (110.0 - ma) / ma * 100.0;

        assert!((r.moving_average - ma).abs() < 1e-12);
        assert!((r.moving_average - 100.0667).abs() < 1e-3);
        assert!((r.distance_percent - dist).abs() < 1e-12);
        assert!((r.distance_percent - 9.93).abs() < 0.01);
        assert_eq!(r.direction, Direction::Above);
        assert!(!r.near);
        assert_eq!(r.current_price, 110.0);
    }

    #[test]
    fn series_one_short_of_window_is_rejected() {
        let closes = vec![100.0; 149];

        let err = compute_signal("QQQ", &closes, SignalParams::default()).unwrap_err();

        assert_eq!(
            err,
            SignalError::InsufficientData {
                required: 150,
                available: 149
            }
        );
    }

    #[test]
    fn only_trailing_window_is_averaged() {
        // 10 old closes at 1000 must not leak into a 5-sample window.
        let mut closes = vec![1000.0; 10];
        closes.extend([10.0, 10.0, 10.0, 10.0, 10.0]);

        let r = compute_signal("X", &closes, SignalParams::new(5, 1.0)).unwrap();

        assert_eq!(r.moving_average, 10.0);
        assert_eq!(r.distance_percent, 0.0);
        assert!(r.near);
    }

    #[test]
    fn price_equal_to_average_is_below() {
        let r = compute_signal("X", &[50.0, 50.0, 50.0], SignalParams::new(3, 5.0)).unwrap();
        assert_eq!(r.direction, Direction::Below);
        assert!(r.near);
    }

    #[test]
    fn threshold_is_inclusive() {
        // ma = 100, last = 105 -> exactly 5%
        let closes = [95.0, 100.0, 105.0];
        let r = compute_signal("X", &closes, SignalParams::new(3, 5.0)).unwrap();

        assert!((r.distance_abs - 5.0).abs() < 1e-12);
        assert!(r.near);
    }

    #[test]
    fn zero_window_and_non_positive_average_are_errors() {
        assert_eq!(
            moving_average(&[1.0], 0).unwrap_err(),
            SignalError::ZeroWindow
        );

        let err = compute_signal("X", &[0.0, 0.0], SignalParams::new(2, 5.0)).unwrap_err();
        assert!(matches!(err, SignalError::NonPositiveAverage(_)));
    }

    #[test]
    fn lookback_adds_padding() {
        assert_eq!(SignalParams::default().lookback_periods(), 180);
    }

    proptest! {
        #[test]
        fn direction_and_near_flag_follow_definitions(
            closes in prop::collection::vec(1.0f64..1_000.0, 20..60),
            window in 1usize..20,
            threshold in 0.0f64..50.0,
        ) {
            let r = compute_signal("P", &closes, SignalParams::new(window, threshold)).unwrap();

            prop_assert_eq!(r.direction == Direction::Above, r.current_price > r.moving_average);
            prop_assert_eq!(r.near, r.distance_abs <= threshold);
            prop_assert!((r.distance_abs - r.distance_percent.abs()).abs() < 1e-12);
        }

        #[test]
        fn short_series_never_produce_an_average(len in 0usize..150) {
            let closes = vec![42.0; len];
            let out = compute_signal("P", &closes, SignalParams::default());
            let rejected = matches!(out, Err(SignalError::InsufficientData { .. }));
            prop_assert!(rejected);
        }
    }
}
