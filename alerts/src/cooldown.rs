use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::key::AlertKey;

/// Default minimum spacing between notifications for one key.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60 * 60);

/// Alert Cooldown Gate
///
/// Remembers when each alert key last fired and refuses to fire it again
/// inside `window`. Pure time comparison over caller-supplied timestamps.
///
/// State lives for the process only; a restart forgets every cooldown.
/// Keys are never removed, so the map is bounded by the number of
/// configured alerts.
pub struct CooldownGate {
    window: Duration,
    last_fired: Mutex<HashMap<AlertKey, u64>>,
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn open(&self, last: Option<u64>, now_ms: u64) -> bool {
        match last {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.window.as_millis() as u64,
        }
    }

    /// True if `key` never fired or fired at least `window` before `now_ms`.
    pub fn should_fire(&self, key: &AlertKey, now_ms: u64) -> bool {
        let last = self.last_fired.lock().get(key).copied();
        self.open(last, now_ms)
    }

    /// Checks and records under one lock. Of several concurrent callers for
    /// the same key inside one window, exactly one gets `true`.
    pub fn try_claim(&self, key: &AlertKey, now_ms: u64) -> bool {
        let mut map = self.last_fired.lock();
        if !self.open(map.get(key).copied(), now_ms) {
            return false;
        }
        map.insert(key.clone(), now_ms);
        true
    }

    pub fn record_fired(&self, key: &AlertKey, now_ms: u64) {
        self.last_fired.lock().insert(key.clone(), now_ms);
    }

    pub fn last_fired(&self, key: &AlertKey) -> Option<u64> {
        self.last_fired.lock().get(key).copied()
    }

    /// Number of keys that have fired at least once.
    pub fn tracked(&self) -> usize {
        self.last_fired.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionKind;

    const MIN: u64 = 60_000;

    fn key(sym: &str) -> AlertKey {
        AlertKey::new(sym, ConditionKind::NearMa)
    }

    #[test]
    fn first_firing_is_always_allowed() {
        let gate = CooldownGate::default();
        assert!(gate.should_fire(&key("AAPL"), 0));
        assert_eq!(gate.tracked(), 0);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let gate = CooldownGate::new(Duration::from_secs(60 * 60));
        let k = key("AAPL");

        gate.record_fired(&k, 1_000);

        assert!(!gate.should_fire(&k, 1_000 + 59 * MIN));
        assert!(!gate.should_fire(&k, 1_000 + 60 * MIN - 1));
        assert!(gate.should_fire(&k, 1_000 + 60 * MIN));
    }

    #[test]
    fn keys_are_independent() {
        let gate = CooldownGate::default();
        gate.record_fired(&key("AAPL"), 10);

        assert!(!gate.should_fire(&key("AAPL"), 20));
        assert!(gate.should_fire(&key("MSFT"), 20));
        assert!(gate.should_fire(&AlertKey::new("AAPL", ConditionKind::Above), 20));
    }

    #[test]
    fn claim_records_and_closes_the_window() {
        let gate = CooldownGate::new(Duration::from_secs(60 * 60));
        let k = key("AAPL");

        assert!(gate.try_claim(&k, 0));
        assert!(!gate.try_claim(&k, 60 * MIN - 1));
        assert_eq!(gate.last_fired(&k), Some(0));
        assert!(gate.try_claim(&k, 60 * MIN));
        assert_eq!(gate.last_fired(&k), Some(60 * MIN));
    }

    #[test]
    fn concurrent_claims_admit_one_caller() {
        let gate = std::sync::Arc::new(CooldownGate::default());

        let winners: usize = (0..8)
            .map(|_| {
                let gate = gate.clone();
                std::thread::spawn(move || gate.try_claim(&key("AAPL"), 1_000))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();

        assert_eq!(winners, 1);
    }

    #[test]
    fn clock_going_backwards_keeps_the_gate_closed() {
        let gate = CooldownGate::new(Duration::from_secs(1));
        let k = key("X");
        gate.record_fired(&k, 5_000);

        assert!(!gate.should_fire(&k, 4_000));
        assert_eq!(gate.last_fired(&k), Some(5_000));
    }
}
