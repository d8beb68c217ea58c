use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use alerts::{AlertDefinition, AlertSpec, ConfigError};
use market::fetcher::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_PARALLEL, FetchConfig};
use market::signal::{DEFAULT_THRESHOLD_PERCENT, DEFAULT_WINDOW_LENGTH, SignalParams};

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level YAML configuration for the monitor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Minutes between monitoring cycles.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// Minutes before the same alert key may notify again.
    #[serde(default = "default_alert_cooldown")]
    pub alert_cooldown: u64,

    /// WhatsApp (CallMeBot) credentials. Leaving either out disables
    /// delivery; alerts are then only logged.
    #[serde(default)]
    pub whatsapp: WhatsappConfig,

    /// Where each cycle's snapshot is written.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Lifetime of cached scan results.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub fetch: FetchSettings,

    #[serde(default)]
    pub alerts: Vec<AlertSpec>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WhatsappConfig {
    pub phone: Option<String>,
    pub api_key: Option<String>,
}

/// Batched fetcher knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches (provider rate limit).
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,

    #[serde(default = "default_window_length")]
    pub window_length: usize,

    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: f64,

    /// Per-request HTTP timeout for providers and transport.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            batch_size: default_batch_size(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            window_length: default_window_length(),
            threshold_percent: default_threshold_percent(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_check_interval() -> u64 {
    5
}
fn default_alert_cooldown() -> u64 {
    60
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("alerts_data.json")
}
fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_max_parallel() -> usize {
    DEFAULT_MAX_PARALLEL
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_inter_batch_delay_ms() -> u64 {
    1_000
}
fn default_window_length() -> usize {
    DEFAULT_WINDOW_LENGTH
}
fn default_threshold_percent() -> f64 {
    DEFAULT_THRESHOLD_PERCENT
}
fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
            alert_cooldown: default_alert_cooldown(),
            whatsapp: WhatsappConfig::default(),
            snapshot_path: default_snapshot_path(),
            cache_ttl_secs: default_cache_ttl_secs(),
            fetch: FetchSettings::default(),
            alerts: Vec::new(),
        }
    }
}

/// An `alerts:` entry paired with the result of validating it.
///
/// Invalid entries are kept so each cycle can report them individually.
#[derive(Clone, Debug)]
pub struct AlertEntry {
    pub spec: AlertSpec,
    pub definition: Result<AlertDefinition, ConfigError>,
}

impl MonitorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let cfg: MonitorConfig = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Structural checks only; per-alert problems surface through [`AlertEntry`].
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.check_interval == 0 {
            return Err(ConfigLoadError::Invalid(
                "check_interval must be at least 1 minute".into(),
            ));
        }
        if self.fetch.max_parallel == 0 || self.fetch.batch_size == 0 {
            return Err(ConfigLoadError::Invalid(
                "fetch.max_parallel and fetch.batch_size must be at least 1".into(),
            ));
        }
        if self.fetch.window_length == 0 {
            return Err(ConfigLoadError::Invalid(
                "fetch.window_length must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval * 60)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown * 60)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.request_timeout_secs)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            max_parallel: self.fetch.max_parallel,
            batch_size: self.fetch.batch_size,
            inter_batch_delay: Duration::from_millis(self.fetch.inter_batch_delay_ms),
            signal: SignalParams::new(self.fetch.window_length, self.fetch.threshold_percent),
        }
    }

    /// `(phone, api_key)` when both are present and non-blank.
    pub fn whatsapp_credentials(&self) -> Option<(&str, &str)> {
        let phone = self.whatsapp.phone.as_deref()?.trim();
        let key = self.whatsapp.api_key.as_deref()?.trim();
        if phone.is_empty() || key.is_empty() {
            None
        } else {
            Some((phone, key))
        }
    }

    pub fn alert_entries(&self) -> Vec<AlertEntry> {
        self.alerts
            .iter()
            .map(|spec| AlertEntry {
                spec: spec.clone(),
                definition: AlertDefinition::try_from(spec),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerts::Condition;

    const SAMPLE: &str = r#"
check_interval: 15
alert_cooldown: 30
whatsapp:
  phone: "+15550001111"
  api_key: "abc123"
fetch:
  batch_size: 25
alerts:
  - name: Apple near MA
    symbol: AAPL
    condition: near_ma
    params:
      ma_period: 150
      threshold_percent: 3.0
  - name: Broken
    symbol: MSFT
    condition: sideways
  - name: Off
    symbol: NVDA
    condition: above
    params:
      price: 100
    enabled: false
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let cfg = MonitorConfig::from_yaml(SAMPLE).unwrap();

        assert_eq!(cfg.check_interval(), Duration::from_secs(15 * 60));
        assert_eq!(cfg.cooldown(), Duration::from_secs(30 * 60));
        assert_eq!(cfg.whatsapp_credentials(), Some(("+15550001111", "abc123")));
        assert_eq!(cfg.snapshot_path, PathBuf::from("alerts_data.json"));

        let fc = cfg.fetch_config();
        assert_eq!(fc.batch_size, 25);
        assert_eq!(fc.max_parallel, 10);
        assert_eq!(fc.inter_batch_delay, Duration::from_secs(1));
        assert_eq!(fc.signal, SignalParams::default());
    }

    #[test]
    fn one_bad_alert_does_not_poison_the_rest() {
        let cfg = MonitorConfig::from_yaml(SAMPLE).unwrap();
        let entries = cfg.alert_entries();

        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0].definition.as_ref().unwrap().condition,
            Condition::NearMa {
                ma_period: 150,
                threshold_percent: 3.0
            }
        );
        assert_eq!(
            entries[1].definition.as_ref().unwrap_err(),
            &ConfigError::UnknownCondition("sideways".into())
        );
        assert!(!entries[2].definition.as_ref().unwrap().enabled);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = MonitorConfig::from_yaml("{}").unwrap();

        assert_eq!(cfg.check_interval, 5);
        assert_eq!(cfg.alert_cooldown, 60);
        assert!(cfg.alerts.is_empty());
        assert!(cfg.whatsapp_credentials().is_none());
    }

    #[test]
    fn blank_credentials_mean_unconfigured() {
        let cfg = MonitorConfig::from_yaml("whatsapp:\n  phone: \"+1\"\n  api_key: \"  \"\n").unwrap();
        assert!(cfg.whatsapp_credentials().is_none());
    }

    #[test]
    fn structural_errors_are_rejected() {
        assert!(matches!(
            MonitorConfig::from_yaml("check_interval: 0"),
            Err(ConfigLoadError::Invalid(_))
        ));
        assert!(matches!(
            MonitorConfig::from_yaml("fetch:\n  batch_size: 0\n"),
            Err(ConfigLoadError::Invalid(_))
        ));
        assert!(matches!(
            MonitorConfig::from_yaml("alerts: 7"),
            Err(ConfigLoadError::Yaml(_))
        ));
    }
}
