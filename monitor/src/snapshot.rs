//! Snapshot sink: the latest cycle's per-alert results, overwritten
//! wholesale on every cycle for presentation layers to read.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use market::{Direction, SignalResult};

/// One row of the monitoring snapshot.
///
/// Numeric fields stay zero when the alert could not be evaluated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertReport {
    pub symbol: String,
    pub name: String,
    pub alert_triggered: bool,
    pub message: Option<String>,
    pub current_price: f64,
    pub ma_value: f64,
    /// Absolute distance from the average, in percent.
    pub distance_percent: f64,
    pub direction: Option<Direction>,
}

impl AlertReport {
    pub fn empty(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            alert_triggered: false,
            message: None,
            current_price: 0.0,
            ma_value: 0.0,
            distance_percent: 0.0,
            direction: None,
        }
    }

    pub fn with_signal(mut self, signal: &SignalResult) -> Self {
        self.current_price = signal.current_price;
        self.ma_value = signal.moving_average;
        self.distance_percent = signal.distance_abs;
        self.direction = Some(signal.direction);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub stocks: Vec<AlertReport>,
    /// Local time, `%Y-%m-%d %H:%M:%S`.
    pub last_update: String,
}

/// Scan output: results plus summary counts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanReport {
    pub stocks: Vec<SignalResult>,
    pub metadata: ScanMetadata,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub total_count: usize,
    pub near_ma_count: usize,
    pub above_count: usize,
    pub below_count: usize,
    /// Seconds, two decimals.
    pub processing_time: f64,
    pub last_updated: String,
    pub version: String,
}

/// Writes JSON documents atomically: temp file in the same directory,
/// then rename over the target.
#[derive(Clone, Debug)]
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write<T: Serialize>(&self, doc: &T) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(doc).context("serialize snapshot")?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace {}", self.path.display()))?;

        Ok(())
    }

    pub async fn read(&self) -> anyhow::Result<Snapshot> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("read {}", self.path.display()))?;
        serde_json::from_slice(&bytes).context("parse snapshot")
    }
}
