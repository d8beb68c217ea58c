//! Writes `near_ma` alerts for a ticker universe into the YAML config.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde_yaml::{Mapping, Value};
use tracing::info;

use alerts::AlertSpec;

/// One enabled `near_ma` alert per ticker.
pub fn generate_alerts<S: AsRef<str>>(
    tickers: &[S],
    ma_period: usize,
    threshold_percent: f64,
) -> Vec<AlertSpec> {
    tickers
        .iter()
        .map(|t| {
            let ticker = t.as_ref();

            let mut params = Mapping::new();
            params.insert("ma_period".into(), Value::from(ma_period as u64));
            params.insert("threshold_percent".into(), Value::from(threshold_percent));

            AlertSpec {
                name: format!("{ticker} near {ma_period}-day MA"),
                symbol: ticker.to_string(),
                condition: "near_ma".to_string(),
                params: Value::Mapping(params),
                enabled: true,
            }
        })
        .collect()
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".backup");
    PathBuf::from(p)
}

/// Replaces the `alerts` list in `path`, keeping every other key.
///
/// An existing file is first copied verbatim to `<path>.backup`. A missing
/// file is created.
pub async fn update_config_file(path: &Path, alerts: &[AlertSpec]) -> anyhow::Result<()> {
    let mut doc = match tokio::fs::read_to_string(path).await {
        Ok(raw) => {
            let backup = backup_path(path);
            tokio::fs::write(&backup, &raw)
                .await
                .with_context(|| format!("writing {}", backup.display()))?;
            info!(backup = %backup.display(), "backed up existing config");

            if raw.trim().is_empty() {
                Mapping::new()
            } else {
                match serde_yaml::from_str::<Value>(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
                {
                    Value::Mapping(m) => m,
                    Value::Null => Mapping::new(),
                    _ => bail!("{} is not a YAML mapping", path.display()),
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Mapping::new(),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };

    doc.insert("alerts".into(), serde_yaml::to_value(alerts)?);

    let out = serde_yaml::to_string(&Value::Mapping(doc))?;
    tokio::fs::write(path, out)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), count = alerts.len(), "config updated");
    Ok(())
}
