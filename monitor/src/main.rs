use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use alerts::transport::callmebot::CallMeBotTransport;
use alerts::{CooldownGate, Notifier};
use common::logger::{LogFormat, init_logger};
use common::time::local_rfc3339;
use market::provider::YahooChartClient;
use market::BatchFetcher;
use market::universe::{DEFAULT_CONSTITUENTS_URL, WikipediaUniverse, resolve_universe};
use monitor::cli::{Cli, Command};
use monitor::config::MonitorConfig;
use monitor::gen_config::{generate_alerts, update_config_file};
use monitor::monitor::{Monitor, spawn_shutdown_listener};
use monitor::scan::{ScanService, statistics};
use monitor::snapshot::{ScanMetadata, ScanReport, SnapshotWriter};

fn load_config(path: &Path) -> anyhow::Result<MonitorConfig> {
    MonitorConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn build_notifier(cfg: &MonitorConfig) -> anyhow::Result<Notifier> {
    let gate = Arc::new(CooldownGate::new(cfg.cooldown()));

    match cfg.whatsapp_credentials() {
        Some((phone, api_key)) => {
            let transport = CallMeBotTransport::new(api_key.to_string(), cfg.request_timeout())?;
            tracing::info!("WhatsApp delivery configured");
            Ok(Notifier::new(gate, Arc::new(transport), phone))
        }
        None => {
            tracing::warn!("WhatsApp credentials not configured; alerts will only be logged");
            Ok(Notifier::local_only(gate))
        }
    }
}

async fn run(config: &Path) -> anyhow::Result<()> {
    let cfg = load_config(config)?;

    let alerts = cfg.alert_entries();
    if alerts.is_empty() {
        tracing::warn!(config = %config.display(), "no alerts configured; nothing to monitor");
        return Ok(());
    }

    let provider = Arc::new(YahooChartClient::from_env(cfg.request_timeout())?);
    let notifier = build_notifier(&cfg)?;
    let writer = SnapshotWriter::new(cfg.snapshot_path.clone());

    let monitor = Monitor::new(provider, notifier, alerts, writer, cfg.check_interval());

    let shutdown_rx = spawn_shutdown_listener(tokio::signal::ctrl_c());
    monitor.run(shutdown_rx).await;
    Ok(())
}

async fn scan(custom: Option<&str>, output: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let cfg = match config {
        Some(p) => load_config(p)?,
        None => MonitorConfig::default(),
    };

    let provider = Arc::new(YahooChartClient::from_env(cfg.request_timeout())?);
    let universe = Arc::new(WikipediaUniverse::new(
        DEFAULT_CONSTITUENTS_URL.to_string(),
        cfg.request_timeout(),
    )?);
    let fetcher = BatchFetcher::new(provider, cfg.fetch_config());
    let service = ScanService::new(fetcher, universe, cfg.cache_ttl());

    let response = service.stocks(custom).await;
    let stats = statistics(&response.stocks);

    let report = ScanReport {
        metadata: ScanMetadata {
            total_count: response.total_count,
            near_ma_count: stats.near_ma_count,
            above_count: stats.above_count,
            below_count: stats.below_count,
            processing_time: response.processing_time,
            last_updated: local_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        stocks: response.stocks,
    };

    SnapshotWriter::new(output).write(&report).await?;

    let counters = service.fetcher().counters().snapshot();
    tracing::info!(
        output = %output.display(),
        total = report.metadata.total_count,
        near_ma = report.metadata.near_ma_count,
        failed = counters.failed,
        "scan written"
    );
    Ok(())
}

async fn gen_config(config: &Path, ma_period: usize, threshold: f64) -> anyhow::Result<()> {
    let timeout = MonitorConfig::default().request_timeout();
    let universe = WikipediaUniverse::new(DEFAULT_CONSTITUENTS_URL.to_string(), timeout)?;
    let tickers = resolve_universe(&universe).await;

    let alerts = generate_alerts(&tickers, ma_period, threshold);
    update_config_file(config, &alerts).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logger("monitor", LogFormat::from_env());

    match cli.command {
        Command::Run { config } => run(&config).await,
        Command::Scan {
            custom,
            output,
            config,
        } => scan(custom.as_deref(), &output, config.as_deref()).await,
        Command::GenConfig {
            config,
            ma_period,
            threshold,
        } => gen_config(&config, ma_period, threshold).await,
    }
}
