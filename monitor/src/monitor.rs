//! Monitoring Loop
//!
//! ```text
//! IDLE → EVALUATING → PERSISTING → SLEEPING → EVALUATING → ...
//!   └──────────────┴────────────┴──────────┴→ STOPPED (shutdown signal)
//! ```
//!
//! Each cycle evaluates every enabled alert in order, routes triggered
//! ones through the cooldown-gated [`Notifier`], then overwrites the
//! snapshot. Cycles never overlap. Nothing inside a cycle can end the
//! loop: provider, evaluation and configuration errors are logged per
//! alert, and a panicking evaluation is caught and logged the same way.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, warn};

use alerts::{AlertDefinition, EvalError, Notifier};
use common::logger::{TraceId, annotate_span, child_span, cycle_span, warn_if_slow};
use common::time::{local_timestamp, now_ms};
use market::MarketDataApi;

use crate::config::AlertEntry;
use crate::snapshot::{AlertReport, Snapshot, SnapshotWriter};

/// Flips the returned receiver to `true` once `signal` resolves.
///
/// If the signal cannot be installed the sender is parked instead of
/// dropped, so the loop keeps running rather than stopping on a closed
/// channel.
pub fn spawn_shutdown_listener<F>(signal: F) -> watch::Receiver<bool>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                info!("Shutdown signal received");
                let _ = tx.send(true);
            }
            Err(e) => {
                error!(error = ?e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
                drop(tx);
            }
        }
    });

    rx
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Evaluating,
    Persisting,
    Sleeping,
    Stopped,
}

pub struct Monitor<P: ?Sized> {
    provider: Arc<P>,
    notifier: Notifier,
    alerts: Vec<AlertEntry>,
    writer: SnapshotWriter,
    interval: Duration,
    state: watch::Sender<MonitorState>,
}

impl<P> Monitor<P>
where
    P: MarketDataApi + ?Sized,
{
    pub fn new(
        provider: Arc<P>,
        notifier: Notifier,
        alerts: Vec<AlertEntry>,
        writer: SnapshotWriter,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(MonitorState::Idle);
        Self {
            provider,
            notifier,
            alerts,
            writer,
            interval,
            state,
        }
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<MonitorState> {
        self.state.subscribe()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn set_state(&self, s: MonitorState) {
        self.state.send_replace(s);
        debug!(state = ?s, "monitor state");
    }

    /// Runs cycles until `shutdown` flips to `true` (or its sender is dropped).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            alerts = self.alerts.len(),
            interval_secs = self.interval.as_secs(),
            "stock alert monitor started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let interrupted = tokio::select! {
                _ = self.run_cycle() => false,
                _ = shutdown.changed() => true,
            };
            if interrupted {
                break;
            }

            self.set_state(MonitorState::Sleeping);
            info!(sleep_secs = self.interval.as_secs(), "check complete; sleeping");

            let interrupted = tokio::select! {
                _ = tokio::time::sleep(self.interval) => false,
                _ = shutdown.changed() => true,
            };
            if interrupted {
                break;
            }
        }

        self.set_state(MonitorState::Stopped);
        info!("stock alert monitor stopped");
    }

    /// One full cycle against the wall clock.
    pub async fn run_cycle(&self) -> Snapshot {
        self.run_cycle_at(now_ms()).await
    }

    /// Evaluates all alerts, then persists the snapshot. `now_ms` feeds the
    /// cooldown gate.
    pub async fn run_cycle_at(&self, now_ms: u64) -> Snapshot {
        let trace_id = TraceId::default();
        let span = cycle_span("monitor_cycle", &trace_id);

        async {
            self.set_state(MonitorState::Evaluating);
            info!("checking alerts");

            let mut stocks = Vec::with_capacity(self.alerts.len());
            for entry in &self.alerts {
                let guarded = AssertUnwindSafe(self.check_alert(entry, now_ms)).catch_unwind();

                match guarded.await {
                    Ok(Some(report)) => stocks.push(report),
                    Ok(None) => {}
                    Err(_) => {
                        error!(
                            alert = %entry.spec.name,
                            symbol = %entry.spec.symbol,
                            "alert evaluation panicked"
                        );
                        stocks.push(AlertReport::empty(&entry.spec.symbol, &entry.spec.name));
                    }
                }
            }

            self.set_state(MonitorState::Persisting);
            let snapshot = Snapshot {
                stocks,
                last_update: local_timestamp(),
            };

            let written = warn_if_slow(
                "snapshot_write",
                Duration::from_millis(500),
                self.writer.write(&snapshot),
            )
            .await;
            if let Err(e) = written {
                error!(error = ?e, path = %self.writer.path().display(), "error saving snapshot");
            }

            snapshot
        }
        .instrument(span)
        .await
    }

    /// Evaluates one configured alert. `None` for disabled alerts.
    async fn check_alert(&self, entry: &AlertEntry, now_ms: u64) -> Option<AlertReport> {
        if !entry.spec.enabled {
            return None;
        }

        let def: &AlertDefinition = match &entry.definition {
            Ok(def) => def,
            Err(e) => {
                error!(alert = %entry.spec.name, symbol = %entry.spec.symbol, error = %e, "invalid alert definition");
                return Some(AlertReport::empty(&entry.spec.symbol, &entry.spec.name));
            }
        };

        let key = def.key();
        let span = child_span("check_alert");

        let report = async {
            annotate_span(&def.symbol, Some(key.as_str()));

            let mut report = AlertReport::empty(&def.symbol, &def.name);

            let samples = match self
                .provider
                .fetch_series(&def.symbol, def.condition.lookback_periods())
                .await
            {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "no data available");
                    return report;
                }
            };

            let eval = match def.condition.evaluate(&def.symbol, &samples) {
                Ok(e) => e,
                Err(e @ EvalError::InsufficientData { .. }) => {
                    warn!(error = %e, "condition not evaluated");
                    return report;
                }
                Err(e) => {
                    error!(error = %e, "condition evaluation failed");
                    return report;
                }
            };

            report.current_price = eval.current_price;
            if let Some(signal) = &eval.signal {
                report = report.with_signal(signal);
            }
            report.alert_triggered = eval.triggered;
            report.message = eval.message.clone();

            if let (true, Some(message)) = (eval.triggered, eval.message.as_deref()) {
                let outcome = self
                    .notifier
                    .dispatch_at(&def.title(), &def.body(message), &key, now_ms)
                    .await;
                debug!(?outcome, "dispatch finished");
            }

            report
        }
        .instrument(span)
        .await;

        Some(report)
    }
}
