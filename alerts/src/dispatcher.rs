//! Notification Dispatcher
//!
//! Gate, send, record:
//! - suppressed by the cooldown gate → debug log, transport untouched
//! - allowed → one delivery attempt (or a local log line when no
//!   transport is configured), outcome logged, never raised
//!
//! The cooldown timestamp is recorded for every non-suppressed attempt,
//! including failed deliveries, so a broken transport cannot cause a
//! repeat of the same message every cycle.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use common::time::now_ms;

use crate::cooldown::CooldownGate;
use crate::key::AlertKey;
use crate::transport::NotificationTransport;

/// What happened to one dispatch request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Inside the cooldown window; nothing sent.
    Suppressed,
    /// Transport answered 200.
    Delivered,
    /// Transport answered with another status.
    Rejected { status: u16 },
    /// Transport call itself failed.
    Failed,
    /// No transport configured; logged locally.
    LoggedOnly,
}

impl DispatchOutcome {
    /// True when the gate let the request through.
    pub fn fired(&self) -> bool {
        !matches!(self, DispatchOutcome::Suppressed)
    }
}

struct Delivery {
    transport: Arc<dyn NotificationTransport>,
    destination: String,
}

pub struct Notifier {
    gate: Arc<CooldownGate>,
    delivery: Option<Delivery>,
}

impl Notifier {
    /// Notifier without a transport: alerts are only logged.
    pub fn local_only(gate: Arc<CooldownGate>) -> Self {
        Self {
            gate,
            delivery: None,
        }
    }

    pub fn new(
        gate: Arc<CooldownGate>,
        transport: Arc<dyn NotificationTransport>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            delivery: Some(Delivery {
                transport,
                destination: destination.into(),
            }),
        }
    }

    pub fn gate(&self) -> &Arc<CooldownGate> {
        &self.gate
    }

    pub fn is_configured(&self) -> bool {
        self.delivery.is_some()
    }

    pub async fn dispatch(&self, title: &str, body: &str, key: &AlertKey) -> DispatchOutcome {
        self.dispatch_at(title, body, key, now_ms()).await
    }

    /// [`Notifier::dispatch`] against an explicit clock reading.
    #[instrument(skip(self, title, body), fields(alert_key = %key))]
    pub async fn dispatch_at(
        &self,
        title: &str,
        body: &str,
        key: &AlertKey,
        now_ms: u64,
    ) -> DispatchOutcome {
        // Claimed before the send so concurrent callers for one key cannot both pass.
        if !self.gate.try_claim(key, now_ms) {
            debug!("skipping alert (cooldown active)");
            return DispatchOutcome::Suppressed;
        }

        match &self.delivery {
            Some(Delivery {
                transport,
                destination,
            }) => {
                let message = format!("*{title}*\n{body}");
                match transport.send(destination, &message).await {
                    Ok(200) => {
                        info!(title, body, "alert sent");
                        DispatchOutcome::Delivered
                    }
                    Ok(status) => {
                        error!(status, "failed to send alert: unexpected status");
                        DispatchOutcome::Rejected { status }
                    }
                    Err(e) => {
                        error!(error = %e, "failed to send alert");
                        DispatchOutcome::Failed
                    }
                }
            }
            None => {
                warn!("notification transport not configured; alert logged only");
                info!(title, body, "ALERT");
                DispatchOutcome::LoggedOnly
            }
        }
    }
}
