use std::time::{Duration, Instant};

use tracing::{Span, field};

use super::TraceId;

/// Root span for one unit of work (a monitoring cycle, a universe scan).
pub fn cycle_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "cycle",
        name = %name,
        trace_id = %trace_id.as_str(),
        symbol = field::Empty,
        alert_key = field::Empty
    )
}

/// Child span; inherits the trace id from the enclosing cycle span.
pub fn child_span(name: &'static str) -> Span {
    tracing::info_span!(
        "child",
        name = %name,
        symbol = field::Empty,
        alert_key = field::Empty
    )
}

/// Records the instrument and alert key on the current span.
pub fn annotate_span(symbol: &str, alert_key: Option<&str>) {
    let span = Span::current();
    span.record("symbol", field::display(symbol));
    if let Some(key) = alert_key {
        span.record("alert_key", field::display(key));
    }
}

/// Awaits `fut` and emits a `performance` warning when it took longer than `max`.
pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
