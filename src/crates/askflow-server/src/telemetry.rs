//! Logging and metrics.
//!
//! Logging goes through `tracing-subscriber` with an `EnvFilter` (so
//! `RUST_LOG` works as usual) and optional JSON output for log shippers.
//! Metrics are prometheus counters and a latency histogram, rendered in
//! text exposition format by the `/metrics` handler.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Safe to call once per process.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Engine-level prometheus metrics.
pub struct Metrics {
    registry: Registry,
    pub engine_calls_total: IntCounter,
    pub engine_call_errors_total: IntCounter,
    pub engine_call_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let engine_calls_total =
            IntCounter::new("engine_calls_total", "Total engine invocations")?;
        let engine_call_errors_total = IntCounter::new(
            "engine_call_errors_total",
            "Total engine invocation errors",
        )?;
        let engine_call_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "engine_call_duration_seconds",
            "Engine call duration",
        ))?;
        registry.register(Box::new(engine_calls_total.clone()))?;
        registry.register(Box::new(engine_call_errors_total.clone()))?;
        registry.register(Box::new(engine_call_duration_seconds.clone()))?;
        Ok(Self {
            registry,
            engine_calls_total,
            engine_call_errors_total,
            engine_call_duration_seconds,
        })
    }

    /// Render all registered metrics in text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %err, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_render() {
        let metrics = Metrics::new().unwrap();
        metrics.engine_calls_total.inc();
        metrics.engine_call_errors_total.inc();
        let rendered = metrics.render();
        assert!(rendered.contains("engine_calls_total 1"));
        assert!(rendered.contains("engine_call_errors_total 1"));
        assert!(rendered.contains("engine_call_duration_seconds"));
    }
}
