use crate::shared::types::DispatchOutcome;
use prometheus::{
    opts, Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Registry,
    TextEncoder,
};
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct ObservabilityRepository {
    registry: Registry,
    dispatch_total: CounterVec,
    dispatch_latency_seconds: HistogramVec,
    events_processed_total: Counter,
    addon_configs: Gauge,
    history_limit: usize,
    history: Mutex<VecDeque<DispatchOutcome>>,
}

impl ObservabilityRepository {
    pub fn new(history_limit: usize) -> Result<Self, String> {
        let registry = Registry::new();

        let dispatch_total = CounterVec::new(
            opts!(
                "flagrelay_dispatch_total",
                "Addon handler invocations by outcome"
            ),
            &["provider", "status"],
        )
        .map_err(|e| e.to_string())?;
        let dispatch_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "flagrelay_dispatch_latency_seconds",
                "Addon handler invocation latency (seconds)",
            ),
            &["provider"],
        )
        .map_err(|e| e.to_string())?;
        let events_processed_total = Counter::with_opts(opts!(
            "flagrelay_events_processed_total",
            "Domain events taken off the event feed"
        ))
        .map_err(|e| e.to_string())?;
        let addon_configs =
            Gauge::with_opts(opts!("flagrelay_addon_configs", "Stored addon configurations"))
                .map_err(|e| e.to_string())?;

        registry
            .register(Box::new(dispatch_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(dispatch_latency_seconds.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(events_processed_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(addon_configs.clone()))
            .map_err(|e| e.to_string())?;

        Ok(Self {
            registry,
            dispatch_total,
            dispatch_latency_seconds,
            events_processed_total,
            addon_configs,
            history_limit,
            history: Mutex::new(VecDeque::with_capacity(history_limit.min(1024))),
        })
    }

    pub fn observe_dispatch(&self, provider: &str, status: &str, seconds: f64) {
        self.dispatch_total
            .with_label_values(&[provider, status])
            .inc();
        self.dispatch_latency_seconds
            .with_label_values(&[provider])
            .observe(seconds);
    }

    pub fn inc_events_processed(&self) {
        self.events_processed_total.inc();
    }

    pub fn set_addon_configs(&self, count: f64) {
        self.addon_configs.set(count);
    }

    /// Keep at most `history_limit` outcomes, dropping the oldest.
    pub fn push_outcome(&self, outcome: DispatchOutcome) -> Result<(), String> {
        if self.history_limit == 0 {
            return Ok(());
        }
        let mut history = self
            .history
            .lock()
            .map_err(|_| "outcome history lock poisoned".to_string())?;
        while history.len() >= self.history_limit {
            history.pop_front();
        }
        history.push_back(outcome);
        Ok(())
    }

    /// Newest first
    pub fn recent_outcomes(&self, limit: usize) -> Result<Vec<DispatchOutcome>, String> {
        let history = self
            .history
            .lock()
            .map_err(|_| "outcome history lock poisoned".to_string())?;
        Ok(history.iter().rev().take(limit).cloned().collect())
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }
}
