use crate::features::observability::repo::ObservabilityRepository;
use crate::shared::types::DispatchOutcome;
use std::sync::Arc;
use tracing::warn;

pub struct ObservabilityService {
    repo: Arc<ObservabilityRepository>,
}

impl ObservabilityService {
    pub fn new(repo: Arc<ObservabilityRepository>) -> Self {
        Self { repo }
    }

    pub fn record_outcome(&self, outcome: DispatchOutcome) {
        self.repo.observe_dispatch(
            &outcome.provider,
            outcome.status_label(),
            outcome.duration_ms as f64 / 1000.0,
        );

        if let Err(error) = self.repo.push_outcome(outcome) {
            warn!(%error, "Failed to keep dispatch outcome");
        }
    }

    pub fn record_event_processed(&self) {
        self.repo.inc_events_processed();
    }

    pub fn set_addon_configs(&self, count: usize) {
        self.repo.set_addon_configs(count as f64);
    }

    pub fn recent_outcomes(&self, limit: usize) -> Result<Vec<DispatchOutcome>, String> {
        self.repo.recent_outcomes(limit)
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        self.repo.render_metrics()
    }
}
