use crate::features::observability::repo::ObservabilityRepository;
use crate::features::observability::service::ObservabilityService;
use crate::shared::error::{DispatcherError, DispatcherResult};
use crate::shared::types::DispatchOutcome;
use std::sync::Arc;

/// Outcome sink shared by the dispatch engine and the HTTP surface
pub struct ObservabilityController {
    service: ObservabilityService,
}

impl ObservabilityController {
    pub fn new(service: ObservabilityService) -> Self {
        Self { service }
    }

    pub fn with_history(history_limit: usize) -> DispatcherResult<Self> {
        let repo = ObservabilityRepository::new(history_limit)
            .map_err(DispatcherError::ConfigurationError)?;
        Ok(Self::new(ObservabilityService::new(Arc::new(repo))))
    }

    pub fn record_outcome(&self, outcome: DispatchOutcome) {
        self.service.record_outcome(outcome);
    }

    pub fn record_event_processed(&self) {
        self.service.record_event_processed();
    }

    pub fn set_addon_configs(&self, count: usize) {
        self.service.set_addon_configs(count);
    }

    pub fn recent_outcomes(&self, limit: usize) -> Result<Vec<DispatchOutcome>, String> {
        self.service.recent_outcomes(limit)
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        self.service.render_metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagrelay_core::Delivery;

    fn outcome(succeeded: bool, delivery: Option<Delivery>) -> DispatchOutcome {
        DispatchOutcome {
            addon_id: 1,
            provider: "jira".to_string(),
            event_id: 7,
            event_type: "toggle-updated".to_string(),
            succeeded,
            error: (!succeeded).then(|| "boom".to_string()),
            delivery,
            attempts: 1,
            duration_ms: 12,
            finished_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_metrics_render_contains_known_metric_names() {
        let controller = ObservabilityController::with_history(10).unwrap();
        controller.record_outcome(outcome(true, Some(Delivery::sent(1))));
        controller.record_event_processed();

        let rendered = controller.render_metrics().unwrap();
        assert!(rendered.contains("flagrelay_dispatch_total"));
        assert!(rendered.contains("flagrelay_dispatch_latency_seconds"));
        assert!(rendered.contains("flagrelay_events_processed_total 1"));
    }

    #[test]
    fn test_outcome_status_labels() {
        let controller = ObservabilityController::with_history(10).unwrap();
        controller.record_outcome(outcome(true, Some(Delivery::skipped("no jira tag"))));
        controller.record_outcome(outcome(false, None));

        let rendered = controller.render_metrics().unwrap();
        assert!(rendered.contains("status=\"skipped\""));
        assert!(rendered.contains("status=\"failed\""));

        let recent = controller.recent_outcomes(5).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(!recent[0].succeeded);
    }

    #[test]
    fn test_controllers_do_not_share_registries() {
        let first = ObservabilityController::with_history(10).unwrap();
        let second = ObservabilityController::with_history(10).unwrap();
        first.record_event_processed();

        assert!(second
            .render_metrics()
            .unwrap()
            .contains("flagrelay_events_processed_total 0"));
    }
}
