use crate::features::dispatch::service::{DispatchHandle, DispatchService};
use crate::features::observability::controller::ObservabilityController;
use crate::shared::types::DomainEvent;
use flagrelay_core::ErrorResponse;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct DispatchController {
    service: Arc<DispatchService>,
    observability: Arc<ObservabilityController>,
}

impl DispatchController {
    pub fn new(service: Arc<DispatchService>, observability: Arc<ObservabilityController>) -> Self {
        Self {
            service,
            observability,
        }
    }

    pub async fn dispatch(&self, event: Arc<DomainEvent>) -> Result<DispatchHandle, ErrorResponse> {
        self.observability.record_event_processed();
        self.service.dispatch(event).await.map_err(|e| e.into())
    }

    /// Consume the event feed until it closes. Deliveries are not awaited, so
    /// a slow addon never holds up the next event.
    pub fn spawn_event_listener(
        self: Arc<Self>,
        mut receiver: broadcast::Receiver<Arc<DomainEvent>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Event listener started");
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        let event_id = event.id;
                        match self.dispatch(event).await {
                            Ok(handle) => {
                                debug!(event_id, deliveries = handle.len(), "Event dispatched");
                            }
                            Err(error) => {
                                warn!(event_id, error = %error.message, "Failed to dispatch event");
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event listener lagged behind the feed, events dropped");
                    }
                    Err(RecvError::Closed) => {
                        info!("Event feed closed, stopping listener");
                        break;
                    }
                }
            }
        })
    }
}
