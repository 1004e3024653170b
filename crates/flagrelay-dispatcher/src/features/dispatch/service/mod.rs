use crate::features::addon_management::repo::AddonRepository;
use crate::features::observability::controller::ObservabilityController;
use crate::shared::error::DispatcherResult;
use crate::shared::types::{AddonInstance, DispatchOutcome, DomainEvent};
use chrono::Utc;
use flagrelay_core::{AddonProvider, Delivery, ProviderRegistry, RetryPolicy};
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// An addon selected for an event, with its resolved handler.
pub struct DispatchTarget {
    pub addon: AddonInstance,
    pub provider: Arc<dyn AddonProvider>,
}

/// Pick the addons that receive an event of kind `event_type`: enabled,
/// provider installed and declaring the kind, and the addon's own filter
/// accepting it. Result is ordered by addon id.
pub fn select_targets(
    addons: Vec<AddonInstance>,
    registry: &ProviderRegistry,
    event_type: &str,
) -> Vec<DispatchTarget> {
    let mut targets: Vec<DispatchTarget> = addons
        .into_iter()
        .filter(|addon| addon.enabled())
        .filter_map(|addon| match registry.get(addon.provider()) {
            Ok(provider) => Some(DispatchTarget { addon, provider }),
            Err(error) => {
                warn!(addon_id = addon.id, error = %error, "Stored addon references a provider that is not installed");
                None
            }
        })
        .filter(|target| target.provider.definition().declares_event(event_type))
        .filter(|target| target.addon.subscribes_to(event_type))
        .collect();

    targets.sort_by_key(|target| target.addon.id);
    targets
}

struct PendingDelivery {
    addon_id: u64,
    provider: String,
    handle: JoinHandle<DispatchOutcome>,
}

/// Deliveries started for one event. Dropping the handle detaches them; they
/// still run to completion and report to the observability sink.
pub struct DispatchHandle {
    event_id: u64,
    event_type: String,
    deliveries: Vec<PendingDelivery>,
}

impl DispatchHandle {
    pub fn addon_ids(&self) -> Vec<u64> {
        self.deliveries.iter().map(|d| d.addon_id).collect()
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Wait for every delivery. Outcomes are sorted by addon id.
    pub async fn outcomes(self) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::with_capacity(self.deliveries.len());

        for pending in self.deliveries {
            match pending.handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => {
                    warn!(addon_id = pending.addon_id, error = %error, "Delivery task did not finish");
                    outcomes.push(DispatchOutcome {
                        addon_id: pending.addon_id,
                        provider: pending.provider,
                        event_id: self.event_id,
                        event_type: self.event_type.clone(),
                        succeeded: false,
                        error: Some(format!("delivery task did not finish: {error}")),
                        delivery: None,
                        attempts: 0,
                        duration_ms: 0,
                        finished_at: Utc::now(),
                    });
                }
            }
        }

        outcomes.sort_by_key(|outcome| outcome.addon_id);
        outcomes
    }
}

#[derive(Debug, Clone, Copy)]
struct DeliverySettings {
    timeout: Duration,
    retry_policy: RetryPolicy,
}

/// Matches events to addons and runs their handlers, one task per addon.
pub struct DispatchService {
    addons: Arc<dyn AddonRepository>,
    registry: Arc<ProviderRegistry>,
    observability: Arc<ObservabilityController>,
    settings: DeliverySettings,
}

impl DispatchService {
    pub fn new(
        addons: Arc<dyn AddonRepository>,
        registry: Arc<ProviderRegistry>,
        observability: Arc<ObservabilityController>,
        timeout: Duration,
    ) -> Self {
        Self {
            addons,
            registry,
            observability,
            settings: DeliverySettings {
                timeout,
                retry_policy: RetryPolicy::never(),
            },
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.settings.retry_policy = retry_policy;
        self
    }

    /// Start one delivery per matching addon and return without waiting for
    /// them.
    pub async fn dispatch(&self, event: Arc<DomainEvent>) -> DispatcherResult<DispatchHandle> {
        let targets = self.targets_for(&event).await?;

        if targets.is_empty() {
            debug!(event_id = event.id, event_type = %event.event_type, "No addons subscribed to event");
        } else {
            debug!(
                event_id = event.id,
                event_type = %event.event_type,
                targets = targets.len(),
                "Dispatching event"
            );
        }

        let deliveries = targets
            .into_iter()
            .map(|target| {
                let addon_id = target.addon.id;
                let provider = target.addon.provider().to_string();
                let handle = tokio::spawn(deliver(
                    target,
                    event.clone(),
                    self.settings,
                    self.observability.clone(),
                ));
                PendingDelivery {
                    addon_id,
                    provider,
                    handle,
                }
            })
            .collect();

        Ok(DispatchHandle {
            event_id: event.id,
            event_type: event.event_type.clone(),
            deliveries,
        })
    }

    async fn targets_for(&self, event: &DomainEvent) -> DispatcherResult<Vec<DispatchTarget>> {
        let addons = self.addons.list().await?;
        self.observability.set_addon_configs(addons.len());
        Ok(select_targets(addons, &self.registry, &event.event_type))
    }
}

async fn deliver(
    target: DispatchTarget,
    event: Arc<DomainEvent>,
    settings: DeliverySettings,
    observability: Arc<ObservabilityController>,
) -> DispatchOutcome {
    let addon = Arc::new(target.addon);
    let started = Instant::now();
    let mut attempts = 0u32;

    let result = loop {
        attempts += 1;
        match invoke_once(&target.provider, &addon, &event, settings.timeout).await {
            Ok(delivery) => break Ok(delivery),
            Err(error) if attempts <= settings.retry_policy.max_retries => {
                let delay = settings.retry_policy.delay_for(attempts - 1);
                debug!(
                    addon_id = addon.id,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retrying addon delivery"
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => break Err(error),
        }
    };

    let outcome = DispatchOutcome {
        addon_id: addon.id,
        provider: addon.provider().to_string(),
        event_id: event.id,
        event_type: event.event_type.clone(),
        succeeded: result.is_ok(),
        error: result.as_ref().err().cloned(),
        delivery: result.ok(),
        attempts,
        duration_ms: started.elapsed().as_millis() as u64,
        finished_at: Utc::now(),
    };

    match &outcome.error {
        Some(error) => warn!(
            addon_id = outcome.addon_id,
            provider = %outcome.provider,
            event_id = outcome.event_id,
            event_type = %outcome.event_type,
            attempts,
            error = %error,
            "Addon delivery failed"
        ),
        None => debug!(
            addon_id = outcome.addon_id,
            provider = %outcome.provider,
            event_id = outcome.event_id,
            status = outcome.status_label(),
            duration_ms = outcome.duration_ms,
            "Addon delivery finished"
        ),
    }

    observability.record_outcome(outcome.clone());
    outcome
}

/// Run the handler on its own task so a panic stays inside this delivery.
/// The task is aborted when the timeout elapses.
async fn invoke_once(
    provider: &Arc<dyn AddonProvider>,
    addon: &Arc<AddonInstance>,
    event: &Arc<DomainEvent>,
    timeout: Duration,
) -> Result<Delivery, String> {
    let provider = provider.clone();
    let addon = addon.clone();
    let event = event.clone();

    let task = tokio::spawn(async move {
        provider
            .handle_event(&event.event_type, &event, addon.parameters())
            .await
    });
    let abort = task.abort_handle();

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(delivery))) => Ok(delivery),
        Ok(Ok(Err(error))) => Err(error.to_string()),
        Ok(Err(join_error)) if join_error.is_panic() => Err(format!(
            "handler panicked: {}",
            panic_message(join_error.into_panic())
        )),
        Ok(Err(join_error)) => Err(format!("handler task cancelled: {join_error}")),
        Err(_) => {
            abort.abort();
            Err(format!("handler timed out after {}ms", timeout.as_millis()))
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
