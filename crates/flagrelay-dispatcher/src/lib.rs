pub mod features;
pub mod server;
pub mod shared;

#[cfg(test)]
pub(crate) mod testing;

use features::addon_management::controller::AddonController;
use features::addon_management::repo::cache::CachedAddonRepository;
use features::addon_management::repo::{AddonRepository, InMemoryAddonRepository};
use features::addon_management::service::AddonService;
use features::dispatch::controller::DispatchController;
use features::dispatch::service::DispatchService;
use features::event_feed::repo::{EventRepository, InMemoryEventRepository};
use features::observability::controller::ObservabilityController;
use features::tag_types::repo::InMemoryTagTypeRepository;
use features::tag_types::service::TagTypeService;
use flagrelay_core::ProviderRegistry;
use shared::config::DispatcherConfig;
use shared::error::{DispatcherError, DispatcherResult};
use shared::types::{AddonSeed, DomainEvent};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// The assembled dispatcher: stores, services and controllers sharing one
/// provider registry and one event feed.
pub struct FlagRelay {
    config: DispatcherConfig,
    registry: Arc<ProviderRegistry>,
    events: Arc<dyn EventRepository>,
    addons: Arc<AddonController>,
    dispatch: Arc<DispatchController>,
    tag_types: Arc<TagTypeService>,
    observability: Arc<ObservabilityController>,
}

impl FlagRelay {
    pub fn new(config: DispatcherConfig, registry: ProviderRegistry) -> DispatcherResult<Self> {
        let registry = Arc::new(registry);
        let events: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new(
            config.event_buffer,
            config.event_history,
        ));
        let store: Arc<dyn AddonRepository> = Arc::new(CachedAddonRepository::new(
            Arc::new(InMemoryAddonRepository::new()),
            config.addon_cache_ttl,
        ));
        let observability = Arc::new(ObservabilityController::with_history(
            config.outcome_history,
        )?);

        let addon_service = Arc::new(AddonService::new(
            store.clone(),
            registry.clone(),
            events.clone(),
        ));
        let dispatch_service = Arc::new(
            DispatchService::new(
                store,
                registry.clone(),
                observability.clone(),
                config.delivery_timeout,
            )
            .with_retry_policy(config.retry_policy),
        );
        let tag_types = Arc::new(TagTypeService::new(Arc::new(
            InMemoryTagTypeRepository::new(),
        )));

        Ok(Self {
            config,
            registry,
            events,
            addons: Arc::new(AddonController::new(addon_service)),
            dispatch: Arc::new(DispatchController::new(
                dispatch_service,
                observability.clone(),
            )),
            tag_types,
            observability,
        })
    }

    /// Register provider tag types and create the addons listed in the
    /// configured addons file.
    pub async fn bootstrap(&self) -> DispatcherResult<()> {
        let registered = self
            .tag_types
            .register_provider_tag_types(&self.registry)
            .await?;
        info!(registered, "Provider tag types registered");

        if let Some(path) = &self.config.addons_file {
            let seeds = load_addon_seeds(path)?;
            let total = seeds.len();
            let created = self.addons.load_seeds(seeds).await;
            info!(path = %path.display(), created, total, "Addon seeds loaded");
        }
        Ok(())
    }

    /// Start consuming the event feed.
    pub fn start(&self) -> JoinHandle<()> {
        self.dispatch
            .clone()
            .spawn_event_listener(self.events.subscribe())
    }

    /// Store an event on the feed; the listener dispatches it.
    pub async fn publish(&self, event: DomainEvent) -> DispatcherResult<DomainEvent> {
        self.events.append(event).await
    }

    pub fn addons(&self) -> &AddonController {
        &self.addons
    }

    pub fn dispatch(&self) -> &DispatchController {
        &self.dispatch
    }

    pub fn tag_types(&self) -> &TagTypeService {
        &self.tag_types
    }

    pub fn observability(&self) -> &ObservabilityController {
        &self.observability
    }
}

pub fn load_addon_seeds(path: &Path) -> DispatcherResult<Vec<AddonSeed>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        DispatcherError::ConfigurationError(format!(
            "cannot read addons file {}: {e}",
            path.display()
        ))
    })?;
    parse_addon_seeds(&raw)
}

/// The addons file is a JSON array of addon configurations, each with an
/// optional `createdBy`.
pub fn parse_addon_seeds(raw: &str) -> DispatcherResult<Vec<AddonSeed>> {
    serde_json::from_str(raw)
        .map_err(|e| DispatcherError::ConfigurationError(format!("invalid addons file: {e}")))
}
