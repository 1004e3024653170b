pub mod service;

use crate::features::http_delivery::HttpDeliveryRepository;
use crate::{lifecycle_events, required_parameter};
use async_trait::async_trait;
use flagrelay_core::{
    AddonParameters, AddonProvider, Delivery, DomainEvent, ParameterDefinition, ParameterType,
    ProviderDefinition, Result,
};
use service::{BodyRenderer, HandlebarsRenderer, WebhookService};
use std::sync::Arc;
use tracing::info;

pub const PROVIDER_NAME: &str = "webhook";

pub fn definition() -> ProviderDefinition {
    ProviderDefinition {
        name: PROVIDER_NAME.to_string(),
        display_name: "Webhook".to_string(),
        description: "Webhooks are a simple way to post messages to third party services \
            using a plain HTTP POST with a payload you may define yourself."
            .to_string(),
        parameters: vec![
            ParameterDefinition::required("url", "Webhook URL", ParameterType::Url),
            ParameterDefinition::optional("bodyTemplate", "Body template", ParameterType::Textfield)
                .with_description(
                    "You may format the body using a mustache/handlebars template. \
                     If you don't specify anything, the event is posted as JSON.",
                ),
        ],
        events: lifecycle_events(),
        tag_types: vec![],
    }
}

/// Generic HTTP POST of every matching event.
pub struct WebhookProvider {
    definition: ProviderDefinition,
    service: WebhookService,
}

impl WebhookProvider {
    pub fn new(repo: Arc<dyn HttpDeliveryRepository>) -> Self {
        Self::with_renderer(repo, Arc::new(HandlebarsRenderer::new()))
    }

    pub fn with_renderer(
        repo: Arc<dyn HttpDeliveryRepository>,
        renderer: Arc<dyn BodyRenderer>,
    ) -> Self {
        Self {
            definition: definition(),
            service: WebhookService::new(repo, renderer),
        }
    }
}

#[async_trait]
impl AddonProvider for WebhookProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    async fn handle_event(
        &self,
        event_type: &str,
        event: &DomainEvent,
        parameters: &AddonParameters,
    ) -> Result<Delivery> {
        let url = required_parameter(parameters, "url")?;
        let body_template = parameters.get("bodyTemplate").map(String::as_str);

        let request =
            self.service
                .build_request(url, body_template, event_type, event, parameters)?;
        self.service.deliver(request).await?;

        info!(provider = PROVIDER_NAME, event_id = event.id, %event_type, "Webhook triggered");
        Ok(Delivery::sent(1))
    }
}
