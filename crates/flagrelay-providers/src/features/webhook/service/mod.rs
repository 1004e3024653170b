use crate::features::http_delivery::{HttpDeliveryRepository, HttpRequest};
use flagrelay_core::{AddonParameters, CoreError, DomainEvent, Result};
use handlebars::Handlebars;
use serde_json::Value;
use std::sync::Arc;

/// Strategy used to turn a user supplied body template into the request body.
pub trait BodyRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String>;
}

/// Handlebars (mustache compatible) rendering without HTML escaping, so
/// templates can produce JSON.
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<String> {
        self.registry
            .render_template(template, context)
            .map_err(|e| CoreError::Template(e.to_string()))
    }
}

pub struct WebhookService {
    repo: Arc<dyn HttpDeliveryRepository>,
    renderer: Arc<dyn BodyRenderer>,
}

impl WebhookService {
    pub fn new(repo: Arc<dyn HttpDeliveryRepository>, renderer: Arc<dyn BodyRenderer>) -> Self {
        Self { repo, renderer }
    }

    /// Build the request body: the rendered template when one is configured,
    /// otherwise the event itself as JSON.
    pub fn build_request(
        &self,
        url: &str,
        body_template: Option<&str>,
        event_type: &str,
        event: &DomainEvent,
        parameters: &AddonParameters,
    ) -> Result<HttpRequest> {
        match body_template.filter(|t| !t.trim().is_empty()) {
            Some(template) => {
                let context = serde_json::json!({
                    "event": event,
                    "eventType": event_type,
                    "parameters": parameters,
                });
                let body = self.renderer.render(template, &context)?;
                Ok(HttpRequest::post_raw(url, body))
            }
            None => HttpRequest::post_json(url, event),
        }
    }

    pub async fn deliver(&self, request: HttpRequest) -> Result<()> {
        let url = request.url.clone();
        self.repo.post(&request).await?.ensure_success(&url)?;
        Ok(())
    }
}
