pub mod service;

use crate::features::http_delivery::HttpDeliveryRepository;
use crate::{lifecycle_events, required_parameter};
use async_trait::async_trait;
use flagrelay_core::{
    AddonParameters, AddonProvider, Delivery, DomainEvent, ParameterDefinition, ParameterType,
    ProviderDefinition, Result, TagTypeDefinition,
};
use service::{SlackService, SLACK_TAG};
use std::sync::Arc;
use tracing::info;

pub const PROVIDER_NAME: &str = "slack";

pub fn definition() -> ProviderDefinition {
    ProviderDefinition {
        name: PROVIDER_NAME.to_string(),
        display_name: "Slack".to_string(),
        description: "Posts feature toggle changes to a Slack channel.".to_string(),
        parameters: vec![
            ParameterDefinition::required("url", "Slack webhook URL", ParameterType::Url),
            ParameterDefinition::required("defaultChannel", "Default channel", ParameterType::Text)
                .with_description(
                    "Default channel to post updates to if not specified in the slack-tag",
                ),
        ],
        events: lifecycle_events(),
        tag_types: vec![TagTypeDefinition {
            name: SLACK_TAG.to_string(),
            description: "Slack tag used by the slack addon to specify the slack channel."
                .to_string(),
            icon: "S".to_string(),
        }],
    }
}

/// Chat notifier. One message per event, routed by the first `slack` tag.
pub struct SlackProvider {
    definition: ProviderDefinition,
    service: SlackService,
}

impl SlackProvider {
    pub fn new(repo: Arc<dyn HttpDeliveryRepository>, public_url: impl Into<String>) -> Self {
        Self {
            definition: definition(),
            service: SlackService::new(repo, public_url),
        }
    }
}

#[async_trait]
impl AddonProvider for SlackProvider {
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
        let default_channel = required_parameter(parameters, "defaultChannel")?;

        let message = self.service.format_message(event_type, event, default_channel);
        self.service.post_message(url, &message).await?;

        info!(provider = PROVIDER_NAME, event_id = event.id, channel = %message.channel, "Posted Slack message");
        Ok(Delivery::sent(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::http_delivery::repo::MockHttpDeliveryRepository;
    use crate::features::http_delivery::{HttpRequest, HttpResponse};
    use flagrelay_core::{event_kind, CoreError, EventTag};

    fn parameters() -> AddonParameters {
        let mut parameters = AddonParameters::new();
        parameters.insert("url".to_string(), "https://hooks.slack.test/T1".to_string());
        parameters.insert("defaultChannel".to_string(), "general".to_string());
        parameters
    }

    #[test]
    fn test_definition_declares_slack_tag_type() {
        let definition = definition();
        assert_eq!(definition.tag_types.len(), 1);
        assert_eq!(definition.tag_types[0].name, "slack");
        assert_eq!(definition.required_parameters().count(), 2);
    }

    #[tokio::test]
    async fn test_posts_to_tagged_channel() {
        let mut repo = MockHttpDeliveryRepository::new();
        repo.expect_post()
            .withf(|req: &HttpRequest| {
                let body: serde_json::Value = serde_json::from_str(&req.body).unwrap();
                req.url == "https://hooks.slack.test/T1" && body["channel"] == "#ops"
            })
            .times(1)
            .returning(|_| {
                Ok(HttpResponse {
                    status: 200,
                    body: "ok".to_string(),
                })
            });
        let provider = SlackProvider::new(Arc::new(repo), "http://localhost:4242");
        let event = DomainEvent::new(
            event_kind::TOGGLE_CREATED,
            "a@b.com",
            serde_json::json!({ "name": "f1" }),
        )
        .with_tags(vec![EventTag::new("slack", "ops")]);

        let delivery = provider
            .handle_event(event_kind::TOGGLE_CREATED, &event, &parameters())
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::sent(1));
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let mut repo = MockHttpDeliveryRepository::new();
        repo.expect_post()
            .times(1)
            .returning(|_| Err(CoreError::Delivery("connection refused".to_string())));
        let provider = SlackProvider::new(Arc::new(repo), "http://localhost:4242");
        let event = DomainEvent::new(event_kind::TOGGLE_CREATED, "a@b.com", serde_json::json!({}));

        let result = provider
            .handle_event(event_kind::TOGGLE_CREATED, &event, &parameters())
            .await;
        assert!(matches!(result, Err(CoreError::Delivery(_))));
    }
}
