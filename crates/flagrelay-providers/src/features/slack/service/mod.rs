use crate::features::http_delivery::{HttpDeliveryRepository, HttpRequest};
use flagrelay_core::{event_kind, DomainEvent, Result};
use serde::Serialize;
use std::sync::Arc;

pub const SLACK_TAG: &str = "slack";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    pub username: String,
    pub icon_emoji: String,
    pub text: String,
    pub channel: String,
}

pub struct SlackService {
    repo: Arc<dyn HttpDeliveryRepository>,
    public_url: String,
}

impl SlackService {
    pub fn new(repo: Arc<dyn HttpDeliveryRepository>, public_url: impl Into<String>) -> Self {
        Self {
            repo,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The first `slack` tag picks the channel; later slack tags are ignored.
    pub fn channel_for<'a>(event: &'a DomainEvent, default_channel: &'a str) -> &'a str {
        event
            .tags_of_type(SLACK_TAG)
            .next()
            .map(|tag| tag.value.as_str())
            .unwrap_or(default_channel)
    }

    pub fn format_message(
        &self,
        event_type: &str,
        event: &DomainEvent,
        default_channel: &str,
    ) -> SlackMessage {
        let name = event.subject_name().unwrap_or_default();
        let action = match event_kind::action(event_type) {
            Some(action) => format!("{action} feature toggle"),
            None => event_type.to_string(),
        };
        let link = format!(
            "<{}/#/features/strategies/{name}|{name}>",
            self.public_url
        );

        SlackMessage {
            username: "Feature Toggles".to_string(),
            icon_emoji: ":triangular_flag_on_post:".to_string(),
            text: format!("{} {action} {link}", event.created_by),
            channel: format!("#{}", Self::channel_for(event, default_channel)),
        }
    }

    pub async fn post_message(&self, url: &str, message: &SlackMessage) -> Result<()> {
        let request = HttpRequest::post_json(url, message)?;
        self.repo.post(&request).await?.ensure_success(url)?;
        Ok(())
    }
}
