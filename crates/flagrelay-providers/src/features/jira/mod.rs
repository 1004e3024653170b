pub mod service;

use crate::features::http_delivery::HttpDeliveryRepository;
use crate::{lifecycle_events, required_parameter};
use async_trait::async_trait;
use flagrelay_core::{
    AddonParameters, AddonProvider, Delivery, DomainEvent, ParameterDefinition, ParameterType,
    ProviderDefinition, Result, TagTypeDefinition,
};
use service::{JiraCredentials, JiraService, JIRA_TAG};
use std::sync::Arc;
use tracing::debug;

pub const PROVIDER_NAME: &str = "jira";

pub fn definition() -> ProviderDefinition {
    ProviderDefinition {
        name: PROVIDER_NAME.to_string(),
        display_name: "Jira".to_string(),
        description: "Comments on Jira issues tagged on a feature toggle.".to_string(),
        parameters: vec![
            ParameterDefinition::required(
                "baseUrl",
                "Jira base url e.g. https://myjira",
                ParameterType::Url,
            ),
            ParameterDefinition::required("apiKey", "Jira API key", ParameterType::Text)
                .with_description(
                    "Used to authenticate against JIRA REST api, needs to be for a user \
                     with comment access to issues",
                ),
            ParameterDefinition::required("user", "JIRA username", ParameterType::Text)
                .with_description("Used together with API key to authenticate against JIRA"),
        ],
        events: lifecycle_events(),
        tag_types: vec![TagTypeDefinition {
            name: JIRA_TAG.to_string(),
            description: "Jira tag used by the jira addon to specify the JIRA issue to comment on"
                .to_string(),
            icon: "J".to_string(),
        }],
    }
}

/// Issue tracker commenter. Every `jira` tag on the event gets a comment;
/// events without one are skipped.
pub struct JiraProvider {
    definition: ProviderDefinition,
    service: JiraService,
}

impl JiraProvider {
    pub fn new(repo: Arc<dyn HttpDeliveryRepository>, public_url: impl Into<String>) -> Self {
        Self {
            definition: definition(),
            service: JiraService::new(repo, public_url),
        }
    }
}

#[async_trait]
impl AddonProvider for JiraProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    async fn handle_event(
        &self,
        event_type: &str,
        event: &DomainEvent,
        parameters: &AddonParameters,
    ) -> Result<Delivery> {
        let issues = JiraService::issues(event);
        if issues.is_empty() {
            debug!(provider = PROVIDER_NAME, event_id = event.id, "No jira tag on event");
            return Ok(Delivery::skipped("no jira tag on event"));
        }

        let credentials = JiraCredentials {
            base_url: required_parameter(parameters, "baseUrl")?.to_string(),
            user: required_parameter(parameters, "user")?.to_string(),
            api_key: required_parameter(parameters, "apiKey")?.to_string(),
        };
        let comment = self.service.format_comment(event_type, event);

        let posted = self
            .service
            .comment_on_issues(&credentials, &issues, &comment)
            .await?;
        Ok(Delivery::sent(posted))
    }
}
