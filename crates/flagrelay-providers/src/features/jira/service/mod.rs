use crate::features::http_delivery::{HttpDeliveryRepository, HttpRequest};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flagrelay_core::{event_kind, CoreError, DomainEvent, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub const JIRA_TAG: &str = "jira";

/// Matches `[A-Z][A-Z0-9_]+-[0-9]+`, e.g. `OPS-12`.
pub fn is_issue_key(value: &str) -> bool {
    let Some((project, number)) = value.rsplit_once('-') else {
        return false;
    };
    let mut chars = project.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_uppercase());

    starts_with_letter
        && project.len() >= 2
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraCredentials {
    pub base_url: String,
    pub user: String,
    pub api_key: String,
}

impl JiraCredentials {
    pub fn authorization_header(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.user, self.api_key));
        format!("Basic {token}")
    }

    pub fn comment_url(&self, issue: &str) -> String {
        format!(
            "{}/rest/api/3/issue/{issue}/comment",
            self.base_url.trim_end_matches('/')
        )
    }
}

pub struct JiraService {
    repo: Arc<dyn HttpDeliveryRepository>,
    public_url: String,
}

impl JiraService {
    pub fn new(repo: Arc<dyn HttpDeliveryRepository>, public_url: impl Into<String>) -> Self {
        Self {
            repo,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn issues(event: &DomainEvent) -> Vec<&str> {
        event
            .tags_of_type(JIRA_TAG)
            .map(|tag| tag.value.as_str())
            .collect()
    }

    /// Atlassian document format body for the comment.
    pub fn format_comment(&self, event_type: &str, event: &DomainEvent) -> Value {
        let name = event.subject_name().unwrap_or_default();
        let action = event_kind::action(event_type).unwrap_or(event_type);

        json!({
            "body": {
                "type": "doc",
                "version": 1,
                "content": [
                    {
                        "type": "paragraph",
                        "content": [{
                            "type": "text",
                            "text": format!(
                                "Feature toggle \"{name}\" was {action} by {}",
                                event.created_by
                            ),
                        }],
                    },
                    {
                        "type": "paragraph",
                        "content": [{
                            "type": "text",
                            "text": format!(
                                "To see what happened visit {}/api/admin/features/{name}",
                                self.public_url
                            ),
                        }],
                    },
                ],
            }
        })
    }

    /// Comment on every issue. All issues are attempted; the call fails if
    /// any of them failed and names those issues. Values that are not issue
    /// keys are never put into a URL and count as failed.
    ///
    /// A dispatcher retry after a partial failure calls this again for every
    /// issue, so issues that already succeeded get a second comment.
    pub async fn comment_on_issues(
        &self,
        credentials: &JiraCredentials,
        issues: &[&str],
        comment: &Value,
    ) -> Result<usize> {
        let mut failed = Vec::new();

        for issue in issues {
            if !is_issue_key(issue) {
                warn!(%issue, "Tag value is not a Jira issue key");
                failed.push(format!("{issue}: not a Jira issue key"));
                continue;
            }

            let url = credentials.comment_url(issue);
            let request = HttpRequest::post_json(&url, comment)?
                .with_header("accept", "application/json")
                .with_header("authorization", credentials.authorization_header());

            info!(%issue, "Posting update to issue");
            let result = match self.repo.post(&request).await {
                Ok(response) => response.ensure_success(&url).map(|_| ()),
                Err(error) => Err(error),
            };

            if let Err(error) = result {
                warn!(%issue, error = %error, "Failed to comment on issue");
                failed.push(format!("{issue}: {error}"));
            }
        }

        if failed.is_empty() {
            Ok(issues.len())
        } else {
            Err(CoreError::Delivery(format!(
                "{} of {} issue comments failed ({})",
                failed.len(),
                issues.len(),
                failed.join("; ")
            )))
        }
    }
}
