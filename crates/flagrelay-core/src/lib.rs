pub mod provider;
pub mod registry;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use provider::{
    AddonProvider, Delivery, ParameterDefinition, ParameterType, ProviderDefinition,
    TagTypeDefinition,
};
pub use registry::ProviderRegistry;
pub use validation::validate_addon_config;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("Unknown addon provider {0}")]
    UnknownProvider(String),
    #[error("Addon provider already registered: {0}")]
    DuplicateProvider(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Delivery error: {0}")]
    Delivery(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Template error: {0}")]
    Template(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Event kinds emitted by the toggle lifecycle. Kinds are opaque strings
/// for matching; these are the ones the bundled providers react to.
pub mod event_kind {
    pub const TOGGLE_CREATED: &str = "toggle-created";
    pub const TOGGLE_UPDATED: &str = "toggle-updated";
    pub const TOGGLE_ARCHIVED: &str = "toggle-archived";
    pub const TOGGLE_REVIVED: &str = "toggle-revived";

    pub const ADDON_CONFIG_CREATED: &str = "addon-config-created";
    pub const ADDON_CONFIG_UPDATED: &str = "addon-config-updated";
    pub const ADDON_CONFIG_DELETED: &str = "addon-config-deleted";

    pub const TOGGLE_LIFECYCLE: [&str; 4] = [
        TOGGLE_CREATED,
        TOGGLE_UPDATED,
        TOGGLE_ARCHIVED,
        TOGGLE_REVIVED,
    ];

    /// Past-tense verb used in human readable notifications.
    pub fn action(kind: &str) -> Option<&'static str> {
        match kind {
            TOGGLE_CREATED => Some("created"),
            TOGGLE_UPDATED => Some("updated"),
            TOGGLE_ARCHIVED => Some("archived"),
            TOGGLE_REVIVED => Some("revived"),
            _ => None,
        }
    }
}

/// Parameters of an addon instance, keyed by the provider's parameter names.
pub type AddonParameters = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventTag {
    #[serde(rename = "type")]
    pub tag_type: String,
    pub value: String,
}

impl EventTag {
    pub fn new(tag_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag_type: tag_type.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    /// Assigned by the event feed when the event is stored.
    #[serde(default)]
    pub id: u64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created_by: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<EventTag>,
}

impl DomainEvent {
    pub fn new(
        event_type: impl Into<String>,
        created_by: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: 0,
            event_type: event_type.into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            data,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<EventTag>) -> Self {
        self.tags = tags;
        self
    }

    /// Name of the entity the event is about (`data.name`).
    pub fn subject_name(&self) -> Option<&str> {
        self.data.get("name").and_then(serde_json::Value::as_str)
    }

    pub fn tags_of_type<'a>(&'a self, tag_type: &'a str) -> impl Iterator<Item = &'a EventTag> {
        self.tags.iter().filter(move |tag| tag.tag_type == tag_type)
    }
}

/// The user supplied part of an addon instance, validated on create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonConfig {
    pub provider: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: AddonParameters,
    #[serde(default)]
    pub events: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl AddonConfig {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            enabled: true,
            description: None,
            parameters: AddonParameters::new(),
            events: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A stored addon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstance {
    pub id: u64,
    #[serde(flatten)]
    pub config: AddonConfig,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AddonInstance {
    pub fn new(id: u64, config: AddonConfig, created_by: impl Into<String>) -> Self {
        Self {
            id,
            config,
            created_by: created_by.into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn provider(&self) -> &str {
        &self.config.provider
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn parameters(&self) -> &AddonParameters {
        &self.config.parameters
    }

    /// An empty event filter subscribes to every event the provider declares.
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.config.events.is_empty() || self.config.events.iter().any(|e| e == event_type)
    }
}

/// Result of one handler invocation for one addon instance and one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    #[serde(rename = "addonInstanceId")]
    pub addon_id: u64,
    #[serde(rename = "providerName")]
    pub provider: String,
    pub event_id: u64,
    pub event_type: String,
    pub succeeded: bool,
    pub error: Option<String>,
    pub delivery: Option<Delivery>,
    pub attempts: u32,
    pub duration_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl DispatchOutcome {
    pub fn status_label(&self) -> &'static str {
        match (&self.delivery, self.succeeded) {
            (_, false) => "failed",
            (Some(Delivery::Skipped { .. }), true) => "skipped",
            _ => "delivered",
        }
    }
}

/// Bounded retry for failed handler invocations. `never()` matches the
/// at-most-once behavior.
///
/// A retry re-runs the whole handler with the same event. Handlers that fan
/// out to several external calls repeat the calls that already succeeded,
/// e.g. a Jira comment on every tagged issue after only one of them failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::never()
    }
}

impl RetryPolicy {
    pub fn never() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub fn exponential(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(retry))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    pub details: Option<HashMap<String, String>>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: HashMap<String, String>) -> Self {
        self.details = Some(details);
        self
    }
}
