use crate::shared::error::{DispatcherError, DispatcherResult};
use flagrelay_core::RetryPolicy;
use flagrelay_providers::ProviderSettings;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub listen_addr: SocketAddr,
    pub public_url: String,
    pub delivery_timeout: Duration,
    pub retry_policy: RetryPolicy,
    pub addon_cache_ttl: Duration,
    pub outcome_history: usize,
    pub event_buffer: usize,
    pub event_history: usize,
    pub addons_file: Option<PathBuf>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 4243)),
            public_url: "http://localhost:4242".to_string(),
            delivery_timeout: Duration::from_secs(10),
            retry_policy: RetryPolicy::never(),
            addon_cache_ttl: Duration::from_secs(60),
            outcome_history: 200,
            event_buffer: 1024,
            event_history: 1000,
            addons_file: None,
        }
    }
}

impl DispatcherConfig {
    pub fn from_env() -> DispatcherResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> DispatcherResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let max_retries = parse_or(&get, "FLAGRELAY_MAX_RETRIES", 0u32)?;
        let backoff_ms = parse_or(&get, "FLAGRELAY_RETRY_BACKOFF_MS", 500u64)?;
        let retry_policy = if max_retries == 0 {
            RetryPolicy::never()
        } else {
            RetryPolicy::exponential(max_retries, Duration::from_millis(backoff_ms))
        };

        let event_buffer = parse_or(&get, "FLAGRELAY_EVENT_BUFFER", defaults.event_buffer)?;
        if event_buffer == 0 {
            return Err(DispatcherError::ConfigurationError(
                "FLAGRELAY_EVENT_BUFFER must be greater than zero".to_string(),
            ));
        }

        let timeout_ms = parse_or(&get, "FLAGRELAY_DELIVERY_TIMEOUT_MS", 10_000u64)?;
        if timeout_ms == 0 {
            return Err(DispatcherError::ConfigurationError(
                "FLAGRELAY_DELIVERY_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            listen_addr: parse_or(&get, "FLAGRELAY_ADDR", defaults.listen_addr)?,
            public_url: get("FLAGRELAY_PUBLIC_URL").unwrap_or(defaults.public_url),
            delivery_timeout: Duration::from_millis(timeout_ms),
            retry_policy,
            addon_cache_ttl: Duration::from_secs(parse_or(
                &get,
                "FLAGRELAY_ADDON_CACHE_TTL_SECS",
                60u64,
            )?),
            outcome_history: parse_or(&get, "FLAGRELAY_OUTCOME_HISTORY", defaults.outcome_history)?,
            event_buffer,
            event_history: parse_or(&get, "FLAGRELAY_EVENT_HISTORY", defaults.event_history)?,
            addons_file: get("FLAGRELAY_ADDONS_FILE").map(PathBuf::from),
        })
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            public_url: self.public_url.clone(),
            request_timeout: self.delivery_timeout,
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> DispatcherResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            DispatcherError::ConfigurationError(format!("invalid value for {key} ('{raw}'): {e}"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = DispatcherConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.listen_addr.port(), 4243);
        assert_eq!(config.delivery_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_policy, RetryPolicy::never());
        assert_eq!(config.addon_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.event_history, 1000);
        assert!(config.addons_file.is_none());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = DispatcherConfig::from_lookup(lookup(&[
            ("FLAGRELAY_ADDR", "0.0.0.0:9000"),
            ("FLAGRELAY_PUBLIC_URL", "https://toggles.example.com"),
            ("FLAGRELAY_DELIVERY_TIMEOUT_MS", "250"),
            ("FLAGRELAY_MAX_RETRIES", "3"),
            ("FLAGRELAY_RETRY_BACKOFF_MS", "100"),
            ("FLAGRELAY_ADDONS_FILE", "/etc/flagrelay/addons.json"),
            ("FLAGRELAY_EVENT_HISTORY", "50"),
        ]))
        .unwrap();

        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.public_url, "https://toggles.example.com");
        assert_eq!(config.delivery_timeout, Duration::from_millis(250));
        assert_eq!(
            config.retry_policy,
            RetryPolicy::exponential(3, Duration::from_millis(100))
        );
        assert_eq!(
            config.addons_file,
            Some(PathBuf::from("/etc/flagrelay/addons.json"))
        );
        assert_eq!(config.provider_settings().request_timeout, Duration::from_millis(250));
        assert_eq!(config.event_history, 50);
    }

    #[test]
    fn test_invalid_number_is_configuration_error() {
        let result =
            DispatcherConfig::from_lookup(lookup(&[("FLAGRELAY_DELIVERY_TIMEOUT_MS", "soon")]));
        assert!(matches!(
            result,
            Err(DispatcherError::ConfigurationError(ref msg)) if msg.contains("FLAGRELAY_DELIVERY_TIMEOUT_MS")
        ));
    }

    #[test]
    fn test_zero_event_buffer_is_rejected() {
        let result = DispatcherConfig::from_lookup(lookup(&[("FLAGRELAY_EVENT_BUFFER", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_delivery_timeout_is_rejected() {
        let result =
            DispatcherConfig::from_lookup(lookup(&[("FLAGRELAY_DELIVERY_TIMEOUT_MS", "0")]));
        assert!(matches!(
            result,
            Err(DispatcherError::ConfigurationError(ref msg)) if msg.contains("greater than zero")
        ));
    }
}
