use async_trait::async_trait;
use flagrelay_core::{CoreError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpRequest {
    pub fn post_json<T: Serialize + ?Sized>(url: impl Into<String>, body: &T) -> Result<Self> {
        let body = serde_json::to_string(body)
            .map_err(|e| CoreError::Serialization(format!("failed to encode request body: {e}")))?;
        Ok(Self {
            url: url.into(),
            headers: BTreeMap::new(),
            body,
        }
        .with_header(CONTENT_TYPE.as_str(), "application/json"))
    }

    /// Body sent verbatim, labelled as JSON like the rendered webhook templates
    pub fn post_raw(url: impl Into<String>, body: String) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            body,
        }
        .with_header(CONTENT_TYPE.as_str(), "application/json")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into a delivery error.
    pub fn ensure_success(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(CoreError::Delivery(format!(
                "POST {url} returned status {}",
                self.status
            )))
        }
    }
}

/// Outbound HTTP used by providers. One call is one external side effect.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpDeliveryRepository: Send + Sync {
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

pub struct ReqwestHttpDeliveryRepository {
    client: Client,
}

impl ReqwestHttpDeliveryRepository {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Delivery(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| CoreError::Delivery(format!("invalid header name '{key}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| CoreError::Delivery(format!("invalid header value for '{key}': {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl HttpDeliveryRepository for ReqwestHttpDeliveryRepository {
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let headers = header_map(&request.headers)?;

        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::Timeout(format!("POST {} timed out", request.url))
                } else {
                    CoreError::Delivery(format!("failed to POST {}: {e}", request.url))
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            CoreError::Serialization(format!("failed to read HTTP response body: {e}"))
        })?;

        Ok(HttpResponse { status, body })
    }
}
