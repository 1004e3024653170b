use crate::shared::types::{DomainEvent, OutcomeQuery};
use crate::FlagRelay;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use flagrelay_core::ErrorResponse;
use std::sync::Arc;
use tracing::info;

const DEFAULT_OUTCOME_LIMIT: usize = 50;

/// Error body with the HTTP status derived from its error code
pub struct ApiError(ErrorResponse);

impl From<ErrorResponse> for ApiError {
    fn from(response: ErrorResponse) -> Self {
        Self(response)
    }
}

impl From<crate::shared::error::DispatcherError> for ApiError {
    fn from(err: crate::shared::error::DispatcherError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.error_code.as_str() {
            "ADDON_NOT_FOUND" => StatusCode::NOT_FOUND,
            "UNKNOWN_PROVIDER" | "VALIDATION_ERROR" | "INVALID_REQUEST" => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self.0)).into_response()
    }
}

fn internal(message: String) -> ApiError {
    ApiError(ErrorResponse::new("INTERNAL_ERROR", message))
}

pub fn router(relay: Arc<FlagRelay>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/providers", get(list_providers))
        .route("/api/tag-types", get(list_tag_types))
        .route("/api/outcomes", get(recent_outcomes))
        .route("/api/events", post(publish_event))
        .with_state(relay)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics(State(relay): State<Arc<FlagRelay>>) -> Result<Response, ApiError> {
    let body = relay.observability().render_metrics().map_err(internal)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

async fn list_providers(
    State(relay): State<Arc<FlagRelay>>,
) -> Json<Vec<flagrelay_core::ProviderDefinition>> {
    Json(relay.addons().provider_definitions())
}

async fn list_tag_types(
    State(relay): State<Arc<FlagRelay>>,
) -> Result<Json<Vec<flagrelay_core::TagTypeDefinition>>, ApiError> {
    Ok(Json(relay.tag_types().list_tag_types().await?))
}

async fn recent_outcomes(
    State(relay): State<Arc<FlagRelay>>,
    Query(query): Query<OutcomeQuery>,
) -> Result<Json<Vec<flagrelay_core::DispatchOutcome>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_OUTCOME_LIMIT);
    let outcomes = relay
        .observability()
        .recent_outcomes(limit)
        .map_err(internal)?;
    Ok(Json(outcomes))
}

async fn publish_event(
    State(relay): State<Arc<FlagRelay>>,
    Json(event): Json<DomainEvent>,
) -> Result<(StatusCode, Json<DomainEvent>), ApiError> {
    if event.event_type.trim().is_empty() {
        return Err(ApiError(ErrorResponse::new(
            "INVALID_REQUEST",
            "event type must not be empty",
        )));
    }

    let stored = relay.publish(event).await?;
    info!(event_id = stored.id, event_type = %stored.event_type, "Event accepted");
    Ok((StatusCode::ACCEPTED, Json(stored)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config::DispatcherConfig;
    use crate::testing::{registry_of, RecordingProvider};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use flagrelay_core::{event_kind, AddonConfig};
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_relay() -> Arc<FlagRelay> {
        let registry = registry_of(vec![
            RecordingProvider::new("simple"),
            RecordingProvider::new("chat").with_tag_type("slack"),
        ]);
        Arc::new(FlagRelay::new(DispatcherConfig::default(), registry).unwrap())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(test_relay())
            .oneshot(get_request("/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_list_providers() {
        let response = router(test_relay())
            .oneshot(get_request("/api/providers"))
            .await
            .unwrap();

        let body = body_json(response).await;
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["chat", "simple"]);
        assert_eq!(body[1]["parameters"][0]["required"], true);
    }

    #[tokio::test]
    async fn test_list_tag_types_after_bootstrap() {
        let relay = test_relay();
        relay.bootstrap().await.unwrap();

        let response = router(relay)
            .oneshot(get_request("/api/tag-types"))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body[0]["name"], "slack");
    }

    #[tokio::test]
    async fn test_publish_event_is_accepted_and_dispatched() {
        let relay = test_relay();
        let _listener = relay.start();
        relay
            .addons()
            .create_addon(
                AddonConfig::new("simple").with_parameter("url", "http://x"),
                "me",
            )
            .await
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/events")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "type": event_kind::TOGGLE_CREATED,
                    "createdBy": "a@b.com",
                    "data": { "name": "f1" },
                    "tags": [{ "type": "slack", "value": "general" }]
                })
                .to_string(),
            ))
            .unwrap();

        let response = router(relay.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let stored = body_json(response).await;
        // The addon creation audit event was stored first
        assert_eq!(stored["id"], 2);

        for _ in 0..200 {
            if !relay.observability().recent_outcomes(1).unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let response = router(relay)
            .oneshot(get_request("/api/outcomes?limit=5"))
            .await
            .unwrap();
        let outcomes = body_json(response).await;
        assert_eq!(outcomes.as_array().unwrap().len(), 1);
        assert_eq!(outcomes[0]["providerName"], "simple");
        assert!(outcomes[0]["addonInstanceId"].is_u64());
        assert_eq!(outcomes[0]["succeeded"], true);
    }

    #[tokio::test]
    async fn test_publish_event_with_blank_type_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/events")
            .header("content-type", "application/json")
            .body(Body::from(r#"{ "type": " ", "createdBy": "a@b.com" }"#))
            .unwrap();

        let response = router(test_relay()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error_code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_metrics_are_prometheus_text() {
        let response = router(test_relay())
            .oneshot(get_request("/metrics"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("flagrelay_events_processed_total"));
    }
}
