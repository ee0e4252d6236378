//! Relay authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use curator_core::{AccessError, RelayRequest};

use crate::metrics::{
    normalize_path, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
    RELAY_AUTH_FAILURES_TOTAL,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();
    let response = next.run(request).await;
    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Rejects requests that do not come from the configured relay.
///
/// Returns 401 when credentials are missing or wrong, 500 if the
/// authenticator itself is misconfigured.
pub async fn relay_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let relay = state.relay();
    if relay.method_name() == "none" {
        return Ok(next.run(request).await);
    }

    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    match relay.authenticate(&RelayRequest { headers }).await {
        Ok(()) => Ok(next.run(request).await),
        Err(AccessError::NotAuthenticated) => {
            RELAY_AUTH_FAILURES_TOTAL
                .with_label_values(&["not_authenticated"])
                .inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(AccessError::InvalidCredentials(_)) => {
            RELAY_AUTH_FAILURES_TOTAL
                .with_label_values(&["invalid_credentials"])
                .inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            warn!("Relay authenticator failed: {}", e);
            RELAY_AUTH_FAILURES_TOTAL
                .with_label_values(&["internal_error"])
                .inc();
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, Request},
        middleware,
        routing::get,
        Router,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    use curator_core::{
        access::{NoRelayAuth, OpenPolicy, SharedSecretAuthenticator},
        load_config_from_str,
        testing::MockMessenger,
        CardAuthor, CatalogingContext, Cataloger, JsonStore, RelayAuthenticator, ReplyHub,
        Wizard,
    };

    const CONFIG: &str = r#"
[relay]
method = "none"

[channels]
listed = 100
undetermined = 200

[discord]
token = "test-token"
guild_id = 1
"#;

    async fn dummy_handler() -> &'static str {
        "OK"
    }

    fn app(relay: Arc<dyn RelayAuthenticator>) -> Router {
        let config = load_config_from_str(CONFIG).unwrap();
        let messenger = Arc::new(MockMessenger::new());
        let cataloger = Cataloger::new(
            Arc::new(JsonStore::in_memory()),
            messenger.clone(),
            Wizard::new(ReplyHub::new(), messenger, Duration::from_secs(1)),
            Arc::new(OpenPolicy),
            CatalogingContext::from(&config),
            CardAuthor::from(&config.mirror),
        );
        let state = Arc::new(AppState::new(config, relay, Arc::new(cataloger)));

        Router::new()
            .route("/test", get(dummy_handler))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                relay_auth_middleware,
            ))
            .with_state(state)
    }

    fn secret_app() -> Router {
        app(Arc::new(SharedSecretAuthenticator::new("s3cret".to_string())))
    }

    async fn status(app: Router, request: Request<Body>) -> StatusCode {
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_no_relay_auth_allows_all() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert_eq!(
            status(app(Arc::new(NoRelayAuth::new())), request).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_bearer_secret_accepted() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status(secret_app(), request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_relay_secret_header_accepted() {
        let request = Request::builder()
            .uri("/test")
            .header("X-Relay-Secret", "s3cret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status(secret_app(), request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer nope")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status(secret_app(), request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_secret_rejected() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert_eq!(status(secret_app(), request).await, StatusCode::UNAUTHORIZED);
    }
}
