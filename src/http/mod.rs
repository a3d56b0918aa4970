//! Combined health and metrics listener.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Request, State as AxumState};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::metrics::exporter::CONTENT_TYPE;
use crate::metrics::AppTracker;
use crate::{ExporterError, Result};

#[derive(Clone)]
pub struct State {
    tracker: AppTracker,
}

impl State {
    pub fn new(tracker: AppTracker) -> Self {
        Self { tracker }
    }
}

pub async fn serve(addr: SocketAddr, state: Arc<State>, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ExporterError::ServerError(format!("Failed to bind {}: {}", addr, e)))?;
    info!("Starting on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| ExporterError::ServerError(e.to_string()))?;

    info!("HTTP listener on {} stopped", addr);
    Ok(())
}

pub fn router(state: Arc<State>) -> Router {
    Router::new()
        .route("/readyz", get(readiness))
        .route("/healthz", get(liveness))
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn readiness() -> (StatusCode, &'static str) {
    (StatusCode::OK, "Ready")
}

async fn liveness() -> (StatusCode, &'static str) {
    (StatusCode::OK, "Alive")
}

async fn metrics(AxumState(state): AxumState<Arc<State>>) -> Response {
    match state.tracker.render().await {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    debug!(
        "Request received: {} {}",
        request.method(),
        request.uri().path()
    );
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::{LabelFilter, PodInfo};
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    async fn get_path(app: Router, path: &str) -> (StatusCode, String, Option<String>) {
        let response = app
            .oneshot(HttpRequest::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, String::from_utf8(body.to_vec()).unwrap(), content_type)
    }

    fn app(tracker: AppTracker) -> Router {
        router(Arc::new(State::new(tracker)))
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let tracker = AppTracker::new(LabelFilter::default()).unwrap();

        let (status, body, _) = get_path(app(tracker.clone()), "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Ready");

        let (status, body, _) = get_path(app(tracker), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Alive");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let tracker = AppTracker::new(LabelFilter::default()).unwrap();
        tracker
            .on_add(&PodInfo {
                name: "worker-1".to_string(),
                namespace: "helx".to_string(),
                labels: BTreeMap::from([
                    ("executor".to_string(), "tycho".to_string()),
                    ("username".to_string(), "alice".to_string()),
                ]),
            })
            .await;

        let (status, body, content_type) = get_path(app(tracker), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(CONTENT_TYPE));
        assert!(body.contains(r#"helx_app_info{podname="worker-1",username="alice"} 1"#));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let tracker = AppTracker::new(LabelFilter::default()).unwrap();
        let (status, _, _) = get_path(app(tracker), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
