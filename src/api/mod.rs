//! Panel Query REST API
//!
//! HTTP surface for the rendering layer, built with Axum.
//!
//! # Endpoints
//!
//! ## Query
//! - `POST /api/v1/query` - Run a panel query, returning its series
//! - `POST /api/v1/query/plan` - Return the payloads a panel would send
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe (engine reachable)
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use druid_panel::api::{serve, AppState};
//! use druid_panel::config::Config;
//! use druid_panel::engine::HttpEngine;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let engine = Arc::new(HttpEngine::new(&config.engine)?);
//!
//!     let state = AppState::new(engine, config.api.clone());
//!     serve(state, &config.api).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/query", post(routes::query::run_query))
        .route("/query/plan", post(routes::query::plan_query));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config);
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// CORS for the configured origins; no origins means allow any
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Panel query API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Panel query API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, QueryEngine};
    use crate::query::QueryPayload;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    /// Returns a fixed body, or fails every call when `body` is None
    struct FixedEngine {
        body: Option<Value>,
    }

    #[async_trait]
    impl QueryEngine for FixedEngine {
        async fn execute(&self, _payload: &QueryPayload) -> Result<Value, EngineError> {
            self.body.clone().ok_or(EngineError::Unavailable)
        }

        async fn health_check(&self) -> Result<(), EngineError> {
            match self.body {
                Some(_) => Ok(()),
                None => Err(EngineError::Unavailable),
            }
        }
    }

    fn create_test_app(body: Option<Value>) -> Router {
        let state = AppState::new(Arc::new(FixedEngine { body }), ApiConfig::default());
        build_router(state)
    }

    fn timeseries_rows() -> Value {
        json!([
            {"timestamp": "2020-01-01T00:00:00.000Z", "result": {"edits": 5}},
            {"timestamp": "2020-01-01T00:01:00.000Z", "result": {"edits": 7}}
        ])
    }

    fn panel(targets: Value) -> Body {
        Body::from(
            json!({
                "range": {"from": "2020-01-01T00:00:00Z", "to": "2020-01-01T01:00:00Z"},
                "resolutionBudget": 1000,
                "targets": targets
            })
            .to_string(),
        )
    }

    fn post_json(uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(body)
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let app = create_test_app(None);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready_follows_engine() {
        let ready = create_test_app(Some(json!([])))
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(ready.status(), StatusCode::OK);

        let down = create_test_app(None)
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_full() {
        let app = create_test_app(None);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["engine"], "unreachable");
    }

    #[tokio::test]
    async fn test_run_query() {
        let app = create_test_app(Some(timeseries_rows()));
        let targets = json!([{
            "dataSource": "wikipedia",
            "queryType": "timeseries",
            "aggregators": [{"type": "count", "name": "edits"}]
        }]);

        let response = app
            .oneshot(post_json("/api/v1/query", panel(targets)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!([{
                "target": "edits",
                "datapoints": [[5.0, 1577836801000i64], [7.0, 1577836860000i64]]
            }])
        );
    }

    #[tokio::test]
    async fn test_invalid_target_reports_fields() {
        let app = create_test_app(Some(json!([])));
        let targets = json!([{
            "dataSource": "wikipedia",
            "queryType": "topN",
            "aggregators": [{"type": "count", "name": "edits"}],
            "metric": "edits"
        }]);

        let response = app
            .oneshot(post_json("/api/v1/query", panel(targets)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INVALID_TARGET");
        assert_eq!(body["error"]["target"], 0);
        assert_eq!(body["error"]["fields"]["threshold"], "Must specify a threshold");
        assert_eq!(body["error"]["fields"]["dimension"], "Must specify a dimension");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_out_of_range_relative_bound_is_bad_request() {
        let app = create_test_app(Some(timeseries_rows()));
        let body = json!({
            "range": {"from": "now-99999999999999d", "to": "now"},
            "resolutionBudget": 1000,
            "targets": [{
                "dataSource": "wikipedia",
                "aggregators": [{"type": "count", "name": "edits"}]
            }]
        });

        let response = app
            .oneshot(post_json("/api/v1/query", Body::from(body.to_string())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "INVALID_TIME_RANGE");
    }

    #[tokio::test]
    async fn test_text_threshold_reaches_field_errors() {
        let topn = |threshold: Value| {
            json!([{
                "dataSource": "wikipedia",
                "queryType": "topN",
                "aggregators": [{"type": "count", "name": "edits"}],
                "metric": "edits",
                "dimension": "page",
                "threshold": threshold
            }])
        };

        let response = create_test_app(None)
            .oneshot(post_json("/api/v1/query/plan", panel(topn(json!("10")))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["queries"][0]["payload"]["threshold"], 10);

        let response = create_test_app(None)
            .oneshot(post_json("/api/v1/query", panel(topn(json!("abc")))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INVALID_TARGET");
        assert_eq!(body["error"]["target"], 0);
        assert_eq!(body["error"]["fields"]["threshold"], "Threshold must be an integer");
    }

    #[tokio::test]
    async fn test_engine_failure_is_bad_gateway() {
        let app = create_test_app(None);
        let targets = json!([{
            "dataSource": "wikipedia",
            "aggregators": [{"type": "count", "name": "edits"}]
        }]);

        let response = app
            .oneshot(post_json("/api/v1/query", panel(targets)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["code"], "ENGINE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let app = create_test_app(None);

        let response = app
            .oneshot(post_json("/api/v1/query", Body::from("not json")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_plan_query() {
        let app = create_test_app(None);
        let targets = json!([{
            "dataSource": "wikipedia",
            "queryType": "groupBy",
            "groupBy": "country,page",
            "aggregators": [{"type": "longSum", "name": "added", "fieldName": "added"}],
            "granularity": "hour"
        }]);

        let response = app
            .oneshot(post_json("/api/v1/query/plan", panel(targets)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["from_ms"], 1577836801000i64);
        assert_eq!(
            body["interval"],
            "2020-01-01T00:00:01.000Z/2020-01-01T01:00:00.000Z"
        );
        let payload = &body["queries"][0]["payload"];
        assert_eq!(payload["queryType"], "groupBy");
        assert_eq!(payload["granularity"], "hour");
        assert_eq!(payload["dimensions"], json!(["country", "page"]));
        assert_eq!(body["queries"][0]["metric_names"], json!(["added"]));
    }
}
