//! HTTP engine client
//!
//! POSTs payloads as JSON to the broker endpoint. Failures are surfaced
//! as-is; nothing is retried.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::engine::{EngineError, QueryEngine};
use crate::query::QueryPayload;

/// Broker client
pub struct HttpEngine {
    client: Client,
    url: String,
    health_url: String,
}

/// Error body returned by the broker on failed queries
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EngineErrorBody {
    error: Option<String>,
    error_message: Option<String>,
}

impl HttpEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            health_url: config.health_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn error_from(response: Response) -> EngineError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<EngineErrorBody>(&text) {
            Ok(body) => body
                .error_message
                .or(body.error)
                .unwrap_or_else(|| text.clone()),
            Err(_) => text,
        };

        EngineError::Api { status, message }
    }
}

fn map_send_error(e: reqwest::Error) -> EngineError {
    if e.is_timeout() {
        EngineError::Timeout
    } else if e.is_connect() {
        EngineError::Unavailable
    } else {
        EngineError::Request(e)
    }
}

#[async_trait]
impl QueryEngine for HttpEngine {
    async fn execute(&self, payload: &QueryPayload) -> Result<Value, EngineError> {
        tracing::debug!(url = %self.url, query_type = payload.query_type(), "Sending query");

        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let bytes = response.bytes().await.map_err(map_send_error)?;
        serde_json::from_slice(&bytes).map_err(|e| EngineError::InvalidBody(e.to_string()))
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(map_send_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(EngineError::Unavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AggregatorSpec, QueryType, TargetSpec, TimeRange};
    use crate::query::{build_query, Granularity};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use serde_json::json;

    fn payload() -> QueryPayload {
        let from = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 1).unwrap();
        let range = TimeRange::try_new(from, from + ChronoDuration::hours(1)).unwrap();
        let target = TargetSpec::new("wikipedia", QueryType::Timeseries)
            .aggregator(AggregatorSpec::count("edits"));
        build_query(&target, &range, Granularity::Minute, None).unwrap()
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn engine(base: &str) -> HttpEngine {
        HttpEngine::new(&EngineConfig {
            url: format!("{}/druid/v2/", base),
            health_url: None,
            request_timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_execute_posts_payload() {
        let router = Router::new().route(
            "/druid/v2/",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["queryType"], "timeseries");
                assert_eq!(body["dataSource"], "wikipedia");
                Json(json!([{"timestamp": "2020-01-01T00:00:00.000Z", "result": {"edits": 3}}]))
            }),
        );
        let base = spawn(router).await;

        let body = engine(&base).execute(&payload()).await.unwrap();
        assert_eq!(body[0]["result"]["edits"], 3);
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let router = Router::new().route(
            "/druid/v2/",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "Unknown exception", "errorMessage": "no such datasource"})),
                )
            }),
        );
        let base = spawn(router).await;

        match engine(&base).execute(&payload()).await {
            Err(EngineError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "no such datasource");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_body() {
        let router = Router::new().route("/druid/v2/", post(|| async { "not json" }));
        let base = spawn(router).await;

        assert!(matches!(
            engine(&base).execute(&payload()).await,
            Err(EngineError::InvalidBody(_))
        ));
    }

    #[tokio::test]
    async fn test_health_check() {
        let router = Router::new().route("/status/health", get(|| async { "true" }));
        let base = spawn(router).await;
        assert!(engine(&base).health_check().await.is_ok());

        let router = Router::new();
        let base = spawn(router).await;
        assert!(matches!(
            engine(&base).health_check().await,
            Err(EngineError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_engine() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = engine(&format!("http://{}", addr))
            .execute(&payload())
            .await
            .unwrap_err();
        assert!(err.is_unreachable());
    }
}
