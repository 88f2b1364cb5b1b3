//! Instrumented REST client for the backend API.
//!
//! Every request publishes its outcome to the [`InstrumentationBus`], which
//! is how API traffic shows up in the merged console view next to push
//! events. Non-idempotent calls also publish an `Action` entry up front so
//! the operator sees the intent before the round trip completes.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use fuega_core::ActivityKind;

use crate::bus::InstrumentationBus;
use crate::config::ConsoleConfig;
use crate::errors::{ConsoleError, Result};

/// JSON API client that reports its activity to the bus.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    bus: Arc<InstrumentationBus>,
}

impl ApiClient {
    /// Build a client from config. `path` arguments to the request methods
    /// are joined to the configured base URL.
    #[must_use]
    pub fn new(config: &ConsoleConfig, bus: Arc<InstrumentationBus>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            api_token: config.api_token.clone(),
            bus,
        }
    }

    /// GET a JSON resource.
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, None).await
    }

    /// POST a JSON body.
    pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// PUT a JSON body.
    pub async fn put(&self, path: &str, body: Value) -> Result<Value> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// DELETE a resource.
    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.request(Method::DELETE, path, None).await
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let label = format!("{method} {path}");

        if !matches!(method, Method::GET | Method::HEAD) {
            let _ = self.bus.record(ActivityKind::Action, label.clone(), None);
        }

        let mut builder = self.http.request(method, &url);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let _ = self.bus.record(
                    ActivityKind::Error,
                    label,
                    Some(format!("request failed: {e}")),
                );
                return Err(ConsoleError::Request(e));
            }
        };

        let status = response.status();
        let elapsed_ms = started.elapsed().as_millis();
        debug!(%url, status = status.as_u16(), elapsed_ms, "api request finished");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let _ = self.bus.record(
                ActivityKind::Error,
                label,
                Some(format!("{} in {elapsed_ms} ms", status.as_u16())),
            );
            return Err(ConsoleError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let _ = self.bus.record(
            ActivityKind::Success,
            label,
            Some(format!("{} in {elapsed_ms} ms", status.as_u16())),
        );

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        Ok(response.json().await?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, bus: Arc<InstrumentationBus>) -> ApiClient {
        let config = ConsoleConfig {
            api_base_url: format!("{}/api", server.uri()),
            api_token: Some("tok_test".to_owned()),
            ..ConsoleConfig::default()
        };
        ApiClient::new(&config, bus)
    }

    #[tokio::test]
    async fn get_decodes_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/agents"))
            .and(header("authorization", "Bearer tok_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"agents": ["ceo"]})))
            .mount(&server)
            .await;

        let bus = Arc::new(InstrumentationBus::new(10));
        let client = client_for(&server, Arc::clone(&bus));

        let value = client.get("/agents").await.unwrap();
        assert_eq!(value["agents"][0], "ceo");

        // GET publishes the outcome only
        let all = bus.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, ActivityKind::Success);
        assert_eq!(all[0].title, "GET /agents");
    }

    #[tokio::test]
    async fn post_publishes_action_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/leads"))
            .and(body_json(json!({"name": "Acme"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
            .mount(&server)
            .await;

        let bus = Arc::new(InstrumentationBus::new(10));
        let client = client_for(&server, Arc::clone(&bus));

        let value = client.post("/leads", json!({"name": "Acme"})).await.unwrap();
        assert_eq!(value["id"], 7);

        // Newest first: success outcome, then the up-front action entry
        let all = bus.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, ActivityKind::Success);
        assert!(all[0].detail.as_deref().unwrap().starts_with("201 in "));
        assert_eq!(all[1].kind, ActivityKind::Action);
        assert_eq!(all[1].title, "POST /leads");
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let bus = Arc::new(InstrumentationBus::new(10));
        let client = client_for(&server, Arc::clone(&bus));

        let err = client.get("/missing").await.unwrap_err();
        match err {
            ConsoleError::Http { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "not found");
            }
            other => panic!("expected http error, got {other}"),
        }
        assert_eq!(bus.all()[0].kind, ActivityKind::Error);
    }

    #[tokio::test]
    async fn connection_failure_is_request_error() {
        // Nothing listens on this port
        let config = ConsoleConfig {
            api_base_url: "http://127.0.0.1:9/api".to_owned(),
            ..ConsoleConfig::default()
        };
        let bus = Arc::new(InstrumentationBus::new(10));
        let client = ApiClient::new(&config, Arc::clone(&bus));

        let err = client.delete("/leads/1").await.unwrap_err();
        assert!(matches!(err, ConsoleError::Request(_)));

        let all = bus.all();
        assert_eq!(all[0].kind, ActivityKind::Error);
        assert_eq!(all[1].kind, ActivityKind::Action);
        assert_eq!(all[1].title, "DELETE /leads/1");
    }

    #[tokio::test]
    async fn no_content_yields_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/leads/7"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let bus = Arc::new(InstrumentationBus::new(10));
        let client = client_for(&server, bus);

        let value = client.delete("/leads/7").await.unwrap();
        assert!(value.is_null());
    }
}
