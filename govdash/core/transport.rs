use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;

/// HTTP verbs used by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Replace.
    Put,
}

impl HttpMethod {
    /// Upper-case verb.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
        }
    }
}

/// One request against the backend, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Verb.
    pub method: HttpMethod,
    /// Path starting with `/api/`.
    pub path: String,
    /// JSON body for POST/PUT.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    /// POST request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    /// PUT request with a JSON body.
    #[must_use]
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Put,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body text.
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Executes requests. Implementations return `Err` only when no response was received.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues exactly one HTTP call.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    bearer: Option<String>,
}

impl ReqwestTransport {
    /// Builds the transport with a per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
        bearer: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer,
        })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = request.method.label(), %url, "api request");
        let mut builder = self.client.request(request.method.into(), &url);
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await.map_err(|err| {
            warn!(method = request.method.label(), %url, error = %err, "api request failed");
            ApiError::Network {
                message: err.to_string(),
            }
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| ApiError::Network {
            message: format!("reading response body: {err}"),
        })?;
        if !(200..300).contains(&status) {
            warn!(method = request.method.label(), %url, status, "api request returned error status");
        }
        Ok(HttpResponse { status, body })
    }
}

type RouteKey = (HttpMethod, String);

#[derive(Debug, Clone)]
enum Scripted {
    Respond(HttpResponse),
    Fail(String),
}

/// In-memory transport answering from per-route scripts.
///
/// Each `(method, path)` route holds a queue of answers consumed in order; the
/// last answer repeats once the queue is drained. Unscripted routes answer 404.
/// Every request is recorded for assertions.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    routes: Arc<Mutex<HashMap<RouteKey, VecDeque<Scripted>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    delays: Arc<Mutex<HashMap<RouteKey, VecDeque<Duration>>>>,
}

impl ScriptedTransport {
    /// Empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a JSON answer with the given status.
    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: &Value) -> &Self {
        self.push(
            method,
            path,
            Scripted::Respond(HttpResponse {
                status,
                body: body.to_string(),
            }),
        )
    }

    /// Queues a raw-text answer.
    pub fn respond_raw(&self, method: HttpMethod, path: &str, status: u16, body: &str) -> &Self {
        self.push(
            method,
            path,
            Scripted::Respond(HttpResponse {
                status,
                body: body.to_string(),
            }),
        )
    }

    /// Queues a network failure.
    pub fn fail(&self, method: HttpMethod, path: &str, message: &str) -> &Self {
        self.push(method, path, Scripted::Fail(message.to_string()))
    }

    /// Delays the next answer of a route; later delays apply to later requests.
    pub fn delay(&self, method: HttpMethod, path: &str, delay: Duration) -> &Self {
        self.delays
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(delay);
        self
    }

    fn push(&self, method: HttpMethod, path: &str, answer: Scripted) -> &Self {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(answer);
        self
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests received for one route.
    #[must_use]
    pub fn request_count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn next_answer(&self, key: &RouteKey) -> Option<Scripted> {
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let key = (request.method, request.path.clone());
        self.requests.lock().push(request);
        let delay = self
            .delays
            .lock()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        let answer = self.next_answer(&key);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match answer {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(ApiError::Network { message }),
            None => Ok(HttpResponse {
                status: 404,
                body: r#"{"error":"Not Found"}"#.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn scripted_answers_in_order_then_repeat_last() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Get, "/api/policies", 200, &json!([]))
            .respond(HttpMethod::Get, "/api/policies", 500, &json!({ "error": "boom" }));
        let first = transport.execute(HttpRequest::get("/api/policies")).await.unwrap();
        let second = transport.execute(HttpRequest::get("/api/policies")).await.unwrap();
        let third = transport.execute(HttpRequest::get("/api/policies")).await.unwrap();
        assert_eq!(first.status, 200);
        assert_eq!(second.status, 500);
        assert_eq!(third.status, 500);
        assert_eq!(transport.request_count(HttpMethod::Get, "/api/policies"), 3);
    }

    #[tokio::test]
    async fn unscripted_routes_are_not_found() {
        let transport = ScriptedTransport::new();
        let response = transport.execute(HttpRequest::get("/api/nope")).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn scripted_failure_is_network_error() {
        let transport = ScriptedTransport::new();
        transport.fail(HttpMethod::Post, "/api/reports", "connection refused");
        let err = transport
            .execute(HttpRequest::post("/api/reports", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "network");
    }

    #[test]
    fn reqwest_transport_trims_base_url() {
        let transport =
            ReqwestTransport::new("http://localhost:8000/", Duration::from_secs(5), "govdash/test", None)
                .unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8000");
    }
}
