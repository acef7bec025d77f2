//! HTTP backend: REST calls through a shared `reqwest` client
//!
//! - Path placeholders `{param}` are filled from the parameters.
//! - GET requests send the parameters not consumed by the path as the query
//!   string.
//! - POST/PUT/DELETE send the parameters as a JSON body.
//! - Responses are parsed as JSON when the server says so, otherwise kept as
//!   text.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use argos_application::ports::tool_backend::{AdapterError, ToolBackendAdapter};
use argos_domain::tool::{
    entities::{
        ExecutionContext, HttpAuth, HttpConfig, HttpMethod, Parameters, ToolDefinition,
        TransportConfig, TransportType,
    },
    template::{render_path, stringify},
    value_objects::ToolExecutionResult,
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, info};

use super::{DEFAULT_TIMEOUT_MS, timeout_for};

pub struct HttpAdapter {
    client: reqwest::Client,
    initialized: AtomicBool,
    default_timeout_ms: u64,
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.is_empty() {
        return base_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Configured headers with `Content-Type: application/json` unless overridden
fn merged_headers(config: &HttpConfig) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    if !config
        .headers
        .keys()
        .any(|k| k.eq_ignore_ascii_case("content-type"))
    {
        headers.insert("Content-Type".to_string(), "application/json".to_string());
    }
    headers.extend(config.headers.clone());
    headers
}

impl HttpAdapter {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            initialized: AtomicBool::new(false),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    fn build_request(&self, config: &HttpConfig, params: &Parameters) -> reqwest::RequestBuilder {
        let (path, consumed) = render_path(&config.path, params);
        let url = join_url(&config.base_url, &path);

        let mut request = match config.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        for (name, value) in merged_headers(config) {
            request = request.header(name, value);
        }

        request = match &config.auth {
            Some(HttpAuth::Bearer { token }) => request.bearer_auth(token),
            Some(HttpAuth::Basic { username, password }) => request.basic_auth(username, Some(password)),
            Some(HttpAuth::ApiKey { header, token }) => request.header(header, token),
            None => request,
        };

        if config.method.has_body() {
            request = request.body(Value::Object(params.clone()).to_string());
        } else {
            let query: Vec<(String, String)> = params
                .iter()
                .filter(|(k, _)| !consumed.contains(k))
                .map(|(k, v)| (k.clone(), stringify(v)))
                .collect();
            if !query.is_empty() {
                request = request.query(&query);
            }
        }

        debug!(method = config.method.as_str(), url = %url, "Sending HTTP tool request");
        request.timeout(timeout_for(config.timeout_ms, self.default_timeout_ms))
    }

    async fn call(&self, tool: &ToolDefinition, config: &HttpConfig, params: &Parameters) -> ToolExecutionResult {
        let response = match self.build_request(config, params).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return ToolExecutionResult::timeout(&tool.name, TransportType::Http, "Request timed out");
            }
            Err(e) => {
                return ToolExecutionResult::error(&tool.name, TransportType::Http, e.to_string());
            }
        };

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        let body = if is_json {
            response.json::<Value>().await
        } else {
            response.text().await.map(Value::String)
        };

        let data = match body {
            Ok(data) => data,
            Err(e) if e.is_timeout() => {
                return ToolExecutionResult::timeout(&tool.name, TransportType::Http, "Request timed out");
            }
            Err(e) => {
                return ToolExecutionResult::error(
                    &tool.name,
                    TransportType::Http,
                    format!("Failed to read response: {}", e),
                );
            }
        };

        if !status.is_success() {
            return ToolExecutionResult::error(
                &tool.name,
                TransportType::Http,
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            )
            .with_details(data);
        }

        ToolExecutionResult::success(&tool.name, TransportType::Http, data)
    }
}

impl Default for HttpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolBackendAdapter for HttpAdapter {
    fn transport(&self) -> TransportType {
        TransportType::Http
    }

    async fn initialize(&self) -> Result<(), AdapterError> {
        info!("HTTP adapter ready");
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(
        &self,
        tool: &ToolDefinition,
        params: &Parameters,
        _context: Option<&ExecutionContext>,
    ) -> ToolExecutionResult {
        let started = Instant::now();
        let result = match &tool.transport {
            TransportConfig::Http(config) => self.call(tool, config, params).await,
            other => ToolExecutionResult::error(
                &tool.name,
                TransportType::Http,
                format!("Tool {} is not an HTTP tool ({})", tool.name, other.transport_type()),
            ),
        };
        result.with_duration(started.elapsed())
    }

    async fn health_check(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn cleanup(&self) -> Result<(), AdapterError> {
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }
}
