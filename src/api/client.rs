use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::core::{ApiClient, ApiError, ApiRequest, HttpMethod};

/// Timeouts applied to every request made by [`HttpApiClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub connect: Duration,
    pub request: Duration,
}

impl From<&ApiConfig> for TimeoutConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_timeout_seconds as u64),
            request: Duration::from_secs(config.timeout_seconds as u64),
        }
    }
}

/// reqwest-backed [`ApiClient`].
///
/// Relative request paths are joined to the configured base URL; absolute
/// `http(s)://` URLs are used as given. A configured token is sent as a
/// bearer `Authorization` header unless the request sets its own.
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let timeouts = TimeoutConfig::from(config);
        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Full URL for `path`.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn method_of(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.url_for(&request.url);
        let mut builder = self
            .client
            .request(method_of(request.method), &url)
            .header(ACCEPT, "application/json");

        let has_auth = request
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION.as_str()));
        if let (Some(token), false) = (&self.token, has_auth) {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = request.method.as_str(), %url, "API request");
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(format!("Failed to read response body: {}", e)))?;

        if let Some(err) = ApiError::from_status(status, error_message(&bytes)) {
            tracing::debug!(status, %url, "API request rejected");
            return Err(err);
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Human-readable message from an error body: a `message`/`detail`/`error`
/// field if the body is JSON, the raw text otherwise.
fn error_message(bytes: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(bytes) {
        for field in ["message", "detail", "error"] {
            if let Some(Value::String(text)) = map.get(field) {
                return text.clone();
            }
        }
    }
    String::from_utf8_lossy(bytes).trim().to_string()
}
