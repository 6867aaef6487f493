//! Fetch collaborator
//!
//! The probe core only needs "give me the current content". `HttpFetcher`
//! is the shipped transport; anything else can plug in through `Fetcher`
//! or `FnFetcher`.

use crate::config::{HttpMethod, TargetConfig};
use crate::error::{FetchError, MonitorError};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Source of the content being monitored
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> Result<String, FetchError>;

    /// Short description for log lines (e.g. the target URL)
    fn describe(&self) -> String {
        "custom fetcher".to_string()
    }
}

/// Adapts an async closure into a `Fetcher`
pub struct FnFetcher<F>(pub F);

#[async_trait]
impl<F, Fut> Fetcher for FnFetcher<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, FetchError>> + Send,
{
    async fn fetch(&self) -> Result<String, FetchError> {
        (self.0)().await
    }
}

fn map_http_error(error: reqwest::Error) -> FetchError {
    if let Some(status) = error.status() {
        FetchError::Status {
            status: status.as_u16(),
            message: error.to_string(),
        }
    } else if error.is_timeout() {
        FetchError::Timeout(error.to_string())
    } else if error.is_connect() {
        FetchError::Connect(error.to_string())
    } else if error.is_body() || error.is_decode() {
        FetchError::Body(error.to_string())
    } else {
        FetchError::Request(error.to_string())
    }
}

/// HTTP fetcher for a single fixed endpoint
pub struct HttpFetcher {
    client: Client,
    url: String,
    method: HttpMethod,
    body: Option<serde_json::Value>,
    headers: BTreeMap<String, String>,
}

impl HttpFetcher {
    pub fn from_config(target: &TargetConfig) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(target.connect_timeout_secs))
            .timeout(Duration::from_secs(target.request_timeout_secs))
            .build()
            .map_err(|e| MonitorError::HttpClient(format!("Failed to create HTTP client: {}", e)))?;

        let mut headers = target.headers.clone();
        if target.method == HttpMethod::Post
            && !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type"))
        {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }

        Ok(Self {
            client,
            url: target.url.clone(),
            method: target.method,
            body: target.body.clone(),
            headers,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_request(&self) -> reqwest::RequestBuilder {
        let mut request = match self.method {
            HttpMethod::Get => self.client.get(&self.url),
            HttpMethod::Post => self.client.post(&self.url),
        };
        // Headers first so `json()` does not add a second Content-Type
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if self.method == HttpMethod::Post {
            // An empty JSON object is sent when no body is configured
            let body = self
                .body
                .clone()
                .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
            request = request.json(&body);
        }
        request
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self) -> Result<String, FetchError> {
        debug!(url = %self.url, method = ?self.method, "Requesting target");
        let response = self
            .build_request()
            .send()
            .await
            .map_err(map_http_error)?
            .error_for_status()
            .map_err(map_http_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_http_error)?;
        debug!(status = status.as_u16(), bytes = bytes.len(), "Response received");
        // Lossy decoding would let distinct payloads share a fingerprint
        String::from_utf8(bytes.to_vec())
            .map_err(|e| FetchError::Body(format!("Response is not valid UTF-8: {}", e)))
    }

    fn describe(&self) -> String {
        format!("{} {}", self.method.as_str(), self.url)
    }
}
