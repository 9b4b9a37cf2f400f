//! HTTP implementation of [`Backend`] and an external-script loader,
//! both over `reqwest`.

use std::time::Duration;

use opsdeck_core::feeds::{DeploymentFeed, IncidentFeed, ServiceStatusFeed};
use opsdeck_core::tools::ToolInfo;
use opsdeck_core::{Backend, DeckConfig, HistoryEntry, RunRequest, RunResponse, TransportError};
use opsdeck_fragment::ResourceLoader;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

// ── Endpoints ──

const RUN: &str = "/api/run";
const HISTORY: &str = "/api/history";
const TOOLS: &str = "/api/tools";
const STATUS: &str = "/api/status/monitor";
const INCIDENTS: &str = "/api/incidents";
const DEPLOYMENTS: &str = "/api/deployments";
const EXPORT: &str = "/api/export";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn build_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Normalise a base URL: trim whitespace and trailing slashes.
fn normalize_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

// ── Backend ──

/// The dashboard backend reached over HTTP.
///
/// Query submission is bounded by `query_timeout`; every other call by
/// `fetch_timeout`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    query_timeout: Duration,
    fetch_timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: &str, query_timeout: Duration, fetch_timeout: Duration) -> Self {
        Self {
            client: build_client(),
            base_url: normalize_base(base_url),
            query_timeout,
            fetch_timeout,
        }
    }

    pub fn from_config(config: &DeckConfig) -> Self {
        Self::new(
            &config.backend_url,
            config.query_timeout(),
            config.fetch_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let req = self.client.get(self.url(path));
        send_json(req, self.fetch_timeout).await
    }
}

async fn send(req: RequestBuilder, timeout: Duration) -> Result<reqwest::Response, TransportError> {
    let resp = req
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| map_error(e, timeout))?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "backend returned error status");
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

async fn send_json<T: DeserializeOwned>(
    req: RequestBuilder,
    timeout: Duration,
) -> Result<T, TransportError> {
    let resp = send(req, timeout).await?;
    resp.json::<T>().await.map_err(|e| map_error(e, timeout))
}

fn map_error(e: reqwest::Error, timeout: Duration) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(timeout)
    } else if e.is_decode() {
        TransportError::Decode(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn run_query(&self, request: &RunRequest) -> Result<RunResponse, TransportError> {
        tracing::debug!(tools = ?request.tools, timerange = ?request.timerange, "submitting query");
        let req = self.client.post(self.url(RUN)).json(request);
        send_json(req, self.query_timeout).await
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, TransportError> {
        self.get_json(HISTORY).await
    }

    async fn fetch_tools(&self) -> Result<Vec<ToolInfo>, TransportError> {
        self.get_json(TOOLS).await
    }

    async fn fetch_service_status(&self) -> Result<ServiceStatusFeed, TransportError> {
        self.get_json(STATUS).await
    }

    async fn fetch_incidents(&self) -> Result<IncidentFeed, TransportError> {
        self.get_json(INCIDENTS).await
    }

    async fn fetch_deployments(&self) -> Result<DeploymentFeed, TransportError> {
        self.get_json(DEPLOYMENTS).await
    }

    async fn export_document(&self, html: &str) -> Result<Vec<u8>, TransportError> {
        let req = self
            .client
            .post(self.url(EXPORT))
            .json(&serde_json::json!({ "html": html }));
        let resp = send(req, self.query_timeout).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| map_error(e, self.query_timeout))?;
        Ok(bytes.to_vec())
    }
}

// ── Script loader ──

/// Loads external scripts referenced by result fragments. Relative
/// sources resolve against the backend URL.
#[derive(Debug, Clone)]
pub struct HttpResourceLoader {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpResourceLoader {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: build_client(),
            base_url: normalize_base(base_url),
            timeout,
        }
    }

    pub fn from_config(config: &DeckConfig) -> Self {
        Self::new(&config.backend_url, config.script_load_timeout())
    }

    /// Absolute URL for a script `src`.
    pub fn resolve(&self, src: &str) -> Result<Url, String> {
        if let Ok(url) = Url::parse(src) {
            return Ok(url);
        }
        let base = Url::parse(&format!("{}/", self.base_url))
            .map_err(|e| format!("invalid backend url {}: {e}", self.base_url))?;
        base.join(src)
            .map_err(|e| format!("invalid script source {src}: {e}"))
    }
}

#[async_trait::async_trait]
impl ResourceLoader for HttpResourceLoader {
    async fn load(&self, src: &str) -> Result<(), String> {
        let url = self.resolve(src)?;
        tracing::debug!(%url, "loading external script");
        send(self.client.get(url), self.timeout)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

// ── Tests ──
