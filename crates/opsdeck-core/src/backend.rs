use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::TransportError;
use crate::feeds::{DeploymentFeed, IncidentFeed, ServiceStatusFeed};
use crate::tools::ToolInfo;
use crate::types::{HistoryEntry, RunRequest, RunResponse};

/// The query-execution service and the feeds it exposes. Implemented over
/// HTTP by `opsdeck-client` and by [`FakeBackend`] in tests.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn run_query(&self, request: &RunRequest) -> Result<RunResponse, TransportError>;
    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, TransportError>;
    async fn fetch_tools(&self) -> Result<Vec<ToolInfo>, TransportError>;
    async fn fetch_service_status(&self) -> Result<ServiceStatusFeed, TransportError>;
    async fn fetch_incidents(&self) -> Result<IncidentFeed, TransportError>;
    async fn fetch_deployments(&self) -> Result<DeploymentFeed, TransportError>;
    /// Hand the rendered result to the export service; returns the document bytes.
    async fn export_document(&self, html: &str) -> Result<Vec<u8>, TransportError>;
}

// ── Fake ──

/// Canned responses per endpoint (for testing).
///
/// Each endpoint answers from a queue of scripted results; once the queue
/// is drained the last result is repeated. An optional delay is applied to
/// `run_query` and history fetches so callers can observe in-flight state
/// under a paused tokio clock.
pub struct FakeBackend {
    run: Scripted<RunResponse>,
    history: Scripted<Vec<HistoryEntry>>,
    tools: Scripted<Vec<ToolInfo>>,
    status: Scripted<ServiceStatusFeed>,
    incidents: Scripted<IncidentFeed>,
    deployments: Scripted<DeploymentFeed>,
    export: Scripted<Vec<u8>>,
    run_delay: Mutex<Option<Duration>>,
    history_delay: Mutex<Option<Duration>>,
    requests: Mutex<Vec<RunRequest>>,
    calls: Mutex<Vec<&'static str>>,
}

struct Scripted<T> {
    queue: Mutex<VecDeque<Result<T, TransportError>>>,
    last: Mutex<Result<T, TransportError>>,
}

impl<T: Clone> Scripted<T> {
    fn new(initial: Result<T, TransportError>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            last: Mutex::new(initial),
        }
    }

    fn push(&self, next: Result<T, TransportError>) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(next);
    }

    fn next(&self) -> Result<T, TransportError> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            *last = next;
        }
        last.clone()
    }
}

fn not_scripted<T>(endpoint: &str) -> Result<T, TransportError> {
    Err(TransportError::Network(format!("{endpoint}: no response scripted")))
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            run: Scripted::new(not_scripted("run")),
            history: Scripted::new(Ok(Vec::new())),
            tools: Scripted::new(Ok(Vec::new())),
            status: Scripted::new(not_scripted("status")),
            incidents: Scripted::new(not_scripted("incidents")),
            deployments: Scripted::new(not_scripted("deployments")),
            export: Scripted::new(not_scripted("export")),
            run_delay: Mutex::new(None),
            history_delay: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_run(&self, r: Result<RunResponse, TransportError>) {
        self.run.push(r);
    }

    pub fn push_history(&self, r: Result<Vec<HistoryEntry>, TransportError>) {
        self.history.push(r);
    }

    pub fn push_tools(&self, r: Result<Vec<ToolInfo>, TransportError>) {
        self.tools.push(r);
    }

    pub fn push_status(&self, r: Result<ServiceStatusFeed, TransportError>) {
        self.status.push(r);
    }

    pub fn push_incidents(&self, r: Result<IncidentFeed, TransportError>) {
        self.incidents.push(r);
    }

    pub fn push_deployments(&self, r: Result<DeploymentFeed, TransportError>) {
        self.deployments.push(r);
    }

    pub fn push_export(&self, r: Result<Vec<u8>, TransportError>) {
        self.export.push(r);
    }

    pub fn set_run_delay(&self, delay: Duration) {
        *self.run_delay.lock().unwrap_or_else(|e| e.into_inner()) = Some(delay);
    }

    pub fn set_history_delay(&self, delay: Duration) {
        *self.history_delay.lock().unwrap_or_else(|e| e.into_inner()) = Some(delay);
    }

    /// Every `run_query` request received, in order.
    pub fn run_requests(&self) -> Vec<RunRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of calls made to an endpoint (`"run"`, `"history"`, ...).
    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| **c == endpoint)
            .count()
    }

    fn record(&self, endpoint: &'static str) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(endpoint);
    }

    async fn pause(delay: &Mutex<Option<Duration>>) {
        let delay = *delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait::async_trait]
impl Backend for FakeBackend {
    async fn run_query(&self, request: &RunRequest) -> Result<RunResponse, TransportError> {
        self.record("run");
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        Self::pause(&self.run_delay).await;
        self.run.next()
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, TransportError> {
        self.record("history");
        Self::pause(&self.history_delay).await;
        self.history.next()
    }

    async fn fetch_tools(&self) -> Result<Vec<ToolInfo>, TransportError> {
        self.record("tools");
        self.tools.next()
    }

    async fn fetch_service_status(&self) -> Result<ServiceStatusFeed, TransportError> {
        self.record("status");
        self.status.next()
    }

    async fn fetch_incidents(&self) -> Result<IncidentFeed, TransportError> {
        self.record("incidents");
        self.incidents.next()
    }

    async fn fetch_deployments(&self) -> Result<DeploymentFeed, TransportError> {
        self.record("deployments");
        self.deployments.next()
    }

    async fn export_document(&self, _html: &str) -> Result<Vec<u8>, TransportError> {
        self.record("export");
        self.export.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_responses_drain_then_repeat() {
        let fake = FakeBackend::new();
        fake.push_history(Ok(vec![HistoryEntry::new("a", "1")]));
        fake.push_history(Err(TransportError::Network("down".into())));

        assert_eq!(fake.fetch_history().await.unwrap().len(), 1);
        assert!(fake.fetch_history().await.is_err());
        assert!(fake.fetch_history().await.is_err());
        assert_eq!(fake.call_count("history"), 3);
    }

    #[tokio::test]
    async fn unscripted_run_is_a_network_error() {
        let fake = FakeBackend::new();
        let req = RunRequest {
            input: "x".into(),
            tools: vec!["Wiki".into()],
            timerange: None,
        };
        assert!(matches!(
            fake.run_query(&req).await,
            Err(TransportError::Network(_))
        ));
        assert_eq!(fake.run_requests(), vec![req]);
    }
}
