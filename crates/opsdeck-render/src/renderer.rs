use std::sync::Arc;
use std::time::Duration;

use opsdeck_core::{
    Backend, DeckConfig, ExecTime, HistoryError, QuerySelection, TransportError, ValidationError,
};
use opsdeck_fragment::{Container, ReanimationReport, Reanimator, ScriptHost};
use opsdeck_history::{HistoryStore, HistoryView};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::state::{is_valid_transition, CycleState};
use crate::surface::{Affordance, ErrorBlock, ResultSurface};
use crate::ticker::ElapsedTicker;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("invalid render cycle transition {from:?} -> {to:?}")]
    InvalidTransition { from: CycleState, to: CycleState },
}

/// Label shown under a result with the server-measured execution time.
pub fn exec_time_label(exec_time: &ExecTime) -> String {
    format!("Execution time: {exec_time}s")
}

/// A result that made it into the result area.
#[derive(Debug)]
pub struct Rendered {
    /// Installed markup after its scripts were replayed.
    pub container: Container,
    pub report: ReanimationReport,
    pub exec_label: Option<String>,
    /// Pending history refresh; only fresh submissions schedule one.
    pub history_refresh: Option<JoinHandle<HistoryView>>,
}

/// Drives one display cycle at a time: busy indicator, backend call,
/// fragment installation and script replay, then a delayed history refresh.
pub struct ResultRenderer {
    backend: Arc<dyn Backend>,
    surface: Arc<dyn ResultSurface>,
    host: Arc<dyn ScriptHost>,
    history: Arc<Mutex<HistoryStore>>,
    reanimator: Reanimator,
    refresh_delay: Duration,
    state: CycleState,
    /// Cancels the ticker of the cycle in flight. The ticker itself lives
    /// in the `submit` future, so dropping that future also stops it.
    ticker: Option<CancellationToken>,
    pending_refresh: Option<AbortHandle>,
    affordances_attached: bool,
}

impl ResultRenderer {
    pub fn new(
        backend: Arc<dyn Backend>,
        surface: Arc<dyn ResultSurface>,
        host: Arc<dyn ScriptHost>,
        history: Arc<Mutex<HistoryStore>>,
    ) -> Self {
        Self {
            backend,
            surface,
            host,
            history,
            reanimator: Reanimator::default(),
            refresh_delay: Duration::from_millis(500),
            state: CycleState::Idle,
            ticker: None,
            pending_refresh: None,
            affordances_attached: false,
        }
    }

    /// Apply the timing knobs from `config`.
    pub fn configured(mut self, config: &DeckConfig) -> Self {
        self.reanimator = Reanimator::from_config(config);
        self.refresh_delay = config.history_refresh_delay();
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn history(&self) -> Arc<Mutex<HistoryStore>> {
        self.history.clone()
    }

    /// Run one query cycle for a validated selection.
    ///
    /// Validation failures are reported to the surface and returned without
    /// touching the result area. Transport failures replace the result with
    /// an error block. The ticker is released on every path.
    pub async fn submit(&mut self, selection: &QuerySelection) -> Result<Rendered, CycleError> {
        if let Err(e) = validate(selection) {
            self.surface.show_validation(&e);
            return Err(e.into());
        }

        self.abandon_stale_cycle().await;
        self.transition(CycleState::Submitting)?;
        self.surface.clear();
        let ticker = ElapsedTicker::start(self.surface.clone());
        self.ticker = Some(ticker.cancel_token());

        let request = selection.to_request();
        tracing::debug!(tools = ?request.tools, "query cycle started");
        let response = self.backend.run_query(&request).await;

        self.ticker = None;
        ticker.stop().await;
        self.surface.clear_busy();

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("query failed: {e}");
                self.transition(CycleState::Failed)?;
                self.surface.show_error(&ErrorBlock::from(&e));
                self.transition(CycleState::Idle)?;
                return Err(e.into());
            }
        };

        self.transition(CycleState::Rendering)?;
        let label = exec_time_label(&response.exec_time);
        let (container, report) = self.render(response.fragment(), Some(&label)).await;
        self.transition(CycleState::Idle)?;

        Ok(Rendered {
            container,
            report,
            exec_label: Some(label),
            history_refresh: Some(self.schedule_history_refresh()),
        })
    }

    /// Show a past result from the current history snapshot. An index
    /// that is gone from the snapshot is a logged no-op.
    pub async fn show_history_result(&mut self, index: usize) -> Result<Rendered, CycleError> {
        let fragment = {
            let store = self.history.lock().await;
            match store.select(index) {
                Ok(entry) => entry.fragment().to_string(),
                Err(e) => {
                    tracing::warn!("ignoring history selection: {e}");
                    return Err(e.into());
                }
            }
        };

        self.abandon_stale_cycle().await;
        self.transition(CycleState::Rendering)?;
        self.surface.clear();
        let (container, report) = self.render(&fragment, None).await;
        self.transition(CycleState::Idle)?;

        Ok(Rendered {
            container,
            report,
            exec_label: None,
            history_refresh: None,
        })
    }

    /// Reset the result area and cancel any running ticker.
    pub async fn new_chat(&mut self) {
        self.stop_ticker().await;
        self.surface.clear();
        self.affordances_attached = false;
        if self.state != CycleState::Idle {
            if let Err(e) = self.transition(CycleState::Idle) {
                tracing::debug!("new chat from {:?}: {e}", self.state);
                self.state = CycleState::Idle;
            }
        }
    }

    async fn render(&mut self, fragment: &str, exec_label: Option<&str>) -> (Container, ReanimationReport) {
        self.affordances_attached = false;
        let mut container = Container::install(fragment);
        self.surface.install(&container);

        let report = self
            .reanimator
            .reanimate(&mut container, self.host.as_ref())
            .await;
        if !report.is_clean() {
            tracing::warn!(failed = report.failed.len(), total = report.total, "some result scripts failed");
        }

        if let Some(label) = exec_label {
            self.surface.show_exec_time(label);
        }
        self.attach_affordances();
        (container, report)
    }

    fn attach_affordances(&mut self) {
        if self.affordances_attached {
            return;
        }
        self.surface.attach_affordances(&Affordance::ALL);
        self.affordances_attached = true;
    }

    /// Only the latest refresh may land; an older one still pending is
    /// aborted so its snapshot cannot overwrite a newer one.
    fn schedule_history_refresh(&mut self) -> JoinHandle<HistoryView> {
        if let Some(previous) = self.pending_refresh.take() {
            previous.abort();
        }
        let backend = self.backend.clone();
        let history = self.history.clone();
        let delay = self.refresh_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let fetched = backend.fetch_history().await;
            history.lock().await.apply(fetched)
        });
        self.pending_refresh = Some(handle.abort_handle());
        handle
    }

    /// A submission future dropped mid-flight leaves `Submitting` behind.
    async fn abandon_stale_cycle(&mut self) {
        self.stop_ticker().await;
        if self.state == CycleState::Submitting {
            tracing::debug!("abandoning unfinished query cycle");
            self.state = CycleState::Idle;
        }
    }

    async fn stop_ticker(&mut self) {
        if let Some(cancel) = self.ticker.take() {
            cancel.cancel();
        }
    }

    fn transition(&mut self, to: CycleState) -> Result<(), CycleError> {
        let from = self.state;
        if !is_valid_transition(from, to) {
            return Err(CycleError::InvalidTransition { from, to });
        }
        self.state = to;
        Ok(())
    }
}

fn validate(selection: &QuerySelection) -> Result<(), ValidationError> {
    if selection.tool_ids.is_empty() {
        return Err(ValidationError::NoToolsSelected);
    }
    if selection.input_text.trim().is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    Ok(())
}
