use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::surface::ResultSurface;

const TICK: Duration = Duration::from_secs(1);

/// Busy indicator with whole elapsed seconds, refreshed once a second.
///
/// Dropping the ticker cancels it. [`ElapsedTicker::stop`] also waits for
/// the task to exit, so nothing is written to the surface afterwards.
pub struct ElapsedTicker {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    _guard: DropGuard,
}

impl ElapsedTicker {
    /// Show `0s` immediately and start counting.
    pub fn start(surface: Arc<dyn ResultSurface>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        surface.show_busy(0);
        let handle = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut interval = tokio::time::interval_at(started + TICK, TICK);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        surface.show_busy(started.elapsed().as_secs());
                    }
                }
            }
        });
        Self {
            _guard: cancel.clone().drop_guard(),
            cancel,
            handle: Some(handle),
        }
    }

    /// Token that stops this ticker without owning it.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Cancel and wait for the ticker task to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::debug!("elapsed ticker ended abnormally: {e}");
            }
        }
    }
}
