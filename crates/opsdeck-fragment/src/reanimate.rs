use std::time::Duration;

use opsdeck_core::{DeckConfig, ScriptTaskError};

use crate::container::{Container, ScriptKind};
use crate::host::{ScriptHost, ScriptNode};
use crate::queue::TaskQueue;

/// Outcome of one reanimation pass. Failures are per-script; there is no
/// overall failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReanimationReport {
    pub total: usize,
    pub completed: usize,
    /// `(script order, error)` for every script that failed to load.
    pub failed: Vec<(usize, ScriptTaskError)>,
}

impl ReanimationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Replays a container's inert scripts through a [`ScriptHost`].
#[derive(Debug, Clone, Copy)]
pub struct Reanimator {
    /// Pause after each inline script so its DOM mutations settle.
    pub settle: Duration,
    /// Upper bound on waiting for an external script.
    pub load_timeout: Duration,
}

impl Default for Reanimator {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(30),
            load_timeout: Duration::from_secs(10),
        }
    }
}

impl Reanimator {
    pub fn new(settle: Duration, load_timeout: Duration) -> Self {
        Self {
            settle,
            load_timeout,
        }
    }

    pub fn from_config(config: &DeckConfig) -> Self {
        Self::new(config.script_settle(), config.script_load_timeout())
    }

    /// Run every script in `container` in document order. Resolves once
    /// each one has at least been dispatched and has advanced.
    pub async fn reanimate(
        &self,
        container: &mut Container,
        host: &dyn ScriptHost,
    ) -> ReanimationReport {
        let mut queue = TaskQueue::new(container.pending_scripts());
        let total = queue.len();
        tracing::debug!(total, "reanimating fragment scripts");

        while let Some(pos) = queue.next_pending() {
            let task = match queue.dispatch(pos) {
                Ok(task) => task.clone(),
                Err(e) => {
                    tracing::warn!("script queue stalled: {e}");
                    break;
                }
            };
            let node = ScriptNode::from_task(&task);

            match &task.kind {
                ScriptKind::External { src } => {
                    let load = host.append_external(&node, src);
                    container.remove_script(task.order);
                    let outcome = match tokio::time::timeout(self.load_timeout, load).await {
                        Ok(result) => result,
                        Err(_) => Err(ScriptTaskError::Timeout {
                            src: src.clone(),
                            after: self.load_timeout,
                        }),
                    };
                    let advanced = match outcome {
                        Ok(()) => {
                            tracing::debug!(order = task.order, src = %src, "script loaded");
                            queue.complete(pos)
                        }
                        Err(e) => {
                            tracing::warn!(order = task.order + 1, "{e}");
                            queue.fail(pos, e)
                        }
                    };
                    if let Err(e) = advanced {
                        tracing::warn!("script queue stalled: {e}");
                        break;
                    }
                }
                ScriptKind::Inline { .. } => {
                    host.append_inline(&node).await;
                    container.remove_script(task.order);
                    tokio::time::sleep(self.settle).await;
                    if let Err(e) = queue.complete(pos) {
                        tracing::warn!("script queue stalled: {e}");
                        break;
                    }
                }
            }
        }

        let completed = queue.completed();
        let failed = queue.into_failures();
        tracing::debug!(total, completed, failed = failed.len(), "reanimation finished");
        ReanimationReport {
            total,
            completed,
            failed,
        }
    }
}
