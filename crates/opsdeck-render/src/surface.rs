use std::sync::Mutex;

use opsdeck_core::{TransportError, ValidationError};
use opsdeck_fragment::Container;
use serde::Serialize;

pub const ERROR_TITLE: &str = "Error";
pub const ERROR_HINT: &str = "Please check your connection and try again.";

/// User-visible failure shown in place of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBlock {
    pub title: String,
    pub message: String,
    pub hint: String,
}

impl ErrorBlock {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: ERROR_TITLE.to_string(),
            message: message.into(),
            hint: ERROR_HINT.to_string(),
        }
    }

    pub fn render_text(&self) -> String {
        format!("{}\n{}\n{}", self.title, self.message, self.hint)
    }
}

impl From<&TransportError> for ErrorBlock {
    fn from(e: &TransportError) -> Self {
        ErrorBlock::new(e.to_string())
    }
}

/// Controls attached under a rendered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Affordance {
    Copy,
    Expand,
    Collapse,
    Export,
}

impl Affordance {
    pub const ALL: [Affordance; 4] = [
        Affordance::Copy,
        Affordance::Expand,
        Affordance::Collapse,
        Affordance::Export,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Affordance::Copy => "Copy",
            Affordance::Expand => "Expand",
            Affordance::Collapse => "Collapse",
            Affordance::Export => "Export",
        }
    }
}

/// The result display area. Owned by one render cycle at a time.
pub trait ResultSurface: Send + Sync {
    /// Empty the result area and any labels.
    fn clear(&self);
    /// Busy indicator with whole elapsed seconds.
    fn show_busy(&self, elapsed_secs: u64);
    fn clear_busy(&self);
    /// The fragment is in place; its scripts have not run yet.
    fn install(&self, container: &Container);
    fn show_exec_time(&self, label: &str);
    fn show_error(&self, error: &ErrorBlock);
    fn show_validation(&self, error: &ValidationError);
    fn attach_affordances(&self, affordances: &[Affordance]);
}

// ── Recording surface ──

/// Everything written to a [`RecordingSurface`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Clear,
    Busy(u64),
    ClearBusy,
    Install(String),
    ExecTime(String),
    Error(ErrorBlock),
    Validation(ValidationError),
    Affordances(Vec<Affordance>),
}

/// Collects surface writes in memory (for testing).
#[derive(Debug, Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Busy ticks written so far.
    pub fn busy_ticks(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SurfaceEvent::Busy(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SurfaceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl ResultSurface for RecordingSurface {
    fn clear(&self) {
        self.push(SurfaceEvent::Clear);
    }

    fn show_busy(&self, elapsed_secs: u64) {
        self.push(SurfaceEvent::Busy(elapsed_secs));
    }

    fn clear_busy(&self) {
        self.push(SurfaceEvent::ClearBusy);
    }

    fn install(&self, container: &Container) {
        self.push(SurfaceEvent::Install(container.markup()));
    }

    fn show_exec_time(&self, label: &str) {
        self.push(SurfaceEvent::ExecTime(label.to_string()));
    }

    fn show_error(&self, error: &ErrorBlock) {
        self.push(SurfaceEvent::Error(error.clone()));
    }

    fn show_validation(&self, error: &ValidationError) {
        self.push(SurfaceEvent::Validation(*error));
    }

    fn attach_affordances(&self, affordances: &[Affordance]) {
        self.push(SurfaceEvent::Affordances(affordances.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_block_from_transport() {
        let block = ErrorBlock::from(&TransportError::Status {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(block.title, "Error");
        assert_eq!(block.message, "server error: 500");
        assert_eq!(
            block.render_text(),
            "Error\nserver error: 500\nPlease check your connection and try again."
        );
    }

    #[test]
    fn recording_surface_keeps_order() {
        let s = RecordingSurface::new();
        s.clear();
        s.show_busy(0);
        s.show_busy(1);
        s.clear_busy();
        assert_eq!(s.busy_ticks(), [0, 1]);
        assert_eq!(s.events().first(), Some(&SurfaceEvent::Clear));
        assert_eq!(s.events().last(), Some(&SurfaceEvent::ClearBusy));
    }
}
