use std::io::{IsTerminal, Write};
use std::path::Path;
use std::sync::Mutex;

use opsdeck_core::ValidationError;
use opsdeck_fragment::Container;
use opsdeck_render::{Affordance, ErrorBlock, ResultSurface};

/// Result area for a scrolling terminal: results go to `out`, the busy
/// ticker to stderr (only when stderr is a terminal).
pub struct TerminalSurface<W: Write + Send> {
    out: Mutex<W>,
    progress: bool,
}

impl TerminalSurface<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout(), std::io::stderr().is_terminal())
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W, progress: bool) -> Self {
        Self {
            out: Mutex::new(out),
            progress,
        }
    }

    fn line(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(out, "{text}").and_then(|_| out.flush()) {
            tracing::debug!("result write failed: {e}");
        }
    }

    fn progress(&self, text: &str) {
        if self.progress {
            let mut err = std::io::stderr();
            let _ = write!(err, "{text}");
            let _ = err.flush();
        }
    }
}

impl<W: Write + Send> ResultSurface for TerminalSurface<W> {
    // Output scrolls; there is nothing to erase.
    fn clear(&self) {}

    fn show_busy(&self, elapsed_secs: u64) {
        self.progress(&format!("\rWorking... {elapsed_secs}s"));
    }

    fn clear_busy(&self) {
        self.progress("\r\x1b[2K");
    }

    fn install(&self, container: &Container) {
        self.line(&container.text());
    }

    fn show_exec_time(&self, label: &str) {
        self.line(&format!("\n{label}"));
    }

    fn show_error(&self, error: &ErrorBlock) {
        self.line(&error.render_text());
    }

    fn show_validation(&self, error: &ValidationError) {
        self.line(&format!("Error: {error}"));
    }

    fn attach_affordances(&self, affordances: &[Affordance]) {
        tracing::debug!(
            affordances = ?affordances.iter().map(|a| a.label()).collect::<Vec<_>>(),
            "result controls available"
        );
    }
}

/// Write a standalone HTML document next to the terminal output.
pub fn write_document(path: &Path, html: &str) -> anyhow::Result<()> {
    std::fs::write(path, html)
        .map_err(|e| anyhow::anyhow!("cannot write {}: {e}", path.display()))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}
