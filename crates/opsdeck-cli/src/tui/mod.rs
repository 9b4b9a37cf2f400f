mod app;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use opsdeck_core::{Backend, HistoryEntry, TransportError};
use opsdeck_history::HistoryStore;
use opsdeck_status::StatusBoard;
use tokio::task::JoinHandle;

use app::{App, StatusView};

use crate::Deck;

/// Redraw cadence when no source publishes.
const FRAME: Duration = Duration::from_millis(200);

/// Run the dashboard until the user quits. The poll loops keep running on
/// the same runtime; the frame loop yields between key checks.
pub async fn run(board: StatusBoard, deck: &Deck) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, board, deck).await;
    ratatui::restore();
    result
}

async fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    mut board: StatusBoard,
    deck: &Deck,
) -> anyhow::Result<()> {
    let backend: Arc<dyn Backend> = deck.backend.clone();
    let mut app = App::new(HistoryStore::from_config(&deck.config));
    let mut history = HistoryFetch::default();
    let mut polling = true;

    loop {
        if let Some(fetched) = history.take_finished().await {
            app.load_history(fetched);
        }
        if !history.is_pending() && app.take_history_request() {
            history.start(backend.clone());
        }
        app.update_status(StatusView::capture(&board));

        terminal.draw(|f| ui::render(f, &app))?;

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
        if app.should_quit {
            break;
        }

        if polling {
            tokio::select! {
                changed = board.changed() => {
                    if changed.is_none() {
                        polling = false;
                        app.error = Some("status polling stopped".to_string());
                    }
                }
                _ = tokio::time::sleep(FRAME) => {}
            }
        } else {
            tokio::time::sleep(FRAME).await;
        }
    }

    history.cancel();
    board.shutdown().await;
    Ok(())
}

type HistoryResult = Result<Vec<HistoryEntry>, TransportError>;

/// History fetch running beside the frame loop so keys and redraws never
/// wait on the backend.
#[derive(Default)]
struct HistoryFetch {
    pending: Option<JoinHandle<HistoryResult>>,
}

impl HistoryFetch {
    /// Start a fetch unless one is already in flight.
    fn start(&mut self, backend: Arc<dyn Backend>) {
        if self.pending.is_none() {
            self.pending = Some(tokio::spawn(async move { backend.fetch_history().await }));
        }
    }

    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Result of a completed fetch; `None` while it is still running.
    async fn take_finished(&mut self) -> Option<HistoryResult> {
        if !self.pending.as_ref()?.is_finished() {
            return None;
        }
        let handle = self.pending.take()?;
        Some(handle.await.unwrap_or_else(|e| {
            Err(TransportError::Network(format!("history fetch ended: {e}")))
        }))
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdeck_core::backend::FakeBackend;

    #[tokio::test(start_paused = true)]
    async fn slow_history_fetch_does_not_block_frames() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_history_delay(Duration::from_secs(15));
        backend.push_history(Ok(vec![HistoryEntry::new("errors", "<p>3</p>")]));

        let mut fetch = HistoryFetch::default();
        fetch.start(backend.clone());
        fetch.start(backend.clone());
        assert!(fetch.is_pending());

        tokio::time::sleep(FRAME).await;
        assert!(fetch.take_finished().await.is_none());
        assert_eq!(backend.call_count("history"), 1);

        tokio::time::sleep(Duration::from_secs(15)).await;
        let entries = fetch.take_finished().await.unwrap().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!fetch.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_fetch_is_dropped() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_history_delay(Duration::from_secs(15));
        let mut fetch = HistoryFetch::default();
        fetch.start(backend);
        fetch.cancel();
        assert!(!fetch.is_pending());
        assert!(fetch.take_finished().await.is_none());
    }
}
