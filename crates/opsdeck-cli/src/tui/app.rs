use std::time::Duration;

use opsdeck_core::{HistoryEntry, TransportError};
use opsdeck_fragment::Container;
use opsdeck_history::{HistoryStore, HistoryView};
use opsdeck_status::{AlertOverlay, StatusBoard, StatusReport};
use time::{OffsetDateTime, UtcOffset};

/// Which panel is currently focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Status,
    History,
    Result,
}

impl Panel {
    pub fn next(self) -> Self {
        match self {
            Panel::Status => Panel::History,
            Panel::History => Panel::Result,
            Panel::Result => Panel::Status,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Panel::Status => Panel::Result,
            Panel::History => Panel::Status,
            Panel::Result => Panel::History,
        }
    }
}

/// Board state captured for one frame.
#[derive(Debug, Clone)]
pub struct StatusView {
    pub report: StatusReport,
    pub overlay: AlertOverlay,
    pub now: OffsetDateTime,
    pub window: Duration,
    pub reference: UtcOffset,
}

impl StatusView {
    pub fn capture(board: &StatusBoard) -> Self {
        let report = board.report();
        let now = board.now();
        Self {
            overlay: report.overlay(now, board.window(), board.reference()),
            report,
            now,
            window: board.window(),
            reference: board.reference(),
        }
    }
}

/// A past result opened from the history panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub query: String,
    pub text: String,
}

/// Application state for the TUI.
pub struct App {
    pub should_quit: bool,
    pub active_panel: Panel,
    pub paused: bool,

    // Data
    pub status: Option<StatusView>,
    pub history: HistoryStore,
    pub history_view: HistoryView,
    pub result: Option<ResultView>,
    pub error: Option<String>,

    // Scroll positions (per panel)
    pub status_scroll: usize,
    pub history_cursor: usize,
    pub result_scroll: usize,

    /// Search text while typing after `/`.
    pub search_input: Option<String>,
    history_requested: bool,
}

impl App {
    pub fn new(history: HistoryStore) -> Self {
        let history_view = history.view();
        Self {
            should_quit: false,
            active_panel: Panel::Status,
            paused: false,
            status: None,
            history,
            history_view,
            result: None,
            error: None,
            status_scroll: 0,
            history_cursor: 0,
            result_scroll: 0,
            search_input: None,
            history_requested: true,
        }
    }

    /// Take a fresh board capture (unless paused).
    pub fn update_status(&mut self, view: StatusView) {
        if !self.paused {
            self.status = Some(view);
        }
    }

    /// Install a completed history fetch.
    pub fn load_history(&mut self, fetched: Result<Vec<HistoryEntry>, TransportError>) {
        self.error = fetched.as_ref().err().map(|e| format!("history: {e}"));
        let view = self.history.apply(fetched);
        self.set_history_view(view);
    }

    /// Whether the loop should fetch history before the next frame.
    pub fn take_history_request(&mut self) -> bool {
        std::mem::take(&mut self.history_requested)
    }

    /// Handle a key press.
    pub fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
        use crossterm::event::KeyCode;

        if self.search_input.is_some() {
            self.handle_search_key(key.code);
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.active_panel = self.active_panel.next(),
            KeyCode::BackTab => self.active_panel = self.active_panel.prev(),
            KeyCode::Char(' ') => self.paused = !self.paused,
            KeyCode::Char('r') => self.history_requested = true,
            KeyCode::Char('e') => {
                let expanded = !self.history.is_expanded();
                let view = self.history.set_expanded(expanded);
                self.set_history_view(view);
            }
            KeyCode::Char('/') => {
                self.active_panel = Panel::History;
                self.search_input = Some(String::new());
            }
            KeyCode::Char('j') | KeyCode::Down => self.scroll_down(),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_up(),
            KeyCode::Enter if self.active_panel == Panel::History => self.open_selected(),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, code: crossterm::event::KeyCode) {
        use crossterm::event::KeyCode;

        let Some(input) = self.search_input.as_mut() else {
            return;
        };
        match code {
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Enter => {
                self.search_input = None;
                return;
            }
            KeyCode::Esc => {
                self.search_input = None;
                let view = self.history.search("");
                self.set_history_view(view);
                return;
            }
            _ => return,
        }
        let term = input.clone();
        let view = self.history.search(&term);
        self.set_history_view(view);
    }

    /// Show the entry under the history cursor in the result panel.
    fn open_selected(&mut self) {
        let Some(row) = self.history_view.rows.get(self.history_cursor) else {
            return;
        };
        match self.history.select(row.index) {
            Ok(entry) => {
                self.result = Some(ResultView {
                    query: entry.query.clone(),
                    text: Container::install(entry.fragment()).text(),
                });
                self.result_scroll = 0;
                self.active_panel = Panel::Result;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    fn set_history_view(&mut self, view: HistoryView) {
        self.history_cursor = self
            .history_cursor
            .min(view.rows.len().saturating_sub(1));
        self.history_view = view;
    }

    fn scroll_down(&mut self) {
        let (scroll, max) = self.active_scroll_and_max();
        if scroll < max.saturating_sub(1) {
            *self.active_scroll_mut() += 1;
        }
    }

    fn scroll_up(&mut self) {
        let scroll = self.active_scroll_mut();
        *scroll = scroll.saturating_sub(1);
    }

    fn active_scroll_and_max(&self) -> (usize, usize) {
        match self.active_panel {
            Panel::Status => (self.status_scroll, self.status_rows()),
            Panel::History => (self.history_cursor, self.history_view.rows.len()),
            Panel::Result => (
                self.result_scroll,
                self.result.as_ref().map_or(0, |r| r.text.lines().count()),
            ),
        }
    }

    fn active_scroll_mut(&mut self) -> &mut usize {
        match self.active_panel {
            Panel::Status => &mut self.status_scroll,
            Panel::History => &mut self.history_cursor,
            Panel::Result => &mut self.result_scroll,
        }
    }

    fn status_rows(&self) -> usize {
        self.status.as_ref().map_or(0, |s| {
            let report = &s.report;
            let count = |n: Option<usize>| n.unwrap_or(0);
            count(report.service.snapshot.as_ref().map(|s| s.items.len()))
                + count(
                    report
                        .incidents
                        .as_ref()
                        .and_then(|i| i.snapshot.as_ref())
                        .map(|s| s.items.len()),
                )
                + count(
                    report
                        .deployments
                        .as_ref()
                        .and_then(|d| d.snapshot.as_ref())
                        .map(|s| s.items.len()),
                )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    fn loaded_app() -> App {
        let mut app = App::new(HistoryStore::new(2, 30));
        app.load_history(Ok(vec![
            HistoryEntry::new("login errors last hour", "<p>12 errors</p>"),
            HistoryEntry::new("library latency", "<p>p99 420ms</p>"),
            HistoryEntry::new("who is on call", ""),
        ]));
        app
    }

    #[test]
    fn new_app_requests_history_once() {
        let mut app = App::new(HistoryStore::default());
        assert!(app.status.is_none());
        assert!(!app.should_quit);
        assert_eq!(app.active_panel, Panel::Status);
        assert!(app.take_history_request());
        assert!(!app.take_history_request());

        app.handle_key(key(KeyCode::Char('r')));
        assert!(app.take_history_request());
    }

    #[test]
    fn history_failure_shows_error() {
        let mut app = App::new(HistoryStore::default());
        app.load_history(Err(TransportError::Network("refused".into())));
        assert_eq!(app.error.as_deref(), Some("history: network error: refused"));
        assert!(app.history_view.rows.is_empty());
    }

    #[test]
    fn enter_opens_selected_history_result() {
        let mut app = loaded_app();
        app.active_panel = Panel::History;
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));

        let result = app.result.as_ref().unwrap();
        assert_eq!(result.query, "library latency");
        assert_eq!(result.text, "p99 420ms");
        assert_eq!(app.active_panel, Panel::Result);
    }

    #[test]
    fn empty_result_shows_placeholder_text() {
        let mut app = loaded_app();
        app.handle_key(key(KeyCode::Char('e')));
        app.active_panel = Panel::History;
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.result.unwrap().text, "No result available");
    }

    #[test]
    fn e_toggles_expanded_history() {
        let mut app = loaded_app();
        assert_eq!(app.history_view.rows.len(), 2);
        assert_eq!(app.history_view.hidden, 1);
        app.handle_key(key(KeyCode::Char('e')));
        assert_eq!(app.history_view.rows.len(), 3);
        app.handle_key(key(KeyCode::Char('e')));
        assert_eq!(app.history_view.rows.len(), 2);
    }

    #[test]
    fn slash_search_filters_and_esc_clears() {
        let mut app = loaded_app();
        app.handle_key(key(KeyCode::Char('/')));
        for c in "LAT".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(app.history_view.rows.len(), 1);
        assert_eq!(app.history_view.rows[0].index, 1);

        // 'q' is text while searching
        app.handle_key(key(KeyCode::Char('q')));
        assert!(!app.should_quit);
        assert!(app.history_view.rows.is_empty());

        app.handle_key(key(KeyCode::Esc));
        assert!(app.search_input.is_none());
        assert_eq!(app.history_view.rows.len(), 2);
    }

    #[test]
    fn panel_cycling() {
        assert_eq!(Panel::Status.next(), Panel::History);
        assert_eq!(Panel::History.next(), Panel::Result);
        assert_eq!(Panel::Result.next(), Panel::Status);
        assert_eq!(Panel::Status.prev(), Panel::Result);
    }

    #[test]
    fn quit_on_q() {
        let mut app = App::new(HistoryStore::default());
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn space_toggles_pause() {
        let mut app = App::new(HistoryStore::default());
        app.handle_key(key(KeyCode::Char(' ')));
        assert!(app.paused);
        app.handle_key(key(KeyCode::Char(' ')));
        assert!(!app.paused);
    }
}
