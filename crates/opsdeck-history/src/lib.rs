use opsdeck_core::{Backend, HistoryEntry, HistoryError, TransportError};
use serde::Serialize;

// ── Labels ───────────────────────────────────────────────────────────

/// Full display text of an entry: the query verbatim, or "Query N"
/// (1-based) when the query is blank.
pub fn entry_label(entry: &HistoryEntry, index: usize) -> String {
    if entry.query.trim().is_empty() {
        format!("Query {}", index + 1)
    } else {
        entry.query.clone()
    }
}

/// Truncate a label to `budget` characters, appending `...` when cut.
pub fn compact_label(full: &str, budget: usize) -> String {
    if full.chars().count() > budget {
        let head: String = full.chars().take(budget).collect();
        format!("{head}...")
    } else {
        full.to_string()
    }
}

// ── View types ───────────────────────────────────────────────────────

/// Exactly one presentation mode is active. A non-empty search term
/// always wins over preview/expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "term")]
pub enum ViewMode {
    Preview,
    Expanded,
    Search(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    /// Position in the snapshot; valid until the next refresh.
    pub index: usize,
    /// Compact label for the list.
    pub label: String,
    /// Untruncated label (hover detail).
    pub full_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum Placeholder {
    NoHistory,
    NoMatches,
    LoadError(String),
}

impl Placeholder {
    pub fn text(&self) -> String {
        match self {
            Placeholder::NoHistory => "No history yet".to_string(),
            Placeholder::NoMatches => "No matching queries".to_string(),
            Placeholder::LoadError(_) => "Error loading history".to_string(),
        }
    }
}

/// What the history panel shows right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryView {
    pub mode: ViewMode,
    pub rows: Vec<HistoryRow>,
    /// Entries left out by the preview limit.
    pub hidden: usize,
    pub placeholder: Option<Placeholder>,
}

impl HistoryView {
    /// Label of the expand/collapse control, when it applies.
    pub fn toggle_text(&self) -> Option<String> {
        match &self.mode {
            ViewMode::Preview if self.hidden > 0 => Some(format!("Show {} more", self.hidden)),
            ViewMode::Expanded => Some("Show less".to_string()),
            _ => None,
        }
    }
}

// ── Store ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Snapshot {
    NotLoaded,
    Loaded(Vec<HistoryEntry>),
    Failed(String),
}

/// Past queries as last fetched from the backend, plus the panel's
/// expand/search state.
///
/// Each refresh swaps the whole snapshot in one assignment once the fetch
/// has fully completed, so a view never mixes two snapshots.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    snapshot: Snapshot,
    expanded: bool,
    term: String,
    preview: usize,
    label_budget: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(3, 30)
    }
}

impl HistoryStore {
    pub fn new(preview: usize, label_budget: usize) -> Self {
        Self {
            snapshot: Snapshot::NotLoaded,
            expanded: false,
            term: String::new(),
            preview,
            label_budget,
        }
    }

    pub fn from_config(config: &opsdeck_core::DeckConfig) -> Self {
        Self::new(config.history_preview, config.label_budget)
    }

    /// Fetch the full history and replace the snapshot. On failure the
    /// old snapshot is dropped and the view becomes the error placeholder.
    pub async fn refresh(&mut self, backend: &dyn Backend) -> HistoryView {
        let fetched = backend.fetch_history().await;
        self.apply(fetched)
    }

    /// Apply a completed history fetch. Lets callers fetch without holding
    /// a lock on the store.
    pub fn apply(&mut self, fetched: Result<Vec<HistoryEntry>, TransportError>) -> HistoryView {
        match fetched {
            Ok(entries) => {
                tracing::debug!(count = entries.len(), "history refreshed");
                self.replace(entries);
            }
            Err(e) => {
                tracing::warn!("failed to load history: {e}");
                self.snapshot = Snapshot::Failed(e.to_string());
            }
        }
        self.view()
    }

    /// Install a snapshot obtained elsewhere.
    pub fn replace(&mut self, entries: Vec<HistoryEntry>) {
        self.snapshot = Snapshot::Loaded(entries);
    }

    pub fn set_expanded(&mut self, expanded: bool) -> HistoryView {
        self.expanded = expanded;
        self.view()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Set the search term, matched as typed (spaces included). Only the
    /// empty term returns to the preview/expanded view.
    pub fn search(&mut self, term: &str) -> HistoryView {
        self.term = term.to_string();
        self.view()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        match &self.snapshot {
            Snapshot::Loaded(entries) => entries,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Entry at `index` in the current snapshot. Indices from an older
    /// snapshot may no longer exist.
    pub fn select(&self, index: usize) -> Result<&HistoryEntry, HistoryError> {
        let entries = self.entries();
        entries.get(index).ok_or(HistoryError::NotFound {
            index,
            len: entries.len(),
        })
    }

    pub fn view(&self) -> HistoryView {
        let mode = if !self.term.is_empty() {
            ViewMode::Search(self.term.clone())
        } else if self.expanded {
            ViewMode::Expanded
        } else {
            ViewMode::Preview
        };

        let entries = match &self.snapshot {
            Snapshot::Failed(message) => {
                return HistoryView {
                    mode,
                    rows: Vec::new(),
                    hidden: 0,
                    placeholder: Some(Placeholder::LoadError(message.clone())),
                }
            }
            Snapshot::NotLoaded => &[][..],
            Snapshot::Loaded(entries) => entries.as_slice(),
        };

        if entries.is_empty() {
            return HistoryView {
                mode,
                rows: Vec::new(),
                hidden: 0,
                placeholder: Some(Placeholder::NoHistory),
            };
        }

        let all = entries.iter().enumerate().map(|(i, e)| self.row(e, i));
        let (rows, hidden): (Vec<HistoryRow>, usize) = match &mode {
            ViewMode::Search(term) => {
                let needle = term.to_lowercase();
                let rows = all
                    .filter(|r| r.full_label.to_lowercase().contains(&needle))
                    .collect();
                (rows, 0)
            }
            ViewMode::Expanded => (all.collect(), 0),
            ViewMode::Preview => (
                all.take(self.preview).collect(),
                entries.len().saturating_sub(self.preview),
            ),
        };
        let placeholder = rows.is_empty().then_some(Placeholder::NoMatches);
        HistoryView {
            mode,
            rows,
            hidden,
            placeholder,
        }
    }

    fn row(&self, entry: &HistoryEntry, index: usize) -> HistoryRow {
        let full_label = entry_label(entry, index);
        HistoryRow {
            index,
            label: compact_label(&full_label, self.label_budget),
            full_label,
        }
    }
}

// ── Human-readable formatting ────────────────────────────────────────

/// Render a view as terminal lines: `[index] label`, then the toggle hint.
pub fn format_view(view: &HistoryView) -> String {
    let mut out = String::new();
    if let Some(p) = &view.placeholder {
        out.push_str(&p.text());
        if let Placeholder::LoadError(message) = p {
            out.push_str(&format!(": {message}"));
        }
        out.push('\n');
    }
    for row in &view.rows {
        out.push_str(&format!("  [{}] {}\n", row.index, row.label));
    }
    if let Some(toggle) = view.toggle_text() {
        out.push_str(&format!("  ({toggle})\n"));
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────
