use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder rendered when the backend returns an empty result fragment.
pub const EMPTY_RESULT_FRAGMENT: &str = "<p>No results returned</p>";

/// Placeholder rendered when a history entry carries no stored result.
pub const EMPTY_HISTORY_FRAGMENT: &str = "<p>No result available</p>";

/// One past query as returned by `GET /api/history` (newest first).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub result: String,
}

impl HistoryEntry {
    pub fn new(query: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            result: result.into(),
        }
    }

    /// Stored fragment, or the "no result" placeholder when empty.
    pub fn fragment(&self) -> &str {
        if self.result.trim().is_empty() {
            EMPTY_HISTORY_FRAGMENT
        } else {
            &self.result
        }
    }
}

/// A validated submission, built fresh from the current selection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySelection {
    pub input_text: String,
    pub tool_ids: BTreeSet<String>,
    pub time_range_hours: Option<u32>,
}

impl QuerySelection {
    pub fn to_request(&self) -> RunRequest {
        RunRequest {
            input: self.input_text.clone(),
            tools: self.tool_ids.iter().cloned().collect(),
            timerange: self.time_range_hours,
        }
    }
}

/// Body of `POST /api/run`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRequest {
    pub input: String,
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timerange: Option<u32>,
}

/// Response of `POST /api/run`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunResponse {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub exec_time: ExecTime,
}

impl RunResponse {
    /// Fragment to install, or the "no results" placeholder when empty.
    pub fn fragment(&self) -> &str {
        if self.result.trim().is_empty() {
            EMPTY_RESULT_FRAGMENT
        } else {
            &self.result
        }
    }
}

/// Server-measured execution time in seconds. The backend sends a number,
/// older builds sent a preformatted string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ExecTime {
    Seconds(f64),
    Text(String),
}

impl Default for ExecTime {
    fn default() -> Self {
        ExecTime::Seconds(0.0)
    }
}

impl fmt::Display for ExecTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecTime::Seconds(s) => write!(f, "{s}"),
            ExecTime::Text(t) if t.trim().is_empty() => f.write_str("0"),
            ExecTime::Text(t) => f.write_str(t.trim()),
        }
    }
}
