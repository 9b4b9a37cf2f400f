use std::collections::BTreeSet;

use opsdeck_core::tools::{takes_time_range, DEFAULT_TIME_RANGE_HOURS};
use opsdeck_core::{QuerySelection, ValidationError};

/// Whether the time-range control applies to this set of tools.
pub fn time_range_visible(tool_ids: &BTreeSet<String>) -> bool {
    tool_ids.iter().any(|id| takes_time_range(id))
}

/// Checked tools in the picker. Visibility of the time-range control is
/// recomputed on every change, never read from a cached flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSelection {
    checked: BTreeSet<String>,
}

impl ToolSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            checked: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Check or uncheck a tool. Returns the new time-range visibility.
    pub fn set(&mut self, tool_id: &str, checked: bool) -> bool {
        if checked {
            self.checked.insert(tool_id.to_string());
        } else {
            self.checked.remove(tool_id);
        }
        self.time_range_visible()
    }

    /// Flip a tool. Returns the new time-range visibility.
    pub fn toggle(&mut self, tool_id: &str) -> bool {
        let now_checked = !self.checked.contains(tool_id);
        self.set(tool_id, now_checked)
    }

    pub fn clear(&mut self) {
        self.checked.clear();
    }

    pub fn is_checked(&self, tool_id: &str) -> bool {
        self.checked.contains(tool_id)
    }

    pub fn ids(&self) -> &BTreeSet<String> {
        &self.checked
    }

    pub fn is_empty(&self) -> bool {
        self.checked.is_empty()
    }

    pub fn time_range_visible(&self) -> bool {
        time_range_visible(&self.checked)
    }
}

/// Build a submission from the current form state.
///
/// An empty tool set is reported first, regardless of the text. The chosen
/// hours are dropped when no selected tool takes a time range; when the
/// control is visible but nothing was chosen, the default range is sent.
pub fn compose(
    raw_input: &str,
    selection: &ToolSelection,
    chosen_hours: Option<u32>,
) -> Result<QuerySelection, ValidationError> {
    if selection.is_empty() {
        return Err(ValidationError::NoToolsSelected);
    }
    let input_text = raw_input.trim();
    if input_text.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    let time_range_hours = selection
        .time_range_visible()
        .then(|| chosen_hours.unwrap_or(DEFAULT_TIME_RANGE_HOURS));
    Ok(QuerySelection {
        input_text: input_text.to_string(),
        tool_ids: selection.ids().clone(),
        time_range_hours,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_follows_selection_synchronously() {
        let mut sel = ToolSelection::new();
        assert!(!sel.time_range_visible());
        assert!(sel.set("DD_Errors", true));
        assert!(sel.set("Wiki", true));
        assert!(!sel.set("DD_Errors", false));
        assert!(!sel.time_range_visible());
        assert!(sel.toggle("P0_Streaming"));
        assert!(!sel.toggle("P0_Streaming"));
    }

    #[test]
    fn no_tools_wins_over_empty_input() {
        let sel = ToolSelection::new();
        assert_eq!(compose("", &sel, None), Err(ValidationError::NoToolsSelected));
        assert_eq!(
            compose("login errors", &sel, None),
            Err(ValidationError::NoToolsSelected)
        );
    }

    #[test]
    fn blank_input_is_rejected_with_tools() {
        let sel = ToolSelection::with(["Wiki"]);
        assert_eq!(compose("", &sel, None), Err(ValidationError::EmptyInput));
        assert_eq!(compose("  \n ", &sel, None), Err(ValidationError::EmptyInput));
    }

    #[test]
    fn hidden_time_range_is_discarded() {
        let mut sel = ToolSelection::with(["DD_Errors"]);
        let q = compose("errors", &sel, Some(24)).unwrap();
        assert_eq!(q.time_range_hours, Some(24));

        sel.set("DD_Errors", false);
        sel.set("Wiki", true);
        let q = compose("errors", &sel, Some(24)).unwrap();
        assert_eq!(q.time_range_hours, None);
        assert!(q.to_request().timerange.is_none());
    }

    #[test]
    fn visible_time_range_defaults() {
        let sel = ToolSelection::with(["DD_Red_Metrics", "Owners"]);
        let q = compose("  playback red metrics ", &sel, None).unwrap();
        assert_eq!(q.input_text, "playback red metrics");
        assert_eq!(q.time_range_hours, Some(DEFAULT_TIME_RANGE_HOURS));
        assert_eq!(q.tool_ids.len(), 2);
    }
}
