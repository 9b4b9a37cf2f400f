use serde::{Deserialize, Serialize};

/// Tools whose backend handlers accept a time range (hours).
pub const TIME_RANGE_TOOLS: &[&str] = &["DD_Red_Metrics", "DD_Errors", "DD_Red_ADT", "P0_Streaming"];

/// Time range the backend assumes when none is sent.
pub const DEFAULT_TIME_RANGE_HOURS: u32 = 4;

/// Choices offered by the time-range control.
pub const TIME_RANGE_CHOICES: &[u32] = &[1, 4, 12, 24, 72, 168];

/// Check whether a tool id carries a time range.
pub fn takes_time_range(tool_id: &str) -> bool {
    TIME_RANGE_TOOLS.contains(&tool_id)
}

/// One entry of `GET /api/tools`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default, alias = "description")]
    pub desc: String,
}

impl ToolInfo {
    /// Hover text: the description, or the name when there is none.
    pub fn hint(&self) -> &str {
        if self.desc.trim().is_empty() {
            &self.name
        } else {
            &self.desc
        }
    }

    pub fn group(&self) -> ToolGroup {
        ToolGroup::classify(&self.name)
    }
}

/// Display group for the tool picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolGroup {
    Datadog,
    Splunk,
    Incidents,
    Knowledge,
    Assistants,
    Other,
}

impl ToolGroup {
    pub const ALL: [ToolGroup; 6] = [
        ToolGroup::Datadog,
        ToolGroup::Splunk,
        ToolGroup::Incidents,
        ToolGroup::Knowledge,
        ToolGroup::Assistants,
        ToolGroup::Other,
    ];

    /// Classify a tool by its name alone.
    pub fn classify(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("dd_") {
            ToolGroup::Datadog
        } else if lower.starts_with("p0_") || lower.contains("splunk") {
            ToolGroup::Splunk
        } else if lower.starts_with("pd_") || lower.contains("oncall") || lower.contains("pagerduty") {
            ToolGroup::Incidents
        } else if lower == "wiki"
            || lower == "owners"
            || lower.contains("version")
            || lower.contains("confluence")
            || lower.contains("kt")
        {
            ToolGroup::Knowledge
        } else if lower.starts_with("ask_") || lower == "suggestions" {
            ToolGroup::Assistants
        } else {
            ToolGroup::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ToolGroup::Datadog => "Datadog",
            ToolGroup::Splunk => "Splunk",
            ToolGroup::Incidents => "Incidents & On-call",
            ToolGroup::Knowledge => "Knowledge",
            ToolGroup::Assistants => "Assistants",
            ToolGroup::Other => "Other",
        }
    }
}

/// Group a catalog for display, preserving catalog order inside each group.
/// Empty groups are omitted.
pub fn group_tools(tools: &[ToolInfo]) -> Vec<(ToolGroup, Vec<&ToolInfo>)> {
    ToolGroup::ALL
        .iter()
        .filter_map(|group| {
            let members: Vec<&ToolInfo> = tools.iter().filter(|t| t.group() == *group).collect();
            (!members.is_empty()).then_some((*group, members))
        })
        .collect()
}
