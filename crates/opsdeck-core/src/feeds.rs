//! Wire shapes of the three health feeds polled by the status panel.
//!
//! Every feed carries an optional `error`. Its absence means the snapshot
//! is valid, even when the item list is empty.

use serde::{Deserialize, Serialize};

// ── Service status (`GET /api/status/monitor`) ──

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceStatusFeed {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub services: Vec<ServiceState>,
    #[serde(default)]
    pub incidents: Vec<PastIncident>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceState {
    pub service: String,
    pub status: String,
}

impl ServiceState {
    /// Only the literal "all good" status counts as fully healthy.
    pub fn is_healthy(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("all good")
    }
}

/// A dated line from the public status page's incident history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PastIncident {
    pub date: String,
    pub detail: String,
}

// ── Incident / on-call feed (`GET /api/incidents`) ──

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentFeed {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub counts: Option<IncidentCounts>,
    #[serde(default)]
    pub incidents: Vec<Incident>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentCounts {
    #[serde(default)]
    pub triggered: usize,
    #[serde(default)]
    pub acknowledged: usize,
    #[serde(default)]
    pub resolved: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Incident {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub urgency: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub created_at: String,
}

impl Incident {
    pub fn is_triggered(&self) -> bool {
        self.status.eq_ignore_ascii_case("triggered")
    }
}

impl IncidentFeed {
    /// Triggered count as reported by the feed, falling back to the items.
    pub fn triggered(&self) -> usize {
        match self.counts {
            Some(c) => c.triggered,
            None => self.incidents.iter().filter(|i| i.is_triggered()).count(),
        }
    }
}

// ── Deployment schedule (`GET /api/deployments`) ──

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentFeed {
    #[serde(default)]
    pub timestamp: String,
    /// UTC offset of `scheduled_at` values, e.g. `-08:00`.
    #[serde(default = "default_feed_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub deployments: Vec<ScheduledDeployment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_feed_timezone() -> String {
    "+00:00".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledDeployment {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub environment: String,
    /// `YYYY-MM-DD HH:MM` in the feed's timezone.
    pub scheduled_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_health_is_exact_all_good() {
        let ok = ServiceState {
            service: "Log In".into(),
            status: "  All Good ".into(),
        };
        let degraded = ServiceState {
            service: "Library".into(),
            status: "Degraded performance".into(),
        };
        assert!(ok.is_healthy());
        assert!(!degraded.is_healthy());
    }

    #[test]
    fn triggered_prefers_counts() {
        let feed: IncidentFeed = serde_json::from_str(
            r#"{"counts":{"triggered":3},"incidents":[{"status":"triggered"}]}"#,
        )
        .unwrap();
        assert_eq!(feed.triggered(), 3);

        let feed: IncidentFeed = serde_json::from_str(
            r#"{"incidents":[{"status":"triggered"},{"status":"resolved"},{"status":"TRIGGERED"}]}"#,
        )
        .unwrap();
        assert_eq!(feed.triggered(), 2);
    }

    #[test]
    fn error_field_is_optional() {
        let feed: ServiceStatusFeed =
            serde_json::from_str(r#"{"summary":"All systems operational"}"#).unwrap();
        assert!(feed.error.is_none());
        assert!(feed.services.is_empty());

        let feed: DeploymentFeed = serde_json::from_str(r#"{"error":"HTTP 502"}"#).unwrap();
        assert_eq!(feed.error.as_deref(), Some("HTTP 502"));
        assert_eq!(feed.timezone, "+00:00");
    }
}
