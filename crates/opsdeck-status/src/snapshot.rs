use opsdeck_core::TransportError;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ServiceStatus,
    IncidentFeed,
    DeploymentSchedule,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::ServiceStatus,
        SourceKind::IncidentFeed,
        SourceKind::DeploymentSchedule,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::ServiceStatus => "Service status",
            SourceKind::IncidentFeed => "Incidents",
            SourceKind::DeploymentSchedule => "Deployments",
        }
    }
}

/// One source's state as of its latest successful poll. Replaced whole,
/// never merged with an older snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot<T> {
    /// When this client received it (RFC 3339).
    pub fetched_at: String,
    /// The feed's own timestamp, as sent.
    pub source_timestamp: String,
    pub summary: String,
    pub items: Vec<T>,
    /// Extra lines the feed carries alongside its items.
    pub notes: Vec<String>,
    /// Alert count reported by the feed itself, if it reports one.
    pub reported_alerts: Option<usize>,
    /// Error reported inside an otherwise successful response.
    pub error: Option<String>,
}

impl<T> HealthSnapshot<T> {
    pub fn new(fetched_at: OffsetDateTime, items: Vec<T>) -> Self {
        Self {
            fetched_at: fetched_at.format(&Rfc3339).unwrap_or_default(),
            source_timestamp: String::new(),
            summary: String::new(),
            items,
            notes: Vec::new(),
            reported_alerts: None,
            error: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Latest known state of one source, as published by its poll loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceState<T> {
    pub kind: SourceKind,
    /// Last snapshot received, kept through later connection failures.
    pub snapshot: Option<HealthSnapshot<T>>,
    /// Set while the most recent poll could not reach the feed.
    pub connection_error: Option<String>,
    pub polls: u64,
    pub failures: u64,
}

impl<T> SourceState<T> {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            snapshot: None,
            connection_error: None,
            polls: 0,
            failures: 0,
        }
    }

    /// Fold one poll result in. A transport failure keeps the previous
    /// snapshot and marks the region; anything received replaces it.
    pub fn apply(&mut self, result: Result<HealthSnapshot<T>, TransportError>) {
        self.polls += 1;
        match result {
            Ok(snapshot) => {
                if let Some(error) = &snapshot.error {
                    tracing::warn!(source = ?self.kind, "feed reported an error: {error}");
                } else {
                    tracing::debug!(source = ?self.kind, items = snapshot.items.len(), "snapshot replaced");
                }
                self.snapshot = Some(snapshot);
                self.connection_error = None;
            }
            Err(e) => {
                tracing::warn!(source = ?self.kind, "poll failed: {e}");
                self.failures += 1;
                self.connection_error = Some(e.to_string());
            }
        }
    }

    /// Snapshot that can be trusted for indicators.
    pub fn valid_snapshot(&self) -> Option<&HealthSnapshot<T>> {
        self.snapshot.as_ref().filter(|s| s.is_valid())
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(items: Vec<u8>) -> HealthSnapshot<u8> {
        HealthSnapshot::new(OffsetDateTime::UNIX_EPOCH, items)
    }

    #[test]
    fn connection_error_keeps_last_snapshot() {
        let mut state = SourceState::new(SourceKind::IncidentFeed);
        state.apply(Ok(snap(vec![1, 2])));
        state.apply(Err(TransportError::Timeout(std::time::Duration::from_secs(15))));

        assert_eq!(state.valid_snapshot().map(|s| s.items.len()), Some(2));
        assert_eq!(
            state.connection_error.as_deref(),
            Some("request timed out after 15s")
        );
        assert_eq!((state.polls, state.failures), (2, 1));

        state.apply(Ok(snap(vec![3])));
        assert!(state.connection_error.is_none());
        assert_eq!(state.snapshot.unwrap().items, vec![3]);
    }

    #[test]
    fn feed_error_replaces_snapshot_wholesale() {
        let mut state = SourceState::new(SourceKind::ServiceStatus);
        state.apply(Ok(snap(vec![1])));
        let mut failed = snap(Vec::new());
        failed.error = Some("upstream down".into());
        state.apply(Ok(failed));

        assert!(state.is_loaded());
        assert!(state.valid_snapshot().is_none());
        assert!(state.connection_error.is_none());
    }

    #[test]
    fn fetched_at_is_rfc3339() {
        assert_eq!(snap(vec![]).fetched_at, "1970-01-01T00:00:00Z");
    }
}
