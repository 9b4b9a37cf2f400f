use std::sync::Arc;
use std::time::Duration;

use opsdeck_core::feeds::{Incident, ServiceState};
use opsdeck_core::{Backend, Clock, DeckConfig};
use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::indicators::{deployment_indicators, incident_indicators, service_indicators};
use crate::schedule::DeploymentSlot;
use crate::snapshot::{SourceKind, SourceState};
use crate::sources::{DeploymentSource, HealthSource, IncidentSource, ServiceStatusSource};

// ── Overlay ──

/// Alert count of one source. Never summed with other sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceBadge {
    pub kind: SourceKind,
    /// `None` until a valid snapshot has arrived.
    pub count: Option<usize>,
    pub connection_error: Option<String>,
    /// Error the feed itself reported.
    pub feed_error: Option<String>,
}

impl SourceBadge {
    fn from_state<T>(state: &SourceState<T>, count: Option<usize>) -> Self {
        Self {
            kind: state.kind,
            count,
            connection_error: state.connection_error.clone(),
            feed_error: state.snapshot.as_ref().and_then(|s| s.error.clone()),
        }
    }

    pub fn render_text(&self) -> String {
        let value = match (&self.count, &self.connection_error, &self.feed_error) {
            (_, _, Some(_)) => "unavailable".to_string(),
            (Some(n), None, None) => n.to_string(),
            (Some(n), Some(_), None) => format!("{n} (connection error)"),
            (None, Some(_), None) => "connection error".to_string(),
            (None, None, None) => "...".to_string(),
        };
        format!("{}: {value}", self.kind.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertOverlay {
    pub badges: Vec<SourceBadge>,
}

impl AlertOverlay {
    pub fn badge(&self, kind: SourceKind) -> Option<&SourceBadge> {
        self.badges.iter().find(|b| b.kind == kind)
    }

    pub fn render_text(&self) -> String {
        self.badges
            .iter()
            .map(SourceBadge::render_text)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

// ── Report ──

/// Latest state of every enabled source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub service: SourceState<ServiceState>,
    pub incidents: Option<SourceState<Incident>>,
    pub deployments: Option<SourceState<DeploymentSlot>>,
}

impl StatusReport {
    pub fn overlay(&self, now: OffsetDateTime, window: Duration, reference: UtcOffset) -> AlertOverlay {
        let mut badges = Vec::with_capacity(3);
        badges.push(SourceBadge::from_state(
            &self.service,
            self.service
                .valid_snapshot()
                .map(|s| service_indicators(s).badge),
        ));
        if let Some(state) = &self.incidents {
            badges.push(SourceBadge::from_state(
                state,
                state.valid_snapshot().map(|s| incident_indicators(s).badge),
            ));
        }
        if let Some(state) = &self.deployments {
            badges.push(SourceBadge::from_state(
                state,
                state
                    .valid_snapshot()
                    .map(|s| deployment_indicators(s, now, window, reference).badge),
            ));
        }
        AlertOverlay { badges }
    }
}

// ── Aggregator ──

/// Polls each health feed on its own timer.
pub struct StatusAggregator {
    backend: Arc<dyn Backend>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    window: Duration,
    reference: UtcOffset,
    incident_feed: bool,
    deployment_feed: bool,
}

impl StatusAggregator {
    pub fn new(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>, config: &DeckConfig) -> anyhow::Result<Self> {
        Ok(Self {
            backend,
            clock,
            interval: config.poll_interval(),
            window: config.deploy_window(),
            reference: config.reference_offset()?,
            incident_feed: config.incident_feed,
            deployment_feed: config.deployment_feed,
        })
    }

    pub fn reference(&self) -> UtcOffset {
        self.reference
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Take one snapshot of every enabled source, concurrently.
    pub async fn poll_once(&self) -> StatusReport {
        let now = self.clock.now_utc();
        let backend = self.backend.as_ref();
        let (service, incidents, deployments) = tokio::join!(
            poll_into(&ServiceStatusSource, backend, now),
            async {
                if self.incident_feed {
                    Some(poll_into(&IncidentSource, backend, now).await)
                } else {
                    None
                }
            },
            async {
                if self.deployment_feed {
                    Some(poll_into(&DeploymentSource, backend, now).await)
                } else {
                    None
                }
            },
        );
        StatusReport {
            service,
            incidents,
            deployments,
        }
    }

    /// Start one poll loop per enabled source. Each loop polls at once and
    /// then every interval, publishing through its own channel, until
    /// `cancel` fires.
    pub fn spawn(&self, cancel: CancellationToken) -> StatusBoard {
        let mut handles = Vec::new();
        let service = self.start(ServiceStatusSource, &cancel, &mut handles);
        let incidents = self
            .incident_feed
            .then(|| self.start(IncidentSource, &cancel, &mut handles));
        let deployments = self
            .deployment_feed
            .then(|| self.start(DeploymentSource, &cancel, &mut handles));
        tracing::debug!(
            loops = handles.len(),
            interval_secs = self.interval.as_secs(),
            "status polling started"
        );
        StatusBoard {
            service,
            incidents,
            deployments,
            handles,
            cancel,
            clock: self.clock.clone(),
            window: self.window,
            reference: self.reference,
        }
    }

    fn start<S: HealthSource>(
        &self,
        source: S,
        cancel: &CancellationToken,
        handles: &mut Vec<JoinHandle<()>>,
    ) -> watch::Receiver<SourceState<S::Item>> {
        let (tx, rx) = watch::channel(SourceState::new(S::KIND));
        handles.push(tokio::spawn(run_source(
            source,
            self.backend.clone(),
            self.clock.clone(),
            self.interval,
            cancel.clone(),
            tx,
        )));
        rx
    }
}

async fn poll_into<S: HealthSource>(
    source: &S,
    backend: &dyn Backend,
    now: OffsetDateTime,
) -> SourceState<S::Item> {
    let mut state = SourceState::new(S::KIND);
    state.apply(source.poll(backend, now).await);
    state
}

async fn run_source<S: HealthSource>(
    source: S,
    backend: Arc<dyn Backend>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    cancel: CancellationToken,
    tx: watch::Sender<SourceState<S::Item>>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            r = source.poll(backend.as_ref(), clock.now_utc()) => r,
        };
        tx.send_modify(|state| state.apply(result));
    }
    tracing::debug!(source = ?S::KIND, "poll loop stopped");
}

// ── Board ──

/// Read side of the running poll loops.
pub struct StatusBoard {
    service: watch::Receiver<SourceState<ServiceState>>,
    incidents: Option<watch::Receiver<SourceState<Incident>>>,
    deployments: Option<watch::Receiver<SourceState<DeploymentSlot>>>,
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
    clock: Arc<dyn Clock>,
    window: Duration,
    reference: UtcOffset,
}

impl StatusBoard {
    /// Latest state of every source.
    pub fn report(&self) -> StatusReport {
        StatusReport {
            service: self.service.borrow().clone(),
            incidents: self.incidents.as_ref().map(|rx| rx.borrow().clone()),
            deployments: self.deployments.as_ref().map(|rx| rx.borrow().clone()),
        }
    }

    pub fn overlay(&self) -> AlertOverlay {
        self.report()
            .overlay(self.clock.now_utc(), self.window, self.reference)
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn reference(&self) -> UtcOffset {
        self.reference
    }

    /// Resolve when any source publishes. Returns the source that changed,
    /// or `None` once every loop has stopped.
    pub async fn changed(&mut self) -> Option<SourceKind> {
        let Self {
            service,
            incidents,
            deployments,
            ..
        } = self;
        let incidents = async {
            match incidents.as_mut() {
                Some(rx) => rx.changed().await,
                None => std::future::pending().await,
            }
        };
        let deployments = async {
            match deployments.as_mut() {
                Some(rx) => rx.changed().await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            r = service.changed() => r.ok().map(|_| SourceKind::ServiceStatus),
            r = incidents => r.ok().map(|_| SourceKind::IncidentFeed),
            r = deployments => r.ok().map(|_| SourceKind::DeploymentSchedule),
        }
    }

    /// Stop every poll loop and wait for them to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::debug!("poll loop ended abnormally: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use opsdeck_core::backend::FakeBackend;
    use opsdeck_core::feeds::{
        DeploymentFeed, IncidentCounts, IncidentFeed, ScheduledDeployment, ServiceStatusFeed,
    };
    use opsdeck_core::{ManualClock, TransportError};
    use time::macros::datetime;

    use super::*;

    fn status_feed(degraded: usize) -> ServiceStatusFeed {
        let mut services = vec![ServiceState {
            service: "Log In".into(),
            status: "All Good".into(),
        }];
        for i in 0..degraded {
            services.push(ServiceState {
                service: format!("svc-{i}"),
                status: "Degraded".into(),
            });
        }
        ServiceStatusFeed {
            summary: "Minor Service Outage".into(),
            services,
            ..Default::default()
        }
    }

    fn incident_feed(triggered: usize) -> IncidentFeed {
        IncidentFeed {
            counts: Some(IncidentCounts {
                triggered,
                acknowledged: 0,
                resolved: 3,
            }),
            ..Default::default()
        }
    }

    fn deployment_feed() -> DeploymentFeed {
        DeploymentFeed {
            timezone: "+00:00".into(),
            deployments: vec![ScheduledDeployment {
                service: "api".into(),
                version: "2.0".into(),
                environment: "prod".into(),
                scheduled_at: "2026-10-19 09:00".into(),
            }],
            ..Default::default()
        }
    }

    fn config(interval_secs: u64) -> DeckConfig {
        DeckConfig {
            poll_interval_secs: interval_secs,
            ..Default::default()
        }
    }

    fn setup() -> (Arc<FakeBackend>, Arc<ManualClock>) {
        let backend = Arc::new(FakeBackend::new());
        let clock = Arc::new(ManualClock::new(datetime!(2026-10-19 10:00 UTC)));
        (backend, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn incident_failure_leaves_service_region_untouched() {
        let (backend, clock) = setup();
        backend.push_status(Ok(status_feed(2)));
        backend.push_incidents(Ok(incident_feed(1)));
        backend.push_incidents(Err(TransportError::Network("reset".into())));
        backend.push_deployments(Ok(deployment_feed()));

        let agg = StatusAggregator::new(backend.clone(), clock, &config(60)).unwrap();
        let board = agg.spawn(CancellationToken::new());

        tokio::time::sleep(Duration::from_secs(1)).await;
        let first = board.overlay();
        assert_eq!(first.badge(SourceKind::ServiceStatus).unwrap().count, Some(2));
        assert_eq!(first.badge(SourceKind::IncidentFeed).unwrap().count, Some(1));
        assert_eq!(first.badge(SourceKind::DeploymentSchedule).unwrap().count, Some(1));

        tokio::time::sleep(Duration::from_secs(60)).await;
        let second = board.overlay();
        let service = second.badge(SourceKind::ServiceStatus).unwrap();
        assert_eq!(service.count, Some(2));
        assert!(service.connection_error.is_none());
        let incidents = second.badge(SourceKind::IncidentFeed).unwrap();
        assert_eq!(incidents.count, Some(1));
        assert_eq!(incidents.connection_error.as_deref(), Some("network error: reset"));
        assert_eq!(board.report().service.polls, 2);

        board.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn each_source_polls_on_its_interval() {
        let (backend, clock) = setup();
        backend.push_status(Ok(status_feed(0)));
        backend.push_incidents(Ok(incident_feed(0)));
        backend.push_deployments(Ok(deployment_feed()));
        let agg = StatusAggregator::new(backend.clone(), clock, &config(180)).unwrap();
        let cancel = CancellationToken::new();
        let board = agg.spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.call_count("status"), 1);
        tokio::time::sleep(Duration::from_secs(178)).await;
        assert_eq!(backend.call_count("status"), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(backend.call_count("status"), 2);
        assert_eq!(backend.call_count("incidents"), 2);
        assert_eq!(backend.call_count("deployments"), 2);

        cancel.cancel();
        board.shutdown().await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(backend.call_count("status"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_feeds_are_not_polled() {
        let (backend, clock) = setup();
        backend.push_status(Ok(status_feed(1)));
        let cfg = DeckConfig {
            incident_feed: false,
            deployment_feed: false,
            ..Default::default()
        };
        let agg = StatusAggregator::new(backend.clone(), clock, &cfg).unwrap();
        let mut board = agg.spawn(CancellationToken::new());
        assert_eq!(board.changed().await, Some(SourceKind::ServiceStatus));
        assert_eq!(board.overlay().badges.len(), 1);
        assert_eq!(backend.call_count("incidents"), 0);
        board.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn deployment_badge_follows_clock() {
        let (backend, clock) = setup();
        backend.push_status(Ok(status_feed(0)));
        backend.push_incidents(Ok(incident_feed(0)));
        backend.push_deployments(Ok(deployment_feed()));
        let agg = StatusAggregator::new(backend, clock.clone(), &config(180)).unwrap();
        let report = agg.poll_once().await;

        let now = clock.now_utc();
        let overlay = report.overlay(now, agg.window(), agg.reference());
        assert_eq!(overlay.badge(SourceKind::DeploymentSchedule).unwrap().count, Some(1));

        clock.set(datetime!(2026-10-19 11:00 UTC));
        let overlay = report.overlay(clock.now_utc(), agg.window(), agg.reference());
        assert_eq!(overlay.badge(SourceKind::DeploymentSchedule).unwrap().count, Some(0));
    }

    #[tokio::test]
    async fn poll_once_isolates_failures() {
        let (backend, clock) = setup();
        backend.push_status(Ok(status_feed(1)));
        backend.push_incidents(Ok(IncidentFeed {
            error: Some("PagerDuty token expired".into()),
            ..Default::default()
        }));
        let agg = StatusAggregator::new(backend, clock.clone(), &config(180)).unwrap();
        let report = agg.poll_once().await;
        let overlay = report.overlay(clock.now_utc(), agg.window(), agg.reference());

        assert_eq!(
            overlay.render_text(),
            "Service status: 1 | Incidents: unavailable | Deployments: connection error"
        );
    }
}
