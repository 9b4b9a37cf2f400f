use opsdeck_core::feeds::{Incident, ServiceState};
use opsdeck_core::{Backend, TransportError};
use time::OffsetDateTime;

use crate::schedule::{resolve_slots, DeploymentSlot};
use crate::snapshot::{HealthSnapshot, SourceKind};

/// One polled feed: how to fetch it and turn the response into a snapshot.
#[async_trait::async_trait]
pub trait HealthSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    const KIND: SourceKind;

    async fn poll(
        &self,
        backend: &dyn Backend,
        fetched_at: OffsetDateTime,
    ) -> Result<HealthSnapshot<Self::Item>, TransportError>;
}

// ── Service status ──

pub struct ServiceStatusSource;

#[async_trait::async_trait]
impl HealthSource for ServiceStatusSource {
    type Item = ServiceState;

    const KIND: SourceKind = SourceKind::ServiceStatus;

    async fn poll(
        &self,
        backend: &dyn Backend,
        fetched_at: OffsetDateTime,
    ) -> Result<HealthSnapshot<ServiceState>, TransportError> {
        let feed = backend.fetch_service_status().await?;
        let mut snapshot = HealthSnapshot::new(fetched_at, feed.services);
        snapshot.source_timestamp = feed.timestamp;
        snapshot.summary = feed.summary;
        snapshot.notes = feed
            .incidents
            .into_iter()
            .map(|i| format!("{}: {}", i.date, i.detail))
            .collect();
        snapshot.error = feed.error;
        Ok(snapshot)
    }
}

// ── Incidents ──

pub struct IncidentSource;

#[async_trait::async_trait]
impl HealthSource for IncidentSource {
    type Item = Incident;

    const KIND: SourceKind = SourceKind::IncidentFeed;

    async fn poll(
        &self,
        backend: &dyn Backend,
        fetched_at: OffsetDateTime,
    ) -> Result<HealthSnapshot<Incident>, TransportError> {
        let feed = backend.fetch_incidents().await?;
        let triggered = feed.triggered();
        let summary = match feed.counts {
            Some(c) => format!(
                "{} triggered, {} acknowledged, {} resolved",
                c.triggered, c.acknowledged, c.resolved
            ),
            None => format!("{triggered} triggered"),
        };
        let mut snapshot = HealthSnapshot::new(fetched_at, feed.incidents);
        snapshot.source_timestamp = feed.timestamp;
        snapshot.summary = summary;
        snapshot.reported_alerts = feed.counts.map(|c| c.triggered);
        snapshot.error = feed.error;
        Ok(snapshot)
    }
}

// ── Deployments ──

pub struct DeploymentSource;

#[async_trait::async_trait]
impl HealthSource for DeploymentSource {
    type Item = DeploymentSlot;

    const KIND: SourceKind = SourceKind::DeploymentSchedule;

    async fn poll(
        &self,
        backend: &dyn Backend,
        fetched_at: OffsetDateTime,
    ) -> Result<HealthSnapshot<DeploymentSlot>, TransportError> {
        let feed = backend.fetch_deployments().await?;
        let slots = resolve_slots(&feed.deployments, &feed.timezone);
        let mut snapshot = HealthSnapshot::new(fetched_at, slots);
        snapshot.summary = format!("{} scheduled (times in {})", snapshot.items.len(), feed.timezone);
        snapshot.source_timestamp = feed.timestamp;
        snapshot.error = feed.error;
        Ok(snapshot)
    }
}
