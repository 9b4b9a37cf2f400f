use std::time::Duration;

use opsdeck_core::feeds::{Incident, ServiceState};
use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};

use crate::schedule::{clock_label, current_deployment, day_label, DeploymentSlot};
use crate::snapshot::HealthSnapshot;

// ── Service status ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceIndicators {
    /// The feed's summary mentions "operational".
    pub operational: bool,
    /// Services not reporting "all good", in feed order.
    pub degraded: Vec<String>,
    pub badge: usize,
}

pub fn service_indicators(snapshot: &HealthSnapshot<ServiceState>) -> ServiceIndicators {
    let degraded: Vec<String> = snapshot
        .items
        .iter()
        .filter(|s| !s.is_healthy())
        .map(|s| s.service.clone())
        .collect();
    ServiceIndicators {
        operational: snapshot.summary.to_lowercase().contains("operational"),
        badge: degraded.len(),
        degraded,
    }
}

// ── Incidents ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentIndicators {
    pub triggered: Vec<Incident>,
    pub badge: usize,
}

pub fn incident_indicators(snapshot: &HealthSnapshot<Incident>) -> IncidentIndicators {
    let triggered: Vec<Incident> = snapshot
        .items
        .iter()
        .filter(|i| i.is_triggered())
        .cloned()
        .collect();
    IncidentIndicators {
        badge: snapshot.reported_alerts.unwrap_or(triggered.len()),
        triggered,
    }
}

// ── Deployments ──

/// One deployment as shown on the panel, in the reference zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRow {
    pub service: String,
    pub version: String,
    pub environment: String,
    /// `Today`, `Tomorrow` or a date; empty when the time was unreadable.
    pub day: String,
    /// `HH:MM`, or the raw value when unreadable.
    pub time: String,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentIndicators {
    pub rows: Vec<DeploymentRow>,
    pub current: Option<usize>,
    pub badge: usize,
}

pub fn deployment_indicators(
    snapshot: &HealthSnapshot<DeploymentSlot>,
    now: OffsetDateTime,
    window: Duration,
    reference: UtcOffset,
) -> DeploymentIndicators {
    let current = current_deployment(&snapshot.items, now, window);
    let rows = snapshot
        .items
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let (day, time) = match slot.starts_at {
                Some(at) => (day_label(at, now, reference), clock_label(at, reference)),
                None => (String::new(), slot.scheduled_at.clone()),
            };
            DeploymentRow {
                service: slot.service.clone(),
                version: slot.version.clone(),
                environment: slot.environment.clone(),
                day,
                time,
                current: current == Some(i),
            }
        })
        .collect();
    DeploymentIndicators {
        rows,
        current,
        badge: usize::from(current.is_some()),
    }
}

#[cfg(test)]
mod tests {
    use opsdeck_core::feeds::ScheduledDeployment;
    use time::macros::{datetime, offset};

    use super::*;
    use crate::schedule::resolve_slots;

    fn service(name: &str, status: &str) -> ServiceState {
        ServiceState {
            service: name.into(),
            status: status.into(),
        }
    }

    fn incident(id: &str, status: &str) -> Incident {
        Incident {
            id: id.into(),
            title: format!("incident {id}"),
            status: status.into(),
            urgency: "high".into(),
            service: "playback".into(),
            created_at: String::new(),
        }
    }

    #[test]
    fn service_badge_counts_unhealthy() {
        let mut snap = HealthSnapshot::new(
            OffsetDateTime::UNIX_EPOCH,
            vec![
                service("Log In", "All Good"),
                service("Library", "Degraded"),
                service("Playback", "Partial outage"),
            ],
        );
        snap.summary = "Partially Degraded Service".into();
        let ind = service_indicators(&snap);
        assert_eq!(ind.badge, 2);
        assert_eq!(ind.degraded, ["Library", "Playback"]);
        assert!(!ind.operational);

        snap.summary = "All Systems Operational".into();
        assert!(service_indicators(&snap).operational);
    }

    #[test]
    fn incident_badge_prefers_reported_count() {
        let mut snap = HealthSnapshot::new(
            OffsetDateTime::UNIX_EPOCH,
            vec![incident("1", "triggered"), incident("2", "acknowledged")],
        );
        assert_eq!(incident_indicators(&snap).badge, 1);
        snap.reported_alerts = Some(4);
        let ind = incident_indicators(&snap);
        assert_eq!(ind.badge, 4);
        assert_eq!(ind.triggered.len(), 1);
    }

    #[test]
    fn deployment_rows_render_in_reference_zone() {
        let slots = resolve_slots(
            &[
                ScheduledDeployment {
                    service: "api".into(),
                    version: "2.4.0".into(),
                    environment: "prod".into(),
                    scheduled_at: "2026-10-19 09:00".into(),
                },
                ScheduledDeployment {
                    service: "web".into(),
                    version: "7.1".into(),
                    environment: "prod".into(),
                    scheduled_at: "2026-10-20 09:00".into(),
                },
                ScheduledDeployment {
                    service: "worker".into(),
                    version: "1".into(),
                    environment: "stage".into(),
                    scheduled_at: "soon".into(),
                },
            ],
            "-08:00",
        );
        let snap = HealthSnapshot::new(OffsetDateTime::UNIX_EPOCH, slots);
        let now = datetime!(2026-10-19 18:00 UTC);
        let ind = deployment_indicators(&snap, now, Duration::from_secs(7200), offset!(-8));

        assert_eq!(ind.current, Some(0));
        assert_eq!(ind.badge, 1);
        assert_eq!(ind.rows[0].day, "Today");
        assert_eq!(ind.rows[0].time, "09:00");
        assert!(ind.rows[0].current);
        assert_eq!(ind.rows[1].day, "Tomorrow");
        assert!(!ind.rows[1].current);
        assert_eq!(ind.rows[2].day, "");
        assert_eq!(ind.rows[2].time, "soon");
    }
}
