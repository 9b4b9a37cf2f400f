//! Health panel: one independent poll loop per feed (service status,
//! incidents, deployment schedule), each publishing its own snapshot, and
//! an alert overlay computed per source from the latest of each.

pub mod aggregator;
pub mod indicators;
pub mod schedule;
pub mod snapshot;
pub mod sources;

pub use aggregator::{AlertOverlay, SourceBadge, StatusAggregator, StatusBoard, StatusReport};
pub use indicators::{
    deployment_indicators, incident_indicators, service_indicators, DeploymentIndicators,
    DeploymentRow, IncidentIndicators, ServiceIndicators,
};
pub use schedule::{current_deployment, day_label, DeploymentSlot};
pub use snapshot::{HealthSnapshot, SourceKind, SourceState};
pub use sources::HealthSource;
