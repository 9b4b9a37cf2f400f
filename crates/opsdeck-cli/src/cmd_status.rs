use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use opsdeck_core::SystemClock;
use opsdeck_status::{
    deployment_indicators, incident_indicators, service_indicators, HealthSnapshot, SourceState,
    StatusAggregator, StatusReport,
};
use time::{OffsetDateTime, UtcOffset};

use crate::Deck;

/// `opsdeck status`: poll every enabled feed once.
pub async fn execute(deck: &Deck, json: bool) -> anyhow::Result<()> {
    let clock = Arc::new(SystemClock);
    let aggregator = StatusAggregator::new(deck.backend.clone(), clock, &deck.config)?;
    let report = aggregator.poll_once().await;
    let now = OffsetDateTime::now_utc();
    let overlay = report.overlay(now, aggregator.window(), aggregator.reference());

    if json {
        let out = serde_json::json!({ "overlay": overlay, "report": report });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}\n", overlay.render_text());
        print!(
            "{}",
            format_report(&report, now, aggregator.window(), aggregator.reference())
        );
    }
    Ok(())
}

// ── Human-readable formatting ──

pub fn format_report(
    report: &StatusReport,
    now: OffsetDateTime,
    window: Duration,
    reference: UtcOffset,
) -> String {
    let mut out = String::new();

    section(&mut out, &report.service, |out, snap| {
        let ind = service_indicators(snap);
        if ind.degraded.is_empty() {
            let _ = writeln!(out, "  all services reporting normally");
        }
        for svc in snap.items.iter().filter(|s| !s.is_healthy()) {
            let _ = writeln!(out, "  ! {}: {}", svc.service, svc.status);
        }
        for note in &snap.notes {
            let _ = writeln!(out, "  - {note}");
        }
    });

    if let Some(state) = &report.incidents {
        section(&mut out, state, |out, snap| {
            let ind = incident_indicators(snap);
            if ind.triggered.is_empty() {
                let _ = writeln!(out, "  no triggered incidents");
            }
            for i in &ind.triggered {
                let _ = writeln!(out, "  ! [{}] {} ({}) {}", i.urgency, i.title, i.service, i.id);
            }
        });
    }

    if let Some(state) = &report.deployments {
        section(&mut out, state, |out, snap| {
            let ind = deployment_indicators(snap, now, window, reference);
            if ind.rows.is_empty() {
                let _ = writeln!(out, "  nothing scheduled");
            }
            for row in &ind.rows {
                let marker = if row.current { ">" } else { " " };
                let when = format!("{} {}", row.day, row.time);
                let _ = writeln!(
                    out,
                    "  {marker} {:<16} {} {} ({})",
                    when.trim(),
                    row.service,
                    row.version,
                    row.environment
                );
            }
        });
    }
    out
}

fn section<T>(
    out: &mut String,
    state: &SourceState<T>,
    body: impl FnOnce(&mut String, &HealthSnapshot<T>),
) {
    let title = state.kind.label();
    match &state.snapshot {
        None => {
            let _ = writeln!(out, "{title}");
        }
        Some(snap) if snap.summary.is_empty() => {
            let _ = writeln!(out, "{title}");
        }
        Some(snap) => {
            let _ = writeln!(out, "{title} ({})", snap.summary);
        }
    }
    if let Some(e) = &state.connection_error {
        let _ = writeln!(out, "  connection error: {e}");
    }
    match &state.snapshot {
        Some(snap) if !snap.is_valid() => {
            let _ = writeln!(out, "  unavailable: {}", snap.error.as_deref().unwrap_or(""));
        }
        Some(snap) => body(out, snap),
        None if state.connection_error.is_none() => {
            let _ = writeln!(out, "  loading...");
        }
        None => {}
    }
    out.push('\n');
}
