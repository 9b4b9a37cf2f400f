use std::time::Duration;

use opsdeck_core::config::parse_utc_offset;
use opsdeck_core::feeds::ScheduledDeployment;
use serde::Serialize;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// A scheduled deployment with its start resolved against the feed's zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentSlot {
    pub service: String,
    pub version: String,
    pub environment: String,
    /// As sent, `YYYY-MM-DD HH:MM` in the feed's zone.
    pub scheduled_at: String,
    /// `None` when `scheduled_at` could not be parsed.
    #[serde(skip)]
    pub starts_at: Option<OffsetDateTime>,
}

/// Resolve feed entries. `timezone` is the feed's UTC offset; an invalid
/// one falls back to UTC.
pub fn resolve_slots(entries: &[ScheduledDeployment], timezone: &str) -> Vec<DeploymentSlot> {
    let zone = parse_utc_offset(timezone).unwrap_or_else(|e| {
        tracing::warn!("deployment feed: {e}; assuming UTC");
        UtcOffset::UTC
    });
    entries
        .iter()
        .map(|d| {
            let starts_at = parse_schedule_time(&d.scheduled_at, zone);
            if starts_at.is_none() {
                tracing::warn!(
                    service = %d.service,
                    "skipping deployment with unparseable time {:?}",
                    d.scheduled_at
                );
            }
            DeploymentSlot {
                service: d.service.clone(),
                version: d.version.clone(),
                environment: d.environment.clone(),
                scheduled_at: d.scheduled_at.clone(),
                starts_at,
            }
        })
        .collect()
}

/// Parse `YYYY-MM-DD HH:MM` as a wall-clock time in `zone`.
pub fn parse_schedule_time(s: &str, zone: UtcOffset) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(s.trim(), format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .ok()
        .map(|t| t.assume_offset(zone))
}

/// Index of the deployment in progress at `now`: the earliest start with
/// `start <= now < start + window`. Equal starts go to feed order.
/// A window reaching past the representable calendar never closes.
pub fn current_deployment(
    slots: &[DeploymentSlot],
    now: OffsetDateTime,
    window: Duration,
) -> Option<usize> {
    slots
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.starts_at.map(|start| (i, start)))
        .filter(|(_, start)| *start <= now && within_window(*start, now, window))
        .min_by_key(|(_, start)| *start)
        .map(|(i, _)| i)
}

fn within_window(start: OffsetDateTime, now: OffsetDateTime, window: Duration) -> bool {
    time::Duration::try_from(window)
        .ok()
        .and_then(|w| start.checked_add(w))
        .map_or(true, |end| now < end)
}

/// `Today`, `Tomorrow`, or an absolute date like `Mon Oct 19`, judged in
/// the reference zone.
pub fn day_label(at: OffsetDateTime, now: OffsetDateTime, reference: UtcOffset) -> String {
    let day = at.to_offset(reference).date();
    let today = now.to_offset(reference).date();
    if day == today {
        "Today".to_string()
    } else if today.next_day() == Some(day) {
        "Tomorrow".to_string()
    } else {
        day.format(format_description!(
            "[weekday repr:short] [month repr:short] [day padding:none]"
        ))
        .unwrap_or_else(|_| day.to_string())
    }
}

/// Wall-clock `HH:MM` in the reference zone.
pub fn clock_label(at: OffsetDateTime, reference: UtcOffset) -> String {
    at.to_offset(reference)
        .format(format_description!("[hour]:[minute]"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use time::macros::{datetime, offset};

    use super::*;

    fn entry(service: &str, at: &str) -> ScheduledDeployment {
        ScheduledDeployment {
            service: service.into(),
            version: "1.0".into(),
            environment: "prod".into(),
            scheduled_at: at.into(),
        }
    }

    const WINDOW: Duration = Duration::from_secs(120 * 60);

    #[test]
    fn feed_zone_is_applied() {
        let slots = resolve_slots(&[entry("api", "2026-10-19 09:30")], "-08:00");
        assert_eq!(slots[0].starts_at, Some(datetime!(2026-10-19 17:30 UTC)));
    }

    #[test]
    fn window_is_half_open() {
        let slots = resolve_slots(&[entry("api", "2026-10-19 10:00")], "+00:00");
        assert_eq!(current_deployment(&slots, datetime!(2026-10-19 9:59 UTC), WINDOW), None);
        assert_eq!(current_deployment(&slots, datetime!(2026-10-19 10:00 UTC), WINDOW), Some(0));
        assert_eq!(current_deployment(&slots, datetime!(2026-10-19 11:59 UTC), WINDOW), Some(0));
        assert_eq!(current_deployment(&slots, datetime!(2026-10-19 12:00 UTC), WINDOW), None);
    }

    #[test]
    fn earliest_overlapping_start_wins() {
        let slots = resolve_slots(
            &[
                entry("later", "2026-10-19 10:30"),
                entry("earlier", "2026-10-19 10:00"),
                entry("same", "2026-10-19 10:00"),
            ],
            "Z",
        );
        assert_eq!(
            current_deployment(&slots, datetime!(2026-10-19 11:00 UTC), WINDOW),
            Some(1)
        );
    }

    #[test]
    fn unparseable_entries_are_skipped() {
        let slots = resolve_slots(&[entry("bad", "tomorrow-ish"), entry("ok", "2026-10-19 10:00")], "Z");
        assert!(slots[0].starts_at.is_none());
        assert_eq!(
            current_deployment(&slots, datetime!(2026-10-19 10:05 UTC), WINDOW),
            Some(1)
        );
    }

    #[test]
    fn invalid_feed_zone_falls_back_to_utc() {
        let slots = resolve_slots(&[entry("api", "2026-10-19 10:00")], "Pacific");
        assert_eq!(slots[0].starts_at, Some(datetime!(2026-10-19 10:00 UTC)));
    }

    #[test]
    fn day_labels_use_reference_zone() {
        let now = datetime!(2026-10-19 20:00 UTC);
        let pst = offset!(-8);
        assert_eq!(day_label(datetime!(2026-10-19 21:00 UTC), now, pst), "Today");
        // 01:00 on the 20th in PST
        assert_eq!(day_label(datetime!(2026-10-20 09:00 UTC), now, pst), "Tomorrow");
        // 07:00 UTC on the 20th is 23:00 on the 19th in PST
        assert_eq!(day_label(datetime!(2026-10-20 07:00 UTC), now, pst), "Today");
        assert_eq!(day_label(datetime!(2026-10-23 18:00 UTC), now, pst), "Fri Oct 23");
        assert_eq!(day_label(datetime!(2026-10-18 18:00 UTC), now, pst), "Sun Oct 18");
    }

    #[test]
    fn oversized_window_stays_open() {
        let slots = resolve_slots(&[entry("api", "2026-10-19 10:00")], "Z");
        let huge = Duration::from_secs(u64::MAX);
        assert_eq!(current_deployment(&slots, datetime!(2026-10-19 11:00 UTC), huge), Some(0));
        assert_eq!(current_deployment(&slots, datetime!(2026-10-19 9:00 UTC), huge), None);

        let config = opsdeck_core::DeckConfig {
            deploy_window_minutes: 1_000_000_000_000,
            ..Default::default()
        };
        assert_eq!(
            current_deployment(&slots, datetime!(2026-10-19 11:00 UTC), config.deploy_window()),
            Some(0)
        );
    }

    #[test]
    fn clock_label_converts() {
        assert_eq!(clock_label(datetime!(2026-10-19 17:30 UTC), offset!(-8)), "09:30");
    }
}
