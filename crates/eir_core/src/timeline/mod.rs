//! Merged display timeline: known system lifecycle events plus parsed
//! protocol-log events, chronologically ordered and de-duplicated.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::{AlertRecord, LogEntryNode};
use crate::hydrate::{entry_timestamp, matches_system_event};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    System,
    Protocol,
}

/// One display row of the report timeline. Built fresh per generation and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub note: String,
    pub category: EventCategory,
}

impl TimelineEvent {
    fn system(at: OffsetDateTime, note: &str) -> Self {
        Self {
            at,
            note: note.to_string(),
            category: EventCategory::System,
        }
    }
}

/// Build the report timeline.
///
/// System events seed the sequence in lifecycle order (triggered, received,
/// acknowledged); each rendered log entry with a derivable timestamp adds one
/// protocol event unless it narrates a system event already seeded; a
/// resolved event closes the sequence when known. The final ordering is by
/// instant ascending with insertion order breaking ties (stable sort), and
/// entries with no derivable timestamp are omitted.
pub fn build_timeline(
    alert: &AlertRecord,
    entries: &[LogEntryNode],
    anchor: OffsetDateTime,
) -> Vec<TimelineEvent> {
    let mut events = Vec::new();

    if let Some(at) = alert.triggered_at {
        events.push(TimelineEvent::system(at, "Alert triggered"));
    }
    if let Some(at) = alert.received_at {
        events.push(TimelineEvent::system(at, "Alert received"));
    }
    if let Some(at) = alert.acknowledged_at {
        events.push(TimelineEvent::system(at, "Alert acknowledged"));
    }

    for entry in entries {
        let narrative = entry.narrative();
        if narrative.is_empty() || matches_system_event(&narrative) {
            continue;
        }
        let Some(at) = entry_timestamp(entry, anchor) else {
            continue;
        };
        let note = entry
            .content
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        events.push(TimelineEvent {
            at,
            note: if note.is_empty() { narrative } else { note },
            category: EventCategory::Protocol,
        });
    }

    if let Some(at) = alert.resolved_at {
        events.push(TimelineEvent::system(at, "Alert resolved"));
    }

    events.sort_by_key(|e| e.at);
    events
}
