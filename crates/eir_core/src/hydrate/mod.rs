//! Reconstruction of structured alert/dispatch state from rendered log text.
//!
//! Hydration walks the document's log entries once and performs a fill-only
//! merge into the session: a field that is already set is never overwritten,
//! so repeated passes over an unchanged document are no-ops.

use std::sync::OnceLock;

use regex::Regex;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use crate::domain::{DocumentSnapshot, HydrationOutcome, LogEntryNode, Session, ValidationWarning};
use crate::extract::{extract_address, extract_coordinates, extract_lsd};
use crate::normalize::timestamps::normalize_timestamp;

fn triggered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\balert\s+(?:was\s+)?triggered\b").expect("valid regex"))
}

fn received_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\balert\s+(?:was\s+)?received\b").expect("valid regex"))
}

// Tolerant of trailing punctuation and extra words ("alert acknowledged by
// monitoring.", "alert was acknowledged at ...").
fn acknowledged_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\balert\s+(?:was\s+)?acknowledged\b").expect("valid regex"))
}

fn resolved_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\balert\s+(?:was\s+)?resolved\b").expect("valid regex"))
}

fn dispatch_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)\bdispatch\s+(?:was\s+)?requested\b",
            r"(?i)\brequesting\s+(?:emergency\s+)?dispatch\b",
            r"(?i)\bdispatch\s+(?:was\s+)?initiated\b",
            r"(?i)\bemergency\s+services\s+dispatched\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    })
}

/// Whether the text narrates one of the three seeded system lifecycle events
/// (triggered / received / acknowledged). The timeline builder uses this to
/// avoid narrating the same event twice.
pub fn matches_system_event(text: &str) -> bool {
    triggered_re().is_match(text) || received_re().is_match(text) || acknowledged_re().is_match(text)
}

fn is_dispatch_mention(text: &str) -> bool {
    dispatch_res().iter().any(|re| re.is_match(text))
}

/// Derive an entry's instant: machine-readable attribute first, then the
/// label text, then the full narrative.
pub fn entry_timestamp(entry: &LogEntryNode, anchor: OffsetDateTime) -> Option<OffsetDateTime> {
    if let Some(attr) = entry.timestamp_attr.as_deref() {
        if let Ok(ts) = OffsetDateTime::parse(attr, &Rfc3339) {
            return Some(ts);
        }
    }
    if let Some(label) = entry.label.as_deref() {
        if let Some(ts) = normalize_timestamp(label, anchor) {
            return Some(ts);
        }
    }
    normalize_timestamp(&entry.narrative(), anchor)
}

fn fill<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_none() {
        *slot = Some(value);
        true
    } else {
        false
    }
}

/// Re-read all rendered log entries and fill-only-merge what they narrate
/// into the session.
///
/// The outcome's `ok` flag is advisory: true only when every report gate
/// (acknowledgement, dispatch, request time, civic location, coordinates) is
/// satisfied. Hydration itself never fails; anomalies degrade to warnings.
pub fn hydrate(
    doc: &DocumentSnapshot,
    session: &mut Session,
    now: OffsetDateTime,
) -> HydrationOutcome {
    let mut warnings = Vec::new();
    let mut filled = 0usize;

    for (idx, entry) in doc.entries.iter().enumerate() {
        let narrative = entry.narrative();
        if narrative.is_empty() {
            continue;
        }

        if let Some(attr) = entry.timestamp_attr.as_deref() {
            if OffsetDateTime::parse(attr, &Rfc3339).is_err() {
                warnings.push(
                    ValidationWarning::new(
                        "HYDRATE_TS_ATTR_INVALID",
                        "Log entry timestamp attribute is not RFC3339",
                    )
                    .with_details(format!("entry={idx}; attr={attr}")),
                );
            }
        }
        let ts = entry_timestamp(entry, now);

        for (slot, re) in [
            (&mut session.alert.triggered_at, triggered_re()),
            (&mut session.alert.received_at, received_re()),
            (&mut session.alert.acknowledged_at, acknowledged_re()),
            (&mut session.alert.resolved_at, resolved_re()),
        ] {
            if !re.is_match(&narrative) {
                continue;
            }
            match ts {
                Some(ts) => {
                    if fill(slot, ts) {
                        filled += 1;
                    }
                }
                None => warnings.push(
                    ValidationWarning::new(
                        "HYDRATE_EVENT_TS_UNKNOWN",
                        "Lifecycle event narrated without a derivable timestamp",
                    )
                    .with_details(format!("entry={idx}")),
                ),
            }
        }

        if is_dispatch_mention(&narrative) {
            session.dispatch.dispatch_made = true;
            // A dispatch line with no derivable time still marks a real
            // request; the current instant is the best available stamp.
            if fill(&mut session.dispatch.requested_at, ts.unwrap_or(now)) {
                filled += 1;
            }
            let location = &mut session.dispatch.location;
            if let Some(address) = extract_address(&narrative) {
                fill(&mut location.address, address);
            }
            if let Some(lsd) = extract_lsd(&narrative) {
                fill(&mut location.lsd, lsd);
            }
            if let Some((lat, lng)) = extract_coordinates(&narrative) {
                fill(&mut location.lat, lat);
                fill(&mut location.lng, lng);
            }
        }
    }

    let mut missing = Vec::new();
    if session.alert.acknowledged_at.is_none() {
        missing.push("acknowledgement time");
    }
    if !session.dispatch.dispatch_made {
        missing.push("dispatch");
    }
    if session.dispatch.requested_at.is_none() {
        missing.push("dispatch request time");
    }
    let location = &session.dispatch.location;
    if location.address.is_none() && location.lsd.is_none() {
        missing.push("address or LSD");
    }
    if location.lat.is_none() || location.lng.is_none() {
        missing.push("coordinates");
    }

    let ok = missing.is_empty();
    debug!(
        entries = doc.entries.len(),
        filled,
        ok,
        "hydration pass complete"
    );

    HydrationOutcome {
        ok,
        reason: if ok {
            None
        } else {
            Some(format!("missing {}", missing.join(", ")))
        },
        warnings,
    }
}

/// Optional collaborator notified after each hydration pass. The default
/// implementation does nothing.
pub trait HydrationObserver {
    fn on_hydrated(&self, _outcome: &HydrationOutcome) {}
}

/// No-op observer used when the host injects nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl HydrationObserver for NoopObserver {}
