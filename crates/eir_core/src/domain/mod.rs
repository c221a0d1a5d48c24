use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AppError;

/// Lifecycle timestamps and classification for the alert currently loaded
/// into the session.
///
/// Notes:
/// - Every timestamp is a nullable UTC instant; RFC3339 over the wire.
/// - Hydration is fill-only: a set field is never overwritten, regardless of
///   what later log lines claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertRecord {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub triggered_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub received_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub acknowledged_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
    pub alert_type: Option<String>,
    pub resolution_reason: Option<String>,
}

/// Location context captured at the moment dispatch was requested.
///
/// Fields are filled independently and only when absent. Coordinates are
/// signed decimal degrees; `lsd` is a legal-subdivision land identifier used
/// where no street address exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationSnapshot {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub lsd: Option<String>,
    pub connectivity_at_dispatch: Option<String>,
    pub location_age_sec_at_dispatch: Option<i64>,
}

/// Whether emergency dispatch was requested for the current alert, and where.
///
/// `dispatch_made` latches false -> true within a session and never reverses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DispatchRecord {
    pub dispatch_made: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub requested_at: Option<OffsetDateTime>,
    pub location: LocationSnapshot,
}

/// Session-scoped mutable state for one loaded alert.
///
/// Created empty on alert load, reset on alert change. Passed explicitly
/// into hydration and generation; there is no ambient global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub alert: AlertRecord,
    pub dispatch: DispatchRecord,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all state for the current alert.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Explicit dispatch action from the protocol UI, as opposed to a
    /// dispatch mention inferred from the log. Same fill-only rules.
    pub fn record_dispatch(&mut self, at: OffsetDateTime, location: LocationSnapshot) {
        self.dispatch.dispatch_made = true;
        if self.dispatch.requested_at.is_none() {
            self.dispatch.requested_at = Some(at);
        }
        let slot = &mut self.dispatch.location;
        if slot.lat.is_none() {
            slot.lat = location.lat;
        }
        if slot.lng.is_none() {
            slot.lng = location.lng;
        }
        if slot.address.is_none() {
            slot.address = location.address;
        }
        if slot.lsd.is_none() {
            slot.lsd = location.lsd;
        }
        if slot.connectivity_at_dispatch.is_none() {
            slot.connectivity_at_dispatch = location.connectivity_at_dispatch;
        }
        if slot.location_age_sec_at_dispatch.is_none() {
            slot.location_age_sec_at_dispatch = location.location_age_sec_at_dispatch;
        }
    }
}

/// One rendered protocol-log line, re-read from the hosting document on every
/// hydration pass. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntryNode {
    /// Machine-readable RFC3339 timestamp attribute, when the host set one.
    #[serde(default)]
    pub timestamp_attr: Option<String>,
    /// Optional label sub-node text (often a wall-clock prefix).
    #[serde(default)]
    pub label: Option<String>,
    /// Narrative text of the entry.
    pub content: String,
}

impl LogEntryNode {
    /// Label and content joined, whitespace-normalized. This is the text the
    /// phrase matchers run against.
    pub fn narrative(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(label) = self.label.as_deref() {
            parts.push(label);
        }
        parts.push(&self.content);
        parts
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Read-only snapshot of the hosting document at the moment the pipeline is
/// invoked. The host serializes this from its rendered tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSnapshot {
    /// Alert type/title text from the alert header.
    #[serde(default)]
    pub alert_title: String,
    /// "employee — organization" header line.
    #[serde(default)]
    pub employee_org_line: String,
    /// "device name-device id" header line.
    #[serde(default)]
    pub device_line: String,
    /// Selected value of the resolution-reason control, if any.
    #[serde(default)]
    pub resolution_code: Option<String>,
    #[serde(default)]
    pub entries: Vec<LogEntryNode>,
}

impl DocumentSnapshot {
    /// Parse the snapshot JSON the hosting application serializes from its
    /// rendered tree.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw).map_err(|e| {
            AppError::new(
                "SNAPSHOT_PARSE_FAILED",
                "Failed to parse document snapshot",
            )
            .with_details(e.to_string())
        })
    }
}

/// Non-fatal anomaly surfaced to the caller instead of being logged away.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Advisory result of one hydration pass. `ok` mirrors the report gate but
/// never blocks anything by itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HydrationOutcome {
    pub ok: bool,
    pub reason: Option<String>,
    pub warnings: Vec<ValidationWarning>,
}
