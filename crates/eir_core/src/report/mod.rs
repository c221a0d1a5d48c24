//! Incident report assembly: hydrate, gate, extract display fields, build the
//! timeline, render the document, derive a filesystem-safe filename.

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::debug;

use crate::domain::{DocumentSnapshot, Session};
use crate::error::AppError;
use crate::hydrate::{hydrate, HydrationObserver, NoopObserver};
use crate::timeline::{build_timeline, EventCategory, TimelineEvent};
use crate::validate::{validate, ValidationOutcome};

/// Alert-type classification keywords, first match wins on the lowercased
/// title.
const ALERT_TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("gas", "Gas Detected"),
    ("fall", "Fall Detected"),
    ("no motion", "No Motion"),
    ("sos", "SOS"),
    ("emergency latch", "SOS"),
    ("missed check-in", "Missed Check-In"),
    ("missed check in", "Missed Check-In"),
];

const FALLBACK_ALERT_TYPE: &str = "Unknown Alert Type";
const FALLBACK_USER: &str = "Unknown User";
const FALLBACK_ORG: &str = "Unknown Organization";
const FALLBACK_DEVICE: &str = "Unknown Device";
const FALLBACK_DEVICE_ID: &str = "Unknown ID";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertInfoBlock {
    pub alert_type: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub triggered_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub received_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub acknowledged_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
    pub resolution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationBlock {
    pub employee: String,
    pub organization: String,
    pub device_name: String,
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchBlock {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub requested_at: Option<OffsetDateTime>,
    pub address: Option<String>,
    pub lsd: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub connectivity_at_dispatch: Option<String>,
    pub location_age_sec_at_dispatch: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryBlock {
    pub ack_to_dispatch: String,
    pub challenges: String,
    pub timeline: Vec<TimelineEvent>,
}

/// Renderer-ready report structure, rebuilt from current state on every
/// generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportData {
    pub alert: AlertInfoBlock,
    pub organization: OrganizationBlock,
    pub dispatch: DispatchBlock,
    pub summary: SummaryBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderedReport {
    pub filename: String,
    pub body: String,
    pub data: ReportData,
}

/// Classify the alert header title into a display alert type.
pub fn classify_alert_type(title: &str) -> String {
    let lowered = title.to_lowercase();
    for (keyword, label) in ALERT_TYPE_KEYWORDS {
        if lowered.contains(keyword) {
            return (*label).to_string();
        }
    }
    FALLBACK_ALERT_TYPE.to_string()
}

fn clean_or(text: &str, fallback: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Split the "employee — organization" header line. Accepts em dash, en
/// dash, or a spaced hyphen separator.
pub fn split_employee_org(line: &str) -> (String, String) {
    for sep in [" \u{2014} ", " \u{2013} ", " - "] {
        if let Some((employee, organization)) = line.split_once(sep) {
            return (
                clean_or(employee, FALLBACK_USER),
                clean_or(organization, FALLBACK_ORG),
            );
        }
    }
    (clean_or(line, FALLBACK_USER), FALLBACK_ORG.to_string())
}

/// Split the "device name-device id" header line at its last hyphen.
pub fn split_device(line: &str) -> (String, String) {
    match line.rsplit_once('-') {
        Some((name, id)) => (
            clean_or(name, FALLBACK_DEVICE),
            clean_or(id, FALLBACK_DEVICE_ID),
        ),
        None => (
            clean_or(line, FALLBACK_DEVICE),
            FALLBACK_DEVICE_ID.to_string(),
        ),
    }
}

/// Map a resolution-reason control code to its display label.
pub fn resolution_label(code: Option<&str>) -> String {
    let label = match code.unwrap_or("") {
        "incident_resolved" => "Incident Resolved",
        "false_alert" => "False Alert",
        "test_alert" => "Test Alert",
        "no_response" => "No Response",
        "pre_alert_resolved" => "Pre-Alert Resolved",
        _ => "Unspecified",
    };
    label.to_string()
}

/// Human label for the acknowledgement-to-dispatch gap.
///
/// Missing either instant, or dispatch preceding acknowledgement, reads as
/// "Not applicable"; a gap under sixty seconds reads as "Less than one
/// minute"; anything longer rounds to the nearest whole minute.
pub fn format_ack_to_dispatch(
    acknowledged_at: Option<OffsetDateTime>,
    requested_at: Option<OffsetDateTime>,
) -> String {
    let (Some(ack), Some(requested)) = (acknowledged_at, requested_at) else {
        return "Not applicable".to_string();
    };
    let seconds = (requested - ack).whole_seconds();
    if seconds < 0 {
        return "Not applicable".to_string();
    }
    if seconds < 60 {
        return "Less than one minute".to_string();
    }
    let minutes = (seconds + 30) / 60;
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{minutes} minutes")
    }
}

/// Replace every character illegal in a filename with an underscore.
pub fn sanitize_filename(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn render_err(e: impl std::fmt::Display) -> AppError {
    AppError::new("REPORT_RENDER_FAILED", "Failed to render incident report")
        .with_details(e.to_string())
}

fn format_instant(at: Option<OffsetDateTime>) -> Result<String, AppError> {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    match at {
        Some(at) => at.format(&fmt).map_err(render_err),
        None => Ok("UNKNOWN".to_string()),
    }
}

fn opt_str(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("UNKNOWN")
}

fn opt_num<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "UNKNOWN".to_string(), ToString::to_string)
}

fn render_document(data: &ReportData) -> Result<String, AppError> {
    let mut out = String::new();
    out.push_str("EMERGENCY ALERT INCIDENT REPORT\n");
    out.push_str("===============================\n\n");

    out.push_str("ALERT INFORMATION\n");
    out.push_str(&format!("  Alert type: {}\n", data.alert.alert_type));
    out.push_str(&format!(
        "  Triggered: {}\n",
        format_instant(data.alert.triggered_at)?
    ));
    out.push_str(&format!(
        "  Received: {}\n",
        format_instant(data.alert.received_at)?
    ));
    out.push_str(&format!(
        "  Acknowledged: {}\n",
        format_instant(data.alert.acknowledged_at)?
    ));
    out.push_str(&format!(
        "  Resolved: {}\n",
        format_instant(data.alert.resolved_at)?
    ));
    out.push_str(&format!("  Resolution: {}\n\n", data.alert.resolution));

    out.push_str("ORGANIZATION DETAILS\n");
    out.push_str(&format!("  Employee: {}\n", data.organization.employee));
    out.push_str(&format!(
        "  Organization: {}\n",
        data.organization.organization
    ));
    out.push_str(&format!("  Device: {}\n", data.organization.device_name));
    out.push_str(&format!("  Device ID: {}\n\n", data.organization.device_id));

    out.push_str("DISPATCH DETAILS\n");
    out.push_str(&format!(
        "  Requested at: {}\n",
        format_instant(data.dispatch.requested_at)?
    ));
    out.push_str(&format!("  Address: {}\n", opt_str(&data.dispatch.address)));
    out.push_str(&format!("  LSD: {}\n", opt_str(&data.dispatch.lsd)));
    out.push_str(&format!("  Latitude: {}\n", opt_num(&data.dispatch.lat)));
    out.push_str(&format!("  Longitude: {}\n", opt_num(&data.dispatch.lng)));
    out.push_str(&format!(
        "  Connectivity at dispatch: {}\n",
        opt_str(&data.dispatch.connectivity_at_dispatch)
    ));
    out.push_str(&format!(
        "  Location age at dispatch (s): {}\n\n",
        opt_num(&data.dispatch.location_age_sec_at_dispatch)
    ));

    out.push_str("ALERT SUMMARY\n");
    out.push_str(&format!(
        "  Time from acknowledgement to dispatch: {}\n",
        data.summary.ack_to_dispatch
    ));
    out.push_str(&format!(
        "  Challenges / notes: {}\n\n",
        data.summary.challenges
    ));

    out.push_str("  | Time | Source | Note |\n");
    out.push_str("  |---|---|---|\n");
    for event in &data.summary.timeline {
        let source = match event.category {
            EventCategory::System => "system",
            EventCategory::Protocol => "protocol",
        };
        out.push_str(&format!(
            "  | {} | {} | {} |\n",
            format_instant(Some(event.at))?,
            source,
            event.note
        ));
    }

    Ok(out)
}

fn derive_filename(data: &ReportData, now: OffsetDateTime) -> Result<String, AppError> {
    let date_fmt = format_description!("[year]-[month]-[day]");
    let date = now.date().format(&date_fmt).map_err(render_err)?;
    let stem = format!(
        "Incident Report {date} - {} - {} - Device ID {} - {} - {}",
        data.organization.employee,
        data.organization.organization,
        data.organization.device_id,
        data.alert.alert_type,
        data.alert.resolution
    );
    Ok(format!("{}.doc", sanitize_filename(&stem)))
}

/// Drives the full generation pipeline against one document snapshot and one
/// session.
pub struct ReportAssembler<'a> {
    doc: &'a DocumentSnapshot,
    session: &'a mut Session,
    now: OffsetDateTime,
    observer: &'a dyn HydrationObserver,
}

static NOOP_OBSERVER: NoopObserver = NoopObserver;

impl<'a> ReportAssembler<'a> {
    pub fn new(doc: &'a DocumentSnapshot, session: &'a mut Session, now: OffsetDateTime) -> Self {
        Self {
            doc,
            session,
            now,
            observer: &NOOP_OBSERVER,
        }
    }

    /// Inject the optional hydration collaborator.
    pub fn with_observer(mut self, observer: &'a dyn HydrationObserver) -> Self {
        self.observer = observer;
        self
    }

    fn build_data(&self) -> ReportData {
        let (employee, organization) = split_employee_org(&self.doc.employee_org_line);
        let (device_name, device_id) = split_device(&self.doc.device_line);
        let resolution_code = self
            .session
            .alert
            .resolution_reason
            .as_deref()
            .or(self.doc.resolution_code.as_deref());

        let alert = AlertInfoBlock {
            alert_type: classify_alert_type(&self.doc.alert_title),
            triggered_at: self.session.alert.triggered_at,
            received_at: self.session.alert.received_at,
            acknowledged_at: self.session.alert.acknowledged_at,
            resolved_at: self.session.alert.resolved_at,
            resolution: resolution_label(resolution_code),
        };

        let location = &self.session.dispatch.location;
        let dispatch = DispatchBlock {
            requested_at: self.session.dispatch.requested_at,
            address: location.address.clone(),
            lsd: location.lsd.clone(),
            lat: location.lat,
            lng: location.lng,
            connectivity_at_dispatch: location.connectivity_at_dispatch.clone(),
            location_age_sec_at_dispatch: location.location_age_sec_at_dispatch,
        };

        let summary = SummaryBlock {
            ack_to_dispatch: format_ack_to_dispatch(
                self.session.alert.acknowledged_at,
                self.session.dispatch.requested_at,
            ),
            challenges: "None noted.".to_string(),
            timeline: build_timeline(&self.session.alert, &self.doc.entries, self.now),
        };

        ReportData {
            alert,
            organization: OrganizationBlock {
                employee,
                organization,
                device_name,
                device_id,
            },
            dispatch,
            summary,
        }
    }

    /// Run the pipeline: hydrate, gate, assemble, render.
    ///
    /// Returns `Ok(None)` for the soft-stop case (dispatch was never made);
    /// a validation failure surfaces every missing mandatory field in one
    /// error.
    pub fn generate(&mut self) -> Result<Option<RenderedReport>, AppError> {
        let outcome = hydrate(self.doc, self.session, self.now);
        self.observer.on_hydrated(&outcome);

        match validate(self.session) {
            ValidationOutcome::SoftStop => {
                debug!("no dispatch made; skipping report generation");
                return Ok(None);
            }
            ValidationOutcome::Failure(missing) => {
                let names = missing
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(AppError::new(
                    "REPORT_VALIDATION_FAILED",
                    format!("Cannot generate incident report; missing: {names}"),
                ));
            }
            ValidationOutcome::Ok => {}
        }

        let data = self.build_data();
        let body = render_document(&data)?;
        let filename = derive_filename(&data, self.now)?;
        debug!(%filename, "incident report generated");

        Ok(Some(RenderedReport {
            filename,
            body,
            data,
        }))
    }
}
