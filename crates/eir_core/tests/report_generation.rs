use std::cell::Cell;

use eir_core::domain::{DocumentSnapshot, HydrationOutcome, LocationSnapshot, Session};
use eir_core::hydrate::HydrationObserver;
use eir_core::report::{
    classify_alert_type, format_ack_to_dispatch, resolution_label, sanitize_filename,
    split_device, split_employee_org, ReportAssembler,
};
use pretty_assertions::assert_eq;
use time::macros::datetime;
use time::OffsetDateTime;

fn now() -> OffsetDateTime {
    datetime!(2025-07-15 17:00 UTC)
}

fn fixture_doc() -> DocumentSnapshot {
    let raw = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fixtures/demo/alert_session.json"
    ));
    DocumentSnapshot::from_json(raw).expect("fixture parses")
}

#[test]
fn generation_from_fixture_produces_a_full_report() {
    let doc = fixture_doc();
    let mut session = Session::new();
    let report = ReportAssembler::new(&doc, &mut session, now())
        .generate()
        .expect("generate")
        .expect("report present");

    assert_eq!(
        report.filename,
        "Incident Report 2025-07-15 - Jordan Avery - Northfield Energy Ltd. - \
         Device ID 3542210 - Gas Detected - Incident Resolved.doc"
    );

    assert_eq!(report.data.alert.alert_type, "Gas Detected");
    assert_eq!(report.data.organization.device_name, "G7c");
    assert_eq!(report.data.summary.ack_to_dispatch, "4 minutes");
    assert_eq!(
        report.data.dispatch.address.as_deref(),
        Some("125 9 Ave SE, Calgary, AB")
    );
    assert_eq!(report.data.dispatch.lat, Some(51.0447));

    // Three seeded system events, dispatch + EMS protocol events, the
    // resolved log line, and the closing system resolution.
    assert_eq!(report.data.summary.timeline.len(), 7);
    assert_eq!(report.data.summary.timeline[0].note, "Alert triggered");
    assert_eq!(report.data.summary.timeline[6].note, "Alert resolved");

    assert!(report.body.contains("ALERT INFORMATION"));
    assert!(report.body.contains("DISPATCH DETAILS"));
    assert!(report.body.contains("Time from acknowledgement to dispatch: 4 minutes"));
    assert!(report.body.contains("2025-07-15 16:02:11 UTC"));
}

#[test]
fn generation_is_reentrant() {
    let doc = fixture_doc();
    let mut session = Session::new();

    let first = ReportAssembler::new(&doc, &mut session, now())
        .generate()
        .expect("generate")
        .expect("report present");
    let second = ReportAssembler::new(&doc, &mut session, now())
        .generate()
        .expect("generate")
        .expect("report present");

    assert_eq!(first, second);
}

#[test]
fn no_dispatch_soft_stops_silently() {
    let doc = DocumentSnapshot::default();
    let mut session = Session::new();
    let result = ReportAssembler::new(&doc, &mut session, now()).generate();
    assert_eq!(result, Ok(None));
}

#[test]
fn dispatch_without_gates_fails_with_every_missing_field() {
    let doc = DocumentSnapshot::default();
    let mut session = Session::new();
    session.dispatch.dispatch_made = true;

    let err = ReportAssembler::new(&doc, &mut session, now())
        .generate()
        .expect_err("must fail");

    assert_eq!(err.code, "REPORT_VALIDATION_FAILED");
    assert!(err.message.contains("dispatch request time"), "{err}");
    assert!(err.message.contains("location"), "{err}");
    assert!(err.message.contains("acknowledgement time"), "{err}");
}

struct RecordingObserver {
    notified: Cell<bool>,
    last_ok: Cell<bool>,
}

impl HydrationObserver for RecordingObserver {
    fn on_hydrated(&self, outcome: &HydrationOutcome) {
        self.notified.set(true);
        self.last_ok.set(outcome.ok);
    }
}

#[test]
fn injected_observer_sees_the_hydration_outcome() {
    let doc = fixture_doc();
    let mut session = Session::new();
    let observer = RecordingObserver {
        notified: Cell::new(false),
        last_ok: Cell::new(false),
    };

    ReportAssembler::new(&doc, &mut session, now())
        .with_observer(&observer)
        .generate()
        .expect("generate");

    assert!(observer.notified.get());
    assert!(observer.last_ok.get());
}

#[test]
fn latency_label_rules() {
    let ack = Some(datetime!(2025-07-15 10:00:00 UTC));
    assert_eq!(
        format_ack_to_dispatch(ack, Some(datetime!(2025-07-15 10:00:45 UTC))),
        "Less than one minute"
    );
    assert_eq!(
        format_ack_to_dispatch(ack, Some(datetime!(2025-07-15 10:03:30 UTC))),
        "4 minutes"
    );
    assert_eq!(
        format_ack_to_dispatch(ack, Some(datetime!(2025-07-15 10:01:10 UTC))),
        "1 minute"
    );
    // Dispatch before acknowledgement, or either side missing.
    assert_eq!(
        format_ack_to_dispatch(ack, Some(datetime!(2025-07-15 09:59:00 UTC))),
        "Not applicable"
    );
    assert_eq!(format_ack_to_dispatch(ack, None), "Not applicable");
    assert_eq!(format_ack_to_dispatch(None, None), "Not applicable");
}

#[test]
fn filename_strips_every_illegal_character() {
    assert_eq!(
        sanitize_filename(r#"a\b/c:d*e?f"g<h>i|j"#),
        "a_b_c_d_e_f_g_h_i_j"
    );

    let doc = DocumentSnapshot {
        alert_title: "SOS".to_string(),
        employee_org_line: "R/J Smith — Ac:me \"West\" Ops".to_string(),
        device_line: "G7x-99".to_string(),
        resolution_code: Some("false_alert".to_string()),
        entries: Vec::new(),
    };
    let mut session = Session::new();
    session.alert.acknowledged_at = Some(datetime!(2025-07-15 16:04 UTC));
    session.record_dispatch(
        datetime!(2025-07-15 16:08 UTC),
        LocationSnapshot {
            lat: Some(51.0),
            lng: Some(-114.0),
            ..Default::default()
        },
    );

    let report = ReportAssembler::new(&doc, &mut session, now())
        .generate()
        .expect("generate")
        .expect("report present");

    assert!(report.filename.ends_with(".doc"));
    let stem = report.filename.trim_end_matches(".doc");
    assert!(
        !stem.contains(['\\', '/', ':', '*', '?', '"', '<', '>', '|']),
        "{stem}"
    );
    assert!(report.filename.contains("R_J Smith"));
    assert!(report.filename.contains("Ac_me"));
}

#[test]
fn display_field_extraction_rules() {
    assert_eq!(classify_alert_type("Gas alert - H2S high"), "Gas Detected");
    assert_eq!(classify_alert_type("Fall detected on device"), "Fall Detected");
    assert_eq!(classify_alert_type("No motion event"), "No Motion");
    assert_eq!(classify_alert_type("Emergency latch pulled"), "SOS");
    assert_eq!(classify_alert_type("something odd"), "Unknown Alert Type");

    assert_eq!(
        split_employee_org("Jordan Avery — Northfield Energy Ltd."),
        (
            "Jordan Avery".to_string(),
            "Northfield Energy Ltd.".to_string()
        )
    );
    assert_eq!(
        split_employee_org("Solo Name"),
        ("Solo Name".to_string(), "Unknown Organization".to_string())
    );
    assert_eq!(
        split_employee_org(""),
        (
            "Unknown User".to_string(),
            "Unknown Organization".to_string()
        )
    );

    assert_eq!(
        split_device("G7c-3542210"),
        ("G7c".to_string(), "3542210".to_string())
    );
    assert_eq!(
        split_device("Loner"),
        ("Loner".to_string(), "Unknown ID".to_string())
    );

    assert_eq!(resolution_label(Some("false_alert")), "False Alert");
    assert_eq!(resolution_label(Some("mystery")), "Unspecified");
    assert_eq!(resolution_label(None), "Unspecified");
}
