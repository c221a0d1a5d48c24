use eir_core::domain::{LocationSnapshot, Session};
use eir_core::validate::{validate, MissingField, ValidationOutcome};
use pretty_assertions::assert_eq;
use time::macros::datetime;

fn dispatched_session() -> Session {
    let mut session = Session::new();
    session.record_dispatch(
        datetime!(2025-07-15 16:08 UTC),
        LocationSnapshot {
            lat: Some(51.0447),
            lng: Some(-114.0719),
            address: Some("125 9 Ave SE, Calgary, AB".to_string()),
            ..Default::default()
        },
    );
    session.alert.acknowledged_at = Some(datetime!(2025-07-15 16:04 UTC));
    session
}

#[test]
fn no_dispatch_is_a_soft_stop() {
    let session = Session::new();
    assert_eq!(validate(&session), ValidationOutcome::SoftStop);
}

#[test]
fn complete_session_passes() {
    assert_eq!(validate(&dispatched_session()), ValidationOutcome::Ok);
}

#[test]
fn coordinates_alone_satisfy_the_location_gate() {
    let mut session = dispatched_session();
    session.dispatch.location.address = None;
    session.dispatch.location.lsd = None;
    assert_eq!(validate(&session), ValidationOutcome::Ok);
}

#[test]
fn civic_identifier_alone_satisfies_the_location_gate() {
    let mut session = dispatched_session();
    session.dispatch.location.lat = None;
    session.dispatch.location.lng = None;
    assert_eq!(validate(&session), ValidationOutcome::Ok);

    session.dispatch.location.address = None;
    session.dispatch.location.lsd = Some("04-20-052-25 W4".to_string());
    assert_eq!(validate(&session), ValidationOutcome::Ok);
}

#[test]
fn failure_enumerates_every_missing_field() {
    let mut session = dispatched_session();
    session.alert.acknowledged_at = None;
    session.dispatch.location = LocationSnapshot::default();

    assert_eq!(
        validate(&session),
        ValidationOutcome::Failure(vec![
            MissingField::Location,
            MissingField::AcknowledgementTime,
        ])
    );
}

#[test]
fn missing_request_time_is_a_failure_not_a_soft_stop() {
    let mut session = dispatched_session();
    session.dispatch.requested_at = None;

    assert_eq!(
        validate(&session),
        ValidationOutcome::Failure(vec![MissingField::DispatchRequestTime])
    );
}
