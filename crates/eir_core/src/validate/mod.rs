//! Mandatory-field gate evaluated before report generation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Session;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    DispatchRequestTime,
    Location,
    AcknowledgementTime,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingField::DispatchRequestTime => "dispatch request time",
            MissingField::Location => "location (coordinates, address, or LSD)",
            MissingField::AcknowledgementTime => "alert acknowledgement time",
        };
        f.write_str(name)
    }
}

/// Gate result. `SoftStop` (no dispatch was ever made) is expected and
/// non-exceptional; `Failure` carries every missing mandatory field so the
/// user sees them all at once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValidationOutcome {
    Ok,
    SoftStop,
    Failure(Vec<MissingField>),
}

/// Evaluate every gate (no short-circuiting) against the hydrated session.
pub fn validate(session: &Session) -> ValidationOutcome {
    if !session.dispatch.dispatch_made {
        return ValidationOutcome::SoftStop;
    }

    let mut missing = Vec::new();

    if session.dispatch.requested_at.is_none() {
        missing.push(MissingField::DispatchRequestTime);
    }

    let location = &session.dispatch.location;
    let has_coordinates = location.lat.is_some() && location.lng.is_some();
    let has_civic = location.address.is_some() || location.lsd.is_some();
    if !has_coordinates && !has_civic {
        missing.push(MissingField::Location);
    }

    if session.alert.acknowledged_at.is_none() {
        missing.push(MissingField::AcknowledgementTime);
    }

    if missing.is_empty() {
        ValidationOutcome::Ok
    } else {
        ValidationOutcome::Failure(missing)
    }
}
