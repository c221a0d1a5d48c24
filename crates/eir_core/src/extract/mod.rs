//! Structured-field extraction from free-text protocol log lines.
//!
//! Every function here is read-only and side-effect-free: a pattern miss
//! yields `None`, never an error. Within each field the patterns form an
//! ordered chain and the first match wins.

use std::sync::OnceLock;

use regex::Regex;

const NUM: &str = r"(-?\d+(?:\.\d+)?)";

fn coord_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)\blatitude\b[:\s]+{NUM}[,;\s]+\blongitude\b[:\s]+{NUM}"
        ))
        .expect("valid regex")
    })
}

fn coord_terse_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)\blat\s*/\s*l(?:o)?ng\b\s*:?\s*{NUM}\s*,\s*{NUM}"
        ))
        .expect("valid regex")
    })
}

fn coord_bare_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(-?\d{1,3}\.\d+)\s*,\s*(-?\d{1,3}\.\d+)").expect("valid regex")
    })
}

fn address_label_res() -> &'static [Regex; 3] {
    static RES: OnceLock<[Regex; 3]> = OnceLock::new();
    RES.get_or_init(|| {
        [
            Regex::new(r"(?i)\bapproximate\s+address\b\s*:?\s*(.+)").expect("valid regex"),
            Regex::new(r"(?i)\baddress\b\s*:?\s*(.+)").expect("valid regex"),
            Regex::new(r"(?i)\blocation\b\s*:?\s*(.+)").expect("valid regex"),
        ]
    })
}

/// Labels that terminate an address capture when they follow it on the same
/// line.
fn next_field_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[,;]?\s*\b(?:latitude|longitude|lat|lng|long|lsd)\b\s*:?")
            .expect("valid regex")
    })
}

fn lsd_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blsd\b\s*:?\s*([^\n]+)").expect("valid regex"))
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Extract a signed decimal coordinate pair.
///
/// Tries, in order: an explicit "Latitude X, Longitude Y" phrase, a terse
/// "Lat/Long" labeled pair, a bare numeric pair with no label.
pub fn extract_coordinates(text: &str) -> Option<(f64, f64)> {
    for re in [coord_phrase_re(), coord_terse_re(), coord_bare_re()] {
        if let Some(caps) = re.captures(text) {
            let lat: f64 = caps[1].parse().ok()?;
            let lng: f64 = caps[2].parse().ok()?;
            return Some((lat, lng));
        }
    }
    None
}

/// Extract a postal or approximate address.
///
/// Tries, in order, text following an "Approximate Address", "Address", or
/// "Location" label; captures up to the next recognized field label or end of
/// string, whitespace-normalized.
pub fn extract_address(text: &str) -> Option<String> {
    for re in address_label_res() {
        if let Some(caps) = re.captures(text) {
            let rest = caps.get(1).map_or("", |m| m.as_str());
            let rest = match next_field_label_re().find(rest) {
                Some(m) => &rest[..m.start()],
                None => rest,
            };
            let cleaned = normalize_ws(rest.trim_matches([',', ';', ' ']));
            return non_empty(cleaned);
        }
    }
    None
}

/// Extract a legal-subdivision land identifier: text following an "LSD"
/// label to end of line.
pub fn extract_lsd(text: &str) -> Option<String> {
    let caps = lsd_re().captures(text)?;
    non_empty(normalize_ws(caps[1].trim_matches([',', ';', ' '])))
}
