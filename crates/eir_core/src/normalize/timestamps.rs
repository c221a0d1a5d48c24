use std::sync::OnceLock;

use regex::Regex;
use time::macros::{offset, time};
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset, Weekday};

/// Fixed zone-abbreviation table. Protocol logs only ever carry the
/// standard/daylight variants of the four North American zones plus UTC, so
/// the table stays explicit rather than pulling in a time-zone database.
fn fixed_zone_offset_hours(abbrev: &str) -> Option<i8> {
    let hours = match abbrev {
        "PST" => -8,
        "PDT" => -7,
        "MST" => -7,
        "MDT" => -6,
        "CST" => -6,
        "CDT" => -5,
        "EST" => -5,
        "EDT" => -4,
        "UTC" => 0,
        _ => return None,
    };
    Some(hours)
}

fn nth_weekday_of_month(year: i32, month: Month, weekday: Weekday, n: u8) -> Option<Date> {
    let first = Date::from_calendar_date(year, month, 1).ok()?;
    let to_first = (i64::from(weekday.number_days_from_sunday()) + 7
        - i64::from(first.weekday().number_days_from_sunday()))
        % 7;
    first.checked_add(Duration::days(to_first + 7 * (i64::from(n) - 1)))
}

/// Whether North American daylight saving is in effect at `anchor`, evaluated
/// in Mountain Standard Time coordinates: daylight runs from 02:00 MST on the
/// second Sunday of March to 01:00 MST on the first Sunday of November.
fn mountain_daylight_in_effect(anchor: OffsetDateTime) -> bool {
    let local = anchor.to_offset(offset!(-7));
    let year = local.year();
    let (Some(start_day), Some(end_day)) = (
        nth_weekday_of_month(year, Month::March, Weekday::Sunday, 2),
        nth_weekday_of_month(year, Month::November, Weekday::Sunday, 1),
    ) else {
        return false;
    };
    let start = PrimitiveDateTime::new(start_day, time!(2:00));
    let end = PrimitiveDateTime::new(end_day, time!(1:00));
    let at = PrimitiveDateTime::new(local.date(), local.time());
    at >= start && at < end
}

/// Resolve a zone abbreviation to a concrete UTC offset.
///
/// `MT` is the one ambiguous marker (generic Mountain Time with no
/// standard/daylight distinction); it is resolved by checking which variant
/// is in effect at the anchor instant, then mapped through the fixed table.
pub fn resolve_zone_offset(abbrev: &str, anchor: OffsetDateTime) -> Option<UtcOffset> {
    let hours = match abbrev {
        "MT" => {
            if mountain_daylight_in_effect(anchor) {
                fixed_zone_offset_hours("MDT")?
            } else {
                fixed_zone_offset_hours("MST")?
            }
        }
        other => fixed_zone_offset_hours(other)?,
    };
    UtcOffset::from_hms(hours, 0, 0).ok()
}

/// Captured pieces of a textual timestamp before zone resolution. `date` is
/// `None` for the date-less clock shapes, which borrow the anchor's calendar
/// day in the resolved zone.
struct MatchedStamp {
    date: Option<(i32, Month, u8)>,
    hour: u8,
    minute: u8,
    second: u8,
    zone: String,
}

fn full_numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4})-(\d{2})-(\d{2})[ T](\d{2}):(\d{2}):(\d{2})\s+([A-Za-z]{2,4})\b")
            .expect("valid regex")
    })
}

fn prose_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:tember)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\s+(\d{1,2}),\s*(\d{4})\s+at\s+(\d{1,2}):(\d{2})(?::(\d{2}))?\s+([A-Za-z]{2,4})\b",
        )
        .expect("valid regex")
    })
}

fn bracketed_clock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(\d{1,2}):(\d{2})(?::(\d{2}))?\s+([A-Za-z]{2,4})\]").expect("valid regex")
    })
}

fn bare_clock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?\s+([A-Za-z]{2,4})\b").expect("valid regex")
    })
}

fn parse_u8(s: &str) -> Option<u8> {
    s.parse().ok()
}

fn month_from_name(name: &str) -> Option<Month> {
    let key = name.get(..3)?.to_ascii_lowercase();
    let month = match key.as_str() {
        "jan" => Month::January,
        "feb" => Month::February,
        "mar" => Month::March,
        "apr" => Month::April,
        "may" => Month::May,
        "jun" => Month::June,
        "jul" => Month::July,
        "aug" => Month::August,
        "sep" => Month::September,
        "oct" => Month::October,
        "nov" => Month::November,
        "dec" => Month::December,
        _ => return None,
    };
    Some(month)
}

fn match_full_numeric(text: &str) -> Option<MatchedStamp> {
    let caps = full_numeric_re().captures(text)?;
    let year: i32 = caps[1].parse().ok()?;
    let month = Month::try_from(parse_u8(&caps[2])?).ok()?;
    let day = parse_u8(&caps[3])?;
    Some(MatchedStamp {
        date: Some((year, month, day)),
        hour: parse_u8(&caps[4])?,
        minute: parse_u8(&caps[5])?,
        second: parse_u8(&caps[6])?,
        zone: caps[7].to_ascii_uppercase(),
    })
}

fn match_prose(text: &str) -> Option<MatchedStamp> {
    let caps = prose_re().captures(text)?;
    let month = month_from_name(&caps[1])?;
    let day = parse_u8(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    Some(MatchedStamp {
        date: Some((year, month, day)),
        hour: parse_u8(&caps[4])?,
        minute: parse_u8(&caps[5])?,
        second: caps.get(6).map_or(Some(0), |m| parse_u8(m.as_str()))?,
        zone: caps[7].to_ascii_uppercase(),
    })
}

fn match_clock(caps: regex::Captures<'_>) -> Option<MatchedStamp> {
    Some(MatchedStamp {
        date: None,
        hour: parse_u8(&caps[1])?,
        minute: parse_u8(&caps[2])?,
        second: caps.get(3).map_or(Some(0), |m| parse_u8(m.as_str()))?,
        zone: caps[4].to_ascii_uppercase(),
    })
}

fn match_bracketed_clock(text: &str) -> Option<MatchedStamp> {
    match_clock(bracketed_clock_re().captures(text)?)
}

fn match_bare_clock(text: &str) -> Option<MatchedStamp> {
    match_clock(bare_clock_re().captures(text)?)
}

fn instant_from(stamp: MatchedStamp, anchor: OffsetDateTime) -> Option<OffsetDateTime> {
    let offset = resolve_zone_offset(&stamp.zone, anchor)?;
    let date = match stamp.date {
        Some((year, month, day)) => Date::from_calendar_date(year, month, day).ok()?,
        // Date-less shapes borrow the anchor's calendar day as seen in the
        // resolved zone.
        None => anchor.to_offset(offset).date(),
    };
    let clock = Time::from_hms(stamp.hour, stamp.minute, stamp.second).ok()?;
    Some(
        PrimitiveDateTime::new(date, clock)
            .assume_offset(offset)
            .to_offset(UtcOffset::UTC),
    )
}

/// Normalize a heterogeneous textual timestamp into a canonical UTC instant.
///
/// Shapes are tried in fixed priority order; the first textual match wins and
/// there is no fallthrough once a shape matched — a matched shape whose zone
/// abbreviation is unknown or whose date is out of range yields `None`
/// overall. The anchor is used only to supply the calendar day for date-less
/// shapes and to disambiguate the generic `MT` marker.
pub fn normalize_timestamp(text: &str, anchor: OffsetDateTime) -> Option<OffsetDateTime> {
    let matchers: [fn(&str) -> Option<MatchedStamp>; 4] = [
        match_full_numeric,
        match_prose,
        match_bracketed_clock,
        match_bare_clock,
    ];
    for matcher in matchers {
        if let Some(stamp) = matcher(text) {
            return instant_from(stamp, anchor);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn nth_weekday_matches_known_dst_boundaries() {
        // US/Canada 2025: DST starts Mar 9, ends Nov 2.
        assert_eq!(
            nth_weekday_of_month(2025, Month::March, Weekday::Sunday, 2),
            Date::from_calendar_date(2025, Month::March, 9).ok()
        );
        assert_eq!(
            nth_weekday_of_month(2025, Month::November, Weekday::Sunday, 1),
            Date::from_calendar_date(2025, Month::November, 2).ok()
        );
    }

    #[test]
    fn mountain_daylight_flag_flips_at_boundaries() {
        assert!(mountain_daylight_in_effect(datetime!(2025-07-10 12:00 UTC)));
        assert!(!mountain_daylight_in_effect(datetime!(2025-01-10 12:00 UTC)));
        // 01:59 MST on the start day is still standard; 02:00 is daylight.
        assert!(!mountain_daylight_in_effect(datetime!(2025-03-09 08:59 UTC)));
        assert!(mountain_daylight_in_effect(datetime!(2025-03-09 09:00 UTC)));
    }
}
