use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

use crate::model::{LocalizedReading, RawReading};

/// Naive layouts accepted in addition to RFC 3339; these are read as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses a provider timestamp as a UTC instant.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Rewrites a UTC timestamp into `tz` civil time as RFC 3339 with offset.
///
/// Absent, empty or unparsable input yields `None`.
pub fn localize_timestamp(raw: Option<&str>, tz: Tz) -> Option<String> {
    let raw = raw.filter(|value| !value.trim().is_empty())?;
    let Some(utc) = parse_utc(raw) else {
        tracing::warn!(validdate = raw, "unparsable timestamp, dropping it");
        return None;
    };

    Some(utc.with_timezone(&tz).to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

/// Localizes every reading; a failed row only loses its own timestamp.
pub fn localize_readings(readings: Vec<RawReading>, tz: Tz) -> Vec<LocalizedReading> {
    readings
        .into_iter()
        .map(|reading| {
            if reading.validdate.as_deref().is_none_or(|value| value.trim().is_empty()) {
                tracing::warn!(lat = reading.lat, lon = reading.lon, "reading without validdate");
            }
            let validdate = localize_timestamp(reading.validdate.as_deref(), tz);
            reading.localized(validdate)
        })
        .collect()
}
