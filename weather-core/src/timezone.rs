//! Geographic timezone inference with a fixed UTC fallback.

use std::{
    fmt::Debug,
    sync::{Arc, OnceLock},
};

use chrono_tz::Tz;
use tzf_rs::DefaultFinder;

use crate::model::{Coordinate, ResolvedLocation};

/// Identifier reported whenever inference fails.
pub const FALLBACK_TIMEZONE: &str = "UTC";

/// External point-in-polygon timezone lookup.
pub trait TimezoneLookup: Send + Sync + Debug {
    /// IANA identifier covering the point, or `None`/empty when unknown.
    fn timezone_at(&self, lat: f64, lon: f64) -> Option<String>;
}

/// Offline lookup backed by the tzf boundary dataset.
///
/// The dataset is loaded on the first lookup, so commands that never
/// localize a forecast do not pay for it.
#[derive(Default)]
pub struct TzfLookup {
    finder: OnceLock<DefaultFinder>,
}

impl TzfLookup {
    pub fn new() -> Self {
        Self { finder: OnceLock::new() }
    }

    fn finder(&self) -> &DefaultFinder {
        self.finder.get_or_init(|| {
            tracing::debug!("loading timezone boundary dataset");
            DefaultFinder::new()
        })
    }
}

impl Debug for TzfLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TzfLookup").field("loaded", &self.finder.get().is_some()).finish()
    }
}

impl TimezoneLookup for TzfLookup {
    fn timezone_at(&self, lat: f64, lon: f64) -> Option<String> {
        let name = self.finder().get_tz_name(lon, lat);
        (!name.is_empty()).then(|| name.to_string())
    }
}

/// Why the resolver reported UTC instead of an inferred zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The lookup produced nothing for the coordinate.
    NotFound,
    /// The lookup produced an identifier the timezone database does not know.
    UnknownIdentifier(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTimezone {
    pub id: String,
    pub tz: Tz,
    pub fallback: Option<FallbackReason>,
}

impl ResolvedTimezone {
    fn utc(reason: FallbackReason) -> Self {
        Self { id: FALLBACK_TIMEZONE.to_string(), tz: Tz::UTC, fallback: Some(reason) }
    }
}

#[derive(Debug, Clone)]
pub struct TimeZoneResolver {
    lookup: Arc<dyn TimezoneLookup>,
}

impl TimeZoneResolver {
    pub fn new(lookup: Arc<dyn TimezoneLookup>) -> Self {
        Self { lookup }
    }

    /// Applies, in order: lookup → UTC if empty; database check → UTC if unknown.
    pub fn resolve(&self, coordinate: Coordinate) -> ResolvedTimezone {
        let (lat, lon) = (coordinate.lat(), coordinate.lon());
        tracing::debug!(lat, lon, "determining time zone");

        let id = match self.lookup.timezone_at(lat, lon) {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                tracing::warn!(lat, lon, "time zone not found, falling back to UTC");
                return ResolvedTimezone::utc(FallbackReason::NotFound);
            }
        };

        match id.parse::<Tz>() {
            Ok(tz) => ResolvedTimezone { id, tz, fallback: None },
            Err(_) => {
                tracing::warn!(timezone = %id, "unknown time zone, falling back to UTC");
                ResolvedTimezone::utc(FallbackReason::UnknownIdentifier(id))
            }
        }
    }

    pub fn resolve_location(&self, coordinate: Coordinate) -> ResolvedLocation {
        let ResolvedTimezone { id, tz, .. } = self.resolve(coordinate);
        ResolvedLocation { coordinate, timezone_id: id, tz }
    }
}
