use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// A validated point on the globe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Result<Self, WeatherError> {
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let lon_ok = lon.is_finite() && (-180.0..=180.0).contains(&lon);
        if !lat_ok || !lon_ok {
            return Err(WeatherError::InvalidInput);
        }

        Ok(Self { lat, lon })
    }

    /// Constructor for compile-time registry entries that are known to be in range.
    pub(crate) const fn from_static(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamedCity {
    pub name: &'static str,
    pub coordinate: Coordinate,
}

/// Weather quantity requested from the forecast provider, with its unit tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForecastParameter {
    Temperature2m,
    Precipitation1h,
    WindSpeed10m,
    RelativeHumidity2m,
    UvIndex,
}

impl ForecastParameter {
    /// The fixed parameter set queried for every forecast.
    pub const fn all() -> &'static [ForecastParameter] {
        &[
            ForecastParameter::Temperature2m,
            ForecastParameter::Precipitation1h,
            ForecastParameter::WindSpeed10m,
            ForecastParameter::RelativeHumidity2m,
            ForecastParameter::UvIndex,
        ]
    }

    /// Provider identifier, `<name>:<unit>`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastParameter::Temperature2m => "t_2m:C",
            ForecastParameter::Precipitation1h => "precip_1h:mm",
            ForecastParameter::WindSpeed10m => "wind_speed_10m:ms",
            ForecastParameter::RelativeHumidity2m => "relative_humidity_2m:p",
            ForecastParameter::UvIndex => "uv:idx",
        }
    }
}

/// Hourly forecast horizon: `[start, start + 24h)` at a one hour step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: TimeDelta,
}

impl TimeWindow {
    /// Window starting at the top of the hour containing `now`.
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let start = now
            .with_minute(0)
            .and_then(|value| value.with_second(0))
            .and_then(|value| value.with_nanosecond(0))
            .unwrap_or(now);

        Self {
            start,
            end: start + TimeDelta::hours(24),
            step: TimeDelta::hours(1),
        }
    }
}

/// One provider row: a timestamp, the coordinate it belongs to and one value
/// per parameter id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub validdate: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl RawReading {
    pub fn localized(self, validdate: Option<String>) -> LocalizedReading {
        LocalizedReading {
            validdate,
            lat: self.lat,
            lon: self.lon,
            values: self.values,
        }
    }
}

/// A [`RawReading`] whose `validdate` was rewritten into local civil time,
/// or nulled when the conversion failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedReading {
    pub validdate: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

/// Raw query inputs of a forecast request, as received from the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherRequest {
    pub city: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl WeatherRequest {
    pub fn for_city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            ..Self::default()
        }
    }

    pub fn for_coordinates(lat: impl Into<String>, lon: impl Into<String>) -> Self {
        Self {
            city: None,
            lat: Some(lat.into()),
            lon: Some(lon.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub weather_data: Vec<LocalizedReading>,
    pub timezone: String,
}

/// Best geocoding match for a free-text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPlace {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Coordinate used for a forecast together with its civil timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    pub timezone_id: String,
    pub tz: Tz,
}
