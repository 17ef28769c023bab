//! Resolution of caller input (registered city, free-text query or raw
//! coordinates) to a [`Coordinate`].

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;

use crate::{
    error::{GeocodeError, WeatherError},
    model::{Coordinate, GeocodedPlace, NamedCity},
};

pub mod nominatim;

static BUILTIN_CITIES: [NamedCity; 4] = [
    NamedCity { name: "Bloomington", coordinate: Coordinate::from_static(39.165325, -86.52638569999999) },
    NamedCity { name: "Chicago", coordinate: Coordinate::from_static(41.8781, -87.6298) },
    NamedCity { name: "New York", coordinate: Coordinate::from_static(40.7128, -74.0060) },
    NamedCity { name: "Los Angeles", coordinate: Coordinate::from_static(34.0522, -118.2437) },
];

static BUILTIN: CityRegistry = CityRegistry::new(&BUILTIN_CITIES, 0);

/// Read-only table of named cities with one designated default.
#[derive(Debug)]
pub struct CityRegistry {
    cities: &'static [NamedCity],
    default_index: usize,
}

impl CityRegistry {
    /// `cities` must be non-empty. An out-of-range `default_index` falls back
    /// to the first entry.
    pub const fn new(cities: &'static [NamedCity], default_index: usize) -> Self {
        assert!(!cities.is_empty(), "city registry needs at least one entry");
        let default_index = if default_index < cities.len() { default_index } else { 0 };
        Self { cities, default_index }
    }

    /// The process-wide registry.
    pub fn builtin() -> &'static CityRegistry {
        &BUILTIN
    }

    /// City names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.cities.iter().map(|city| city.name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&NamedCity> {
        self.cities.iter().find(|city| city.name == name)
    }

    pub fn default_city(&self) -> &NamedCity {
        &self.cities[self.default_index]
    }

    /// Looks up `name`; unknown names resolve to the default city.
    pub fn resolve(&self, name: &str) -> Coordinate {
        match self.get(name) {
            Some(city) => city.coordinate,
            None => {
                let fallback = self.default_city();
                tracing::debug!(city = name, default = fallback.name, "unknown city, using default");
                fallback.coordinate
            }
        }
    }
}

/// External free-text geocoding capability.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Returns the best match, or `None` when nothing matched.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>, GeocodeError>;
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    registry: &'static CityRegistry,
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    pub fn new(registry: &'static CityRegistry, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { registry, geocoder }
    }

    pub fn registry(&self) -> &'static CityRegistry {
        self.registry
    }

    pub fn resolve_by_city(&self, name: &str) -> Coordinate {
        self.registry.resolve(name)
    }

    /// Parses a latitude/longitude pair of decimal strings.
    pub fn resolve_by_coordinates(&self, lat: &str, lon: &str) -> Result<Coordinate, WeatherError> {
        parse_coordinates(lat, lon)
    }

    /// Free-text lookup through the geocoder. No retries.
    pub async fn resolve_by_query(&self, text: &str) -> Result<GeocodedPlace, WeatherError> {
        let query = text.trim();
        tracing::debug!(query, "searching for city");
        if query.is_empty() {
            tracing::warn!("empty search query");
            return Err(WeatherError::NotFound);
        }

        match self.geocoder.geocode(query).await {
            Ok(Some(place)) => {
                tracing::debug!(name = %place.name, "city found");
                Ok(place)
            }
            Ok(None) => {
                tracing::warn!(query, "city not found");
                Err(WeatherError::NotFound)
            }
            Err(e) => {
                tracing::error!(error = %e, "geocoding service unavailable");
                Err(e.into())
            }
        }
    }
}

pub fn parse_coordinates(lat: &str, lon: &str) -> Result<Coordinate, WeatherError> {
    let lat: f64 = lat.trim().parse().map_err(|_| WeatherError::InvalidInput)?;
    let lon: f64 = lon.trim().parse().map_err(|_| WeatherError::InvalidInput)?;
    Coordinate::new(lat, lon)
}
