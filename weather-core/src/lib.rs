//! Core library for the `weather` service.
//!
//! This crate defines:
//! - Location resolution (registered cities, coordinates, free-text geocoding)
//! - Geographic timezone inference with UTC fallback
//! - Abstraction over the hourly forecast provider
//! - The pipeline that localizes forecast timestamps to civil time
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod localize;
pub mod location;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod timezone;

pub use config::{Config, Credentials};
pub use error::{GeocodeError, ProviderError, WeatherError};
pub use location::{CityRegistry, Geocoder, LocationResolver};
pub use model::{
    Coordinate, ForecastParameter, GeocodedPlace, LocalizedReading, RawReading, TimeWindow,
    WeatherRequest, WeatherResponse,
};
pub use pipeline::WeatherPipeline;
pub use provider::ForecastFetcher;
pub use timezone::{TimeZoneResolver, TimezoneLookup};
