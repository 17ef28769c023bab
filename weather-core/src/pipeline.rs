//! Request orchestration: input → coordinate → forecast window → readings →
//! local time.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::{
    config::{Config, Credentials},
    error::WeatherError,
    localize::localize_readings,
    location::{CityRegistry, LocationResolver, nominatim::NominatimGeocoder},
    model::{Coordinate, ForecastParameter, TimeWindow, WeatherRequest, WeatherResponse},
    provider::{ForecastFetcher, fetcher_from_config},
    timezone::{TimeZoneResolver, TzfLookup},
};

#[derive(Debug, Clone)]
pub struct WeatherPipeline {
    locations: LocationResolver,
    fetcher: Arc<dyn ForecastFetcher>,
    timezones: TimeZoneResolver,
    parameters: &'static [ForecastParameter],
    now_fn: fn() -> DateTime<Utc>,
}

impl WeatherPipeline {
    pub fn new(
        locations: LocationResolver,
        fetcher: Arc<dyn ForecastFetcher>,
        timezones: TimeZoneResolver,
    ) -> Self {
        Self {
            locations,
            fetcher,
            timezones,
            parameters: ForecastParameter::all(),
            now_fn: Utc::now,
        }
    }

    /// Wires the production collaborators: Nominatim, Meteomatics and the
    /// offline timezone boundary dataset.
    pub fn from_config(config: &Config, credentials: Credentials) -> anyhow::Result<Self> {
        let geocoder =
            NominatimGeocoder::new(&config.geocoder).context("Failed to build geocoding client")?;
        let fetcher =
            fetcher_from_config(config, credentials).context("Failed to build forecast client")?;
        let timezones = TimeZoneResolver::new(Arc::new(TzfLookup::new()));
        let locations = LocationResolver::new(CityRegistry::builtin(), Arc::new(geocoder));

        Ok(Self::new(locations, fetcher, timezones))
    }

    /// Replaces the wall clock used to anchor the forecast window.
    pub fn with_clock(mut self, now_fn: fn() -> DateTime<Utc>) -> Self {
        self.now_fn = now_fn;
        self
    }

    pub fn locations(&self) -> &LocationResolver {
        &self.locations
    }

    /// Resolves the request input, with the city name taking precedence over
    /// coordinates. Empty values count as absent.
    pub fn resolve_input(&self, request: &WeatherRequest) -> Result<Coordinate, WeatherError> {
        let present = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        if let Some(city) = present(&request.city) {
            let coordinate = self.locations.resolve_by_city(&city);
            tracing::debug!(city = %city, ?coordinate, "using registered city coordinates");
            return Ok(coordinate);
        }

        match (present(&request.lat), present(&request.lon)) {
            (Some(lat), Some(lon)) => {
                let coordinate = self.locations.resolve_by_coordinates(&lat, &lon).inspect_err(|_| {
                    tracing::error!(%lat, %lon, "invalid latitude or longitude provided");
                })?;
                tracing::debug!(?coordinate, "using provided coordinates");
                Ok(coordinate)
            }
            _ => {
                tracing::error!("city or coordinates not provided");
                Err(WeatherError::MissingInput)
            }
        }
    }

    /// 24 hours of hourly readings for the requested location, in its local time.
    pub async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherResponse, WeatherError> {
        tracing::debug!(?request, "received weather request");
        let coordinate = self.resolve_input(request)?;

        let window = TimeWindow::starting_at((self.now_fn)());
        tracing::debug!(start = %window.start, end = %window.end, "querying forecast window");

        let readings = self
            .fetcher
            .fetch(&[coordinate], &window, self.parameters)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "forecast query failed"))?;

        // Zone comes from the coordinate we asked for, never from the rows.
        let location = self.timezones.resolve_location(coordinate);
        let weather_data = localize_readings(readings, location.tz);

        tracing::debug!(timezone = %location.timezone_id, rows = weather_data.len(), "returning weather data");
        Ok(WeatherResponse { weather_data, timezone: location.timezone_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{GeocodeError, ProviderError},
        location::Geocoder,
        model::{GeocodedPlace, RawReading},
        timezone::TimezoneLookup,
    };
    use async_trait::async_trait;
    use chrono::{TimeDelta, TimeZone};
    use std::{collections::BTreeMap, sync::Mutex};

    #[derive(Debug)]
    struct NoGeocoder;

    #[async_trait]
    impl Geocoder for NoGeocoder {
        async fn geocode(&self, _query: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
            Ok(None)
        }
    }

    /// Answers by longitude so tests can tell which coordinate was looked up.
    #[derive(Debug)]
    struct ZoneByLongitude;

    impl TimezoneLookup for ZoneByLongitude {
        fn timezone_at(&self, _lat: f64, lon: f64) -> Option<String> {
            match lon {
                lon if lon == -87.6298 => Some("America/Chicago".to_string()),
                lon if lon == -86.52638569999999 => Some("America/Indiana/Indianapolis".to_string()),
                lon if lon == 10.0 => Some("Not/AZone".to_string()),
                _ => None,
            }
        }
    }

    #[derive(Debug)]
    struct FakeFetcher {
        result: Result<Vec<String>, ProviderError>,
        /// Coordinate stamped on returned rows; `None` echoes the requested one.
        row_coordinate: Option<Coordinate>,
        calls: Mutex<Vec<(Vec<Coordinate>, TimeWindow, usize)>>,
    }

    impl FakeFetcher {
        fn with_dates(dates: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(dates.iter().map(|d| d.to_string()).collect()),
                row_coordinate: None,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn with_dates_at(dates: &[&str], row_coordinate: Coordinate) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(dates.iter().map(|d| d.to_string()).collect()),
                row_coordinate: Some(row_coordinate),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Err(ProviderError(message.to_string())),
                row_coordinate: None,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ForecastFetcher for FakeFetcher {
        async fn fetch(
            &self,
            coordinates: &[Coordinate],
            window: &TimeWindow,
            parameters: &[ForecastParameter],
        ) -> Result<Vec<RawReading>, ProviderError> {
            self.calls.lock().expect("lock").push((coordinates.to_vec(), *window, parameters.len()));
            let dates = self.result.clone()?;
            let coordinate = self.row_coordinate.unwrap_or(coordinates[0]);
            Ok(dates
                .into_iter()
                .map(|date| RawReading {
                    validdate: Some(date),
                    lat: coordinate.lat(),
                    lon: coordinate.lon(),
                    values: BTreeMap::from([("t_2m:C".to_string(), Some(1.5))]),
                })
                .collect())
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 18, 42, 7).single().expect("time")
    }

    fn pipeline(fetcher: Arc<FakeFetcher>) -> WeatherPipeline {
        WeatherPipeline::new(
            LocationResolver::new(CityRegistry::builtin(), Arc::new(NoGeocoder)),
            fetcher,
            TimeZoneResolver::new(Arc::new(ZoneByLongitude)),
        )
        .with_clock(fixed_now)
    }

    #[tokio::test]
    async fn registered_city_is_localized_to_its_zone() {
        let fetcher = FakeFetcher::with_dates(&["2026-01-15T18:00:00Z", "2026-01-15T19:00:00Z"]);
        let response = pipeline(fetcher.clone())
            .get_weather(&WeatherRequest::for_city("Chicago"))
            .await
            .expect("weather");

        assert_eq!(response.timezone, "America/Chicago");
        let dates: Vec<_> = response.weather_data.iter().map(|r| r.validdate.as_deref()).collect();
        assert_eq!(dates, [Some("2026-01-15T12:00:00-06:00"), Some("2026-01-15T13:00:00-06:00")]);

        let calls = fetcher.calls.lock().expect("lock");
        let (coordinates, window, parameter_count) = &calls[0];
        assert_eq!(coordinates, &[Coordinate::new(41.8781, -87.6298).expect("valid")]);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2026, 1, 15, 18, 0, 0).single().expect("time"));
        assert_eq!(window.end - window.start, TimeDelta::hours(24));
        assert_eq!(*parameter_count, ForecastParameter::all().len());
    }

    #[tokio::test]
    async fn unknown_city_uses_default_city_and_zone() {
        let fetcher = FakeFetcher::with_dates(&["2026-01-15T18:00:00Z"]);
        let response = pipeline(fetcher.clone())
            .get_weather(&WeatherRequest::for_city("Atlantis"))
            .await
            .expect("weather");

        assert_eq!(response.timezone, "America/Indiana/Indianapolis");
        assert_eq!(response.weather_data[0].validdate.as_deref(), Some("2026-01-15T13:00:00-05:00"));
        let calls = fetcher.calls.lock().expect("lock");
        assert_eq!(calls[0].0[0], CityRegistry::builtin().default_city().coordinate);
    }

    #[tokio::test]
    async fn city_takes_precedence_over_coordinates() {
        let fetcher = FakeFetcher::with_dates(&[]);
        let request = WeatherRequest {
            city: Some("Chicago".to_string()),
            lat: Some("abc".to_string()),
            lon: Some("10".to_string()),
        };
        let response = pipeline(fetcher).get_weather(&request).await.expect("weather");
        assert_eq!(response.timezone, "America/Chicago");
    }

    #[tokio::test]
    async fn missing_input_is_rejected_before_fetching() {
        let fetcher = FakeFetcher::with_dates(&["2026-01-15T18:00:00Z"]);
        let pipeline = pipeline(fetcher.clone());

        for request in [
            WeatherRequest::default(),
            WeatherRequest { lat: Some("41.0".to_string()), ..WeatherRequest::default() },
            WeatherRequest { city: Some(String::new()), lon: Some("10".to_string()), ..WeatherRequest::default() },
        ] {
            assert_eq!(pipeline.get_weather(&request).await, Err(WeatherError::MissingInput));
        }
        assert!(fetcher.calls.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn non_numeric_coordinates_are_invalid_input() {
        let err = pipeline(FakeFetcher::with_dates(&[]))
            .get_weather(&WeatherRequest::for_coordinates("abc", "10"))
            .await
            .unwrap_err();
        assert_eq!(err, WeatherError::InvalidInput);
        assert_eq!(err.to_string(), "Invalid latitude or longitude");
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn unresolvable_zone_falls_back_to_utc() {
        let response = pipeline(FakeFetcher::with_dates(&["2026-01-15T18:00:00Z"]))
            .get_weather(&WeatherRequest::for_coordinates("0", "-150"))
            .await
            .expect("weather");

        assert_eq!(response.timezone, "UTC");
        assert_eq!(response.weather_data[0].validdate.as_deref(), Some("2026-01-15T18:00:00+00:00"));
    }

    #[tokio::test]
    async fn unknown_zone_identifier_falls_back_to_utc() {
        let response = pipeline(FakeFetcher::with_dates(&["2026-01-15T18:00:00Z"]))
            .get_weather(&WeatherRequest::for_coordinates("47.0", "10"))
            .await
            .expect("weather");

        assert_eq!(response.timezone, "UTC");
        assert_eq!(response.weather_data[0].validdate.as_deref(), Some("2026-01-15T18:00:00+00:00"));
    }

    #[tokio::test]
    async fn zone_follows_requested_coordinate_not_provider_rows() {
        let elsewhere = Coordinate::new(0.0, -150.0).expect("valid");
        let fetcher = FakeFetcher::with_dates_at(&["2026-01-15T18:00:00Z"], elsewhere);
        let response = pipeline(fetcher)
            .get_weather(&WeatherRequest::for_city("Chicago"))
            .await
            .expect("weather");

        assert_eq!(response.weather_data[0].lon, -150.0);
        assert_eq!(response.timezone, "America/Chicago");
        assert_eq!(response.weather_data[0].validdate.as_deref(), Some("2026-01-15T12:00:00-06:00"));
    }

    #[tokio::test]
    async fn malformed_row_is_nulled_without_failing_batch() {
        let fetcher = FakeFetcher::with_dates(&["2026-01-15T18:00:00Z", "yesterday-ish", ""]);
        let response = pipeline(fetcher)
            .get_weather(&WeatherRequest::for_city("Chicago"))
            .await
            .expect("weather");

        let dates: Vec<_> = response.weather_data.iter().map(|r| r.validdate.as_deref()).collect();
        assert_eq!(dates, [Some("2026-01-15T12:00:00-06:00"), None, None]);
        assert!(response.weather_data.iter().all(|r| r.values["t_2m:C"] == Some(1.5)));
    }

    #[tokio::test]
    async fn provider_failure_is_passed_through() {
        let err = pipeline(FakeFetcher::failing("Meteomatics request failed with status 401: bad auth"))
            .get_weather(&WeatherRequest::for_city("Chicago"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "Meteomatics request failed with status 401: bad auth");
    }
}
