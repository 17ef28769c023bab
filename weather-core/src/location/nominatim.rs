use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{config::GeocoderSettings, error::GeocodeError, model::GeocodedPlace};

use super::Geocoder;

/// Forward geocoding against a Nominatim (OpenStreetMap) instance.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    http: Client,
}

impl NominatimGeocoder {
    pub fn new(settings: &GeocoderSettings) -> Result<Self, GeocodeError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    lat: String,
    lon: String,
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
        let url = format!("{}/search", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(classify)?;

        let status = res.status();
        if !status.is_success() {
            return Err(GeocodeError::Unavailable(format!("Nominatim returned status {status}")));
        }

        let places: Vec<NominatimPlace> = res.json().await.map_err(classify)?;
        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        let lat = place.lat.parse::<f64>();
        let lon = place.lon.parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => Ok(Some(GeocodedPlace { name: place.display_name, lat, lon })),
            _ => Err(GeocodeError::Unavailable(format!(
                "Nominatim returned malformed coordinates: {}, {}",
                place.lat, place.lon
            ))),
        }
    }
}

fn classify(e: reqwest::Error) -> GeocodeError {
    if e.is_timeout() {
        GeocodeError::Timeout(e.to_string())
    } else {
        GeocodeError::Unavailable(e.to_string())
    }
}
