use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    config::{Credentials, ProviderSettings},
    error::ProviderError,
    model::{Coordinate, ForecastParameter, RawReading, TimeWindow},
};

use super::{ForecastFetcher, iso_duration};

/// Meteomatics time-series API client.
#[derive(Debug, Clone)]
pub struct MeteomaticsFetcher {
    base_url: String,
    model: String,
    credentials: Credentials,
    http: Client,
}

impl MeteomaticsFetcher {
    pub fn new(settings: &ProviderSettings, credentials: Credentials) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            credentials,
            http,
        })
    }

    fn query_url(
        &self,
        coordinates: &[Coordinate],
        window: &TimeWindow,
        parameters: &[ForecastParameter],
    ) -> String {
        // Meteomatics treats the end as inclusive; stop one step short of it.
        let last = window.end - window.step;
        let start = window.start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let end = last.to_rfc3339_opts(SecondsFormat::Secs, true);
        let params: Vec<&str> = parameters.iter().map(|p| p.as_str()).collect();
        let points: Vec<String> =
            coordinates.iter().map(|c| format!("{},{}", c.lat(), c.lon())).collect();

        format!(
            "{}/{start}--{end}:{}/{}/{}/json",
            self.base_url,
            iso_duration(window.step),
            params.join(","),
            points.join("+"),
        )
    }
}

#[derive(Debug, Deserialize)]
struct MmResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Vec<MmParameter>,
}

#[derive(Debug, Deserialize)]
struct MmParameter {
    parameter: String,
    coordinates: Vec<MmCoordinate>,
}

#[derive(Debug, Deserialize)]
struct MmCoordinate {
    lat: f64,
    lon: f64,
    dates: Vec<MmDate>,
}

#[derive(Debug, Deserialize)]
struct MmDate {
    date: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MmError {
    message: String,
}

#[async_trait]
impl ForecastFetcher for MeteomaticsFetcher {
    async fn fetch(
        &self,
        coordinates: &[Coordinate],
        window: &TimeWindow,
        parameters: &[ForecastParameter],
    ) -> Result<Vec<RawReading>, ProviderError> {
        let url = self.query_url(coordinates, window, parameters);
        tracing::debug!(%url, "querying Meteomatics");

        let res = self
            .http
            .get(&url)
            .query(&[("model", self.model.as_str())])
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<MmError>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| truncate_body(&body));
            return Err(ProviderError(format!(
                "Meteomatics request failed with status {status}: {message}"
            )));
        }

        let parsed: MmResponse = serde_json::from_str(&body)?;
        if let Some(upstream) = parsed.status.as_deref().filter(|s| !s.eq_ignore_ascii_case("ok")) {
            let message = parsed.message.unwrap_or_else(|| upstream.to_string());
            return Err(ProviderError(format!("Meteomatics returned status {upstream}: {message}")));
        }

        tracing::debug!(parameters = parsed.data.len(), "Meteomatics query succeeded");
        Ok(pivot(parsed.data, parameters))
    }
}

/// Turns the per-parameter series into one row per (coordinate, date), in
/// first-seen order. Every row carries a slot for each requested parameter.
fn pivot(data: Vec<MmParameter>, parameters: &[ForecastParameter]) -> Vec<RawReading> {
    let mut rows: Vec<RawReading> = Vec::new();
    let mut index: HashMap<(u64, u64, String), usize> = HashMap::new();

    for series in data {
        for point in series.coordinates {
            for sample in point.dates {
                let key = (point.lat.to_bits(), point.lon.to_bits(), sample.date.clone());
                let row = *index.entry(key).or_insert_with(|| {
                    rows.push(RawReading {
                        validdate: Some(sample.date.clone()),
                        lat: point.lat,
                        lon: point.lon,
                        values: parameters.iter().map(|p| (p.as_str().to_string(), None)).collect(),
                    });
                    rows.len() - 1
                });
                rows[row].values.insert(series.parameter.clone(), sample.value);
            }
        }
    }

    rows
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
