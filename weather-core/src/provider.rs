use crate::{
    config::{Config, Credentials},
    error::ProviderError,
    model::{Coordinate, ForecastParameter, RawReading, TimeWindow},
    provider::meteomatics::MeteomaticsFetcher,
};
use async_trait::async_trait;
use chrono::TimeDelta;
use std::{fmt::Debug, sync::Arc};

pub mod meteomatics;

/// Upstream hourly time-series capability.
#[async_trait]
pub trait ForecastFetcher: Send + Sync + Debug {
    /// Returns one reading per (coordinate, timestamp) covering `window`.
    async fn fetch(
        &self,
        coordinates: &[Coordinate],
        window: &TimeWindow,
        parameters: &[ForecastParameter],
    ) -> Result<Vec<RawReading>, ProviderError>;
}

/// Construct the forecast fetcher from config and credentials.
pub fn fetcher_from_config(
    config: &Config,
    credentials: Credentials,
) -> Result<Arc<dyn ForecastFetcher>, ProviderError> {
    let fetcher = MeteomaticsFetcher::new(&config.provider, credentials)?;
    Ok(Arc::new(fetcher))
}

/// ISO 8601 duration for a positive step, e.g. `PT1H`.
pub(crate) fn iso_duration(step: TimeDelta) -> String {
    let secs = step.num_seconds();
    if secs % 3600 == 0 {
        format!("PT{}H", secs / 3600)
    } else if secs % 60 == 0 {
        format!("PT{}M", secs / 60)
    } else {
        format!("PT{secs}S")
    }
}
