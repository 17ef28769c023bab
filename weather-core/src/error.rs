use thiserror::Error;

/// Request-level failure surfaced to callers of the pipeline.
///
/// Each variant maps onto one HTTP-equivalent status through
/// [`WeatherError::status_code`]; the `Display` text is the client-facing
/// error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("City or coordinates required")]
    MissingInput,

    #[error("Invalid latitude or longitude")]
    InvalidInput,

    #[error("City not found")]
    NotFound,

    #[error("Geocoding service unavailable")]
    ServiceUnavailable,

    /// Forecast upstream failure; the message is passed through verbatim.
    #[error("{0}")]
    Provider(String),
}

impl WeatherError {
    pub fn status_code(&self) -> u16 {
        match self {
            WeatherError::MissingInput | WeatherError::InvalidInput => 400,
            WeatherError::NotFound => 404,
            WeatherError::ServiceUnavailable => 503,
            WeatherError::Provider(_) => 500,
        }
    }
}

/// Failure reported by a geocoding backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("geocoding request timed out: {0}")]
    Timeout(String),

    #[error("geocoding service unavailable: {0}")]
    Unavailable(String),
}

impl From<GeocodeError> for WeatherError {
    fn from(_: GeocodeError) -> Self {
        WeatherError::ServiceUnavailable
    }
}

/// Failure reported by the forecast provider, carrying the upstream text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError(e.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError(e.to_string())
    }
}

impl From<ProviderError> for WeatherError {
    fn from(e: ProviderError) -> Self {
        WeatherError::Provider(e.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(WeatherError::MissingInput.status_code(), 400);
        assert_eq!(WeatherError::InvalidInput.status_code(), 400);
        assert_eq!(WeatherError::NotFound.status_code(), 404);
        assert_eq!(WeatherError::ServiceUnavailable.status_code(), 503);
        assert_eq!(WeatherError::Provider("boom".into()).status_code(), 500);
    }

    #[test]
    fn provider_message_is_passed_through() {
        let err: WeatherError = ProviderError("401 Unauthorized: bad credentials".into()).into();
        assert_eq!(err.to_string(), "401 Unauthorized: bad credentials");
    }

    #[test]
    fn geocode_timeout_and_outage_both_map_to_unavailable() {
        let timeout: WeatherError = GeocodeError::Timeout("10s".into()).into();
        let down: WeatherError = GeocodeError::Unavailable("502".into()).into();
        assert_eq!(timeout, WeatherError::ServiceUnavailable);
        assert_eq!(down, WeatherError::ServiceUnavailable);
        assert_eq!(timeout.to_string(), "Geocoding service unavailable");
    }
}
