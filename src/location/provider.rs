use super::google::GoogleGeocoder;
use super::mapbox::MapboxGeocoder;
use super::types::{Coordinates, ProviderKind};
use crate::config::LocationConfig;
use crate::error::LocationError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Reverse-geocoding strategy, chosen once when the resolver is built
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Turn coordinates into a display address.
    ///
    /// An empty match list is not an error; providers answer with one of the
    /// placeholder strings instead.
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, LocationError>;
}

/// Build the configured provider sharing one HTTP client
pub fn provider_from_config(
    config: &LocationConfig,
) -> Result<Arc<dyn GeocodingProvider>, LocationError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| LocationError::GeocodingFailed {
            provider: config.provider,
            details: format!("cannot build HTTP client: {}", e),
        })?;

    info!("Using {} reverse geocoding", config.provider);

    let provider: Arc<dyn GeocodingProvider> = match config.provider {
        ProviderKind::Google => Arc::new(GoogleGeocoder::new(
            client,
            &config.google_base_url,
            config.google_api_key.clone(),
            &config.language,
        )),
        ProviderKind::Mapbox => Arc::new(MapboxGeocoder::new(
            client,
            &config.mapbox_base_url,
            config.mapbox_access_token.clone(),
        )),
    };
    Ok(provider)
}

/// Map a non-success HTTP response to a provider error
pub(crate) async fn check_status(
    provider: ProviderKind,
    response: reqwest::Response,
) -> Result<reqwest::Response, LocationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LocationError::GeocodingFailed {
        provider,
        details: format!("status {}: {}", status, body),
    })
}

pub(crate) fn transport_error(provider: ProviderKind, e: reqwest::Error) -> LocationError {
    LocationError::GeocodingFailed {
        provider,
        details: e.to_string(),
    }
}
