use super::provider::{check_status, transport_error, GeocodingProvider};
use super::types::{Coordinates, ProviderKind, LOCATION_NOT_FOUND, UNKNOWN_LOCATION};
use crate::error::LocationError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const PROVIDER: ProviderKind = ProviderKind::Google;

/// Google Geocoding API client
pub struct GoogleGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    language: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: Option<String>,
}

impl GoogleGeocoder {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        language: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl GeocodingProvider for GoogleGeocoder {
    fn kind(&self) -> ProviderKind {
        PROVIDER
    }

    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, LocationError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(LocationError::MissingCredentials { provider: PROVIDER })?;

        let url = format!("{}/maps/api/geocode/json", self.base_url);
        let latlng = format!("{},{}", coordinates.latitude, coordinates.longitude);
        debug!("Google reverse geocode {}", latlng);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latlng", latlng.as_str()),
                ("key", api_key),
                ("language", self.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let data = check_status(PROVIDER, response)
            .await?
            .json::<GeocodeResponse>()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        Ok(match data.results.into_iter().next() {
            Some(result) => result
                .formatted_address
                .filter(|address| !address.is_empty())
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            None => LOCATION_NOT_FOUND.to_string(),
        })
    }
}
