use super::provider::{check_status, transport_error, GeocodingProvider};
use super::types::{Coordinates, ProviderKind, LOCATION_NOT_FOUND, UNKNOWN_LOCATION};
use crate::error::LocationError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const PROVIDER: ProviderKind = ProviderKind::Mapbox;

/// Mapbox Geocoding v5 client
pub struct MapboxGeocoder {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    place_name: Option<String>,
    text: Option<String>,
}

impl MapboxGeocoder {
    pub fn new(client: reqwest::Client, base_url: &str, access_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }
}

#[async_trait]
impl GeocodingProvider for MapboxGeocoder {
    fn kind(&self) -> ProviderKind {
        PROVIDER
    }

    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, LocationError> {
        let token = self
            .access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(LocationError::MissingCredentials { provider: PROVIDER })?;

        // Mapbox takes longitude first
        let url = format!(
            "{}/geocoding/v5/mapbox.places/{},{}.json",
            self.base_url, coordinates.longitude, coordinates.latitude
        );
        debug!("Mapbox reverse geocode {}", coordinates);

        let response = self
            .client
            .get(&url)
            .query(&[("access_token", token), ("types", "address,poi,place")])
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let data = check_status(PROVIDER, response)
            .await?
            .json::<FeatureCollection>()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        Ok(match data.features.into_iter().next() {
            Some(feature) => feature
                .place_name
                .filter(|name| !name.is_empty())
                .or(feature.text.filter(|text| !text.is_empty()))
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            None => LOCATION_NOT_FOUND.to_string(),
        })
    }
}
