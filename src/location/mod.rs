pub mod google;
pub mod mapbox;
pub mod provider;
pub mod resolver;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use google::GoogleGeocoder;
pub use mapbox::MapboxGeocoder;
pub use provider::{provider_from_config, GeocodingProvider};
pub use resolver::LocationResolver;
pub use source::{PositionSource, SimulatedPositionSource};
pub use types::{
    Accuracy, Coordinates, LocationQuery, LocationState, ProviderKind, QueryStatus,
    ADDRESS_UNAVAILABLE, FIX_FAILED_MESSAGE, LOCATION_NOT_FOUND, PERMISSION_DENIED_MESSAGE,
    UNKNOWN_LOCATION,
};
