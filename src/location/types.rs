use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder shown when the provider call fails
pub const ADDRESS_UNAVAILABLE: &str = "Unable to get address";
/// Provider returned a match without a usable label
pub const UNKNOWN_LOCATION: &str = "Unknown location";
/// Provider returned no matches
pub const LOCATION_NOT_FOUND: &str = "Location not found";

pub const PERMISSION_DENIED_MESSAGE: &str = "Location permission denied";
pub const FIX_FAILED_MESSAGE: &str = "Failed to get location";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

/// Accuracy requested from the device location service; check-ins only need a
/// street-level fix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Pending,
    Resolved,
    Denied,
    Failed,
}

/// Reverse-geocoding backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Mapbox,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Mapbox => "mapbox",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one resolve; `superseded` is set when a newer query started first
#[derive(Debug, Clone, PartialEq)]
pub struct LocationQuery {
    pub sequence: u64,
    pub provider: ProviderKind,
    pub status: QueryStatus,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub error: Option<String>,
    pub superseded: bool,
}

/// Published location, written only by the latest query
#[derive(Debug, Clone, PartialEq)]
pub struct LocationState {
    pub sequence: u64,
    pub provider: ProviderKind,
    pub status: QueryStatus,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub error: Option<String>,
    pub loading: bool,
}

impl LocationState {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            sequence: 0,
            provider,
            status: QueryStatus::Pending,
            address: None,
            coordinates: None,
            error: None,
            loading: false,
        }
    }

    /// Address text for display; empty until something resolved
    pub fn display_address(&self) -> &str {
        self.address.as_deref().unwrap_or("")
    }
}
