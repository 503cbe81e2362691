pub mod http;
pub mod simulated;

#[cfg(test)]
mod tests;

pub use http::HttpUploadGateway;
pub use simulated::{RecordedCheckin, SimulatedUploadGateway, RECORDED_CALLS};

use crate::camera::PhotoHandle;
use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::session::Privacy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Identifier the backend assigned to a stored check-in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckinId(pub String);

impl CheckinId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckinLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

/// Everything the backend needs to store one check-in
#[derive(Debug, Clone)]
pub struct CheckinPayload {
    /// Shared with the session so the file outlives whichever side drops last
    pub photo: Arc<PhotoHandle>,
    pub description: String,
    pub location: CheckinLocation,
    pub privacy: Privacy,
}

/// Accepts finished check-ins; one call per submission, no retries
#[async_trait]
pub trait UploadGateway: Send + Sync {
    async fn submit_checkin(&self, payload: &CheckinPayload) -> Result<CheckinId, UploadError>;
}

/// HTTP gateway when an endpoint is configured, the simulated one otherwise
pub fn gateway_from_config(config: &UploadConfig) -> Result<Arc<dyn UploadGateway>, UploadError> {
    match &config.endpoint {
        Some(endpoint) => Ok(Arc::new(HttpUploadGateway::new(
            endpoint,
            config.auth_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(SimulatedUploadGateway::new(Duration::from_millis(
            config.simulated_delay_ms,
        )))),
    }
}
