use super::provider::GeocodingProvider;
use super::types::{Coordinates, ProviderKind};
use crate::error::LocationError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;

type GeocodeResult = Result<String, LocationError>;

/// In-process geocoder; answers with a fixed address unless a call is held
pub struct ScriptedGeocoder {
    kind: ProviderKind,
    address: Mutex<String>,
    holds: Mutex<VecDeque<oneshot::Receiver<GeocodeResult>>>,
    calls: Mutex<Vec<Coordinates>>,
}

impl ScriptedGeocoder {
    pub fn new<S: Into<String>>(address: S) -> Self {
        Self {
            kind: ProviderKind::Mapbox,
            address: Mutex::new(address.into()),
            holds: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_address<S: Into<String>>(&self, address: S) {
        *self.address.lock() = address.into();
    }

    pub fn hold_next(&self) -> oneshot::Sender<GeocodeResult> {
        let (tx, rx) = oneshot::channel();
        self.holds.lock().push_back(rx);
        tx
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl GeocodingProvider for ScriptedGeocoder {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, LocationError> {
        self.calls.lock().push(coordinates);
        let hold = self.holds.lock().pop_front();
        match hold {
            Some(hold) => hold.await.unwrap_or_else(|_| {
                Err(LocationError::GeocodingFailed {
                    provider: self.kind,
                    details: "request dropped".to_string(),
                })
            }),
            None => Ok(self.address.lock().clone()),
        }
    }
}
