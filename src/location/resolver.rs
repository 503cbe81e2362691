use super::provider::GeocodingProvider;
use super::source::PositionSource;
use super::types::{
    Accuracy, Coordinates, LocationQuery, LocationState, ProviderKind, QueryStatus,
    ADDRESS_UNAVAILABLE, FIX_FAILED_MESSAGE, PERMISSION_DENIED_MESSAGE,
};
use crate::events::{CheckinEvent, EventBus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Resolves the device position to a display address.
///
/// Every query takes a sequence number when it starts; a result is published
/// only if no newer query has started since. Older queries still run to
/// completion and report `superseded`.
pub struct LocationResolver {
    source: Arc<dyn PositionSource>,
    provider: Arc<dyn GeocodingProvider>,
    event_bus: Arc<EventBus>,
    next_sequence: AtomicU64,
    state: watch::Sender<LocationState>,
}

enum Outcome {
    Denied,
    FixFailed,
    Located {
        status: QueryStatus,
        coordinates: Coordinates,
        address: String,
    },
}

impl LocationResolver {
    pub fn new(
        source: Arc<dyn PositionSource>,
        provider: Arc<dyn GeocodingProvider>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let (state, _) = watch::channel(LocationState::new(provider.kind()));
        Self {
            source,
            provider,
            event_bus,
            next_sequence: AtomicU64::new(0),
            state,
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider.kind()
    }

    /// Current published location
    pub fn state(&self) -> LocationState {
        self.state.borrow().clone()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.state.borrow().coordinates
    }

    pub fn subscribe(&self) -> watch::Receiver<LocationState> {
        self.state.subscribe()
    }

    /// Start a new query in the background
    pub fn refresh(self: &Arc<Self>) -> JoinHandle<LocationQuery> {
        let resolver = Arc::clone(self);
        tokio::spawn(async move { resolver.resolve().await })
    }

    /// Permission check, one balanced fix, one reverse-geocoding request
    pub async fn resolve(&self) -> LocationQuery {
        let mut sequence = 0;
        self.state.send_modify(|state| {
            sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
            state.sequence = sequence;
            state.loading = true;
            state.error = None;
        });
        debug!("Location query #{} started", sequence);

        let outcome = self.run(sequence).await;

        let mut query = LocationQuery {
            sequence,
            provider: self.provider.kind(),
            status: QueryStatus::Pending,
            address: None,
            coordinates: None,
            error: None,
            superseded: false,
        };
        match &outcome {
            Outcome::Denied => {
                query.status = QueryStatus::Denied;
                query.error = Some(PERMISSION_DENIED_MESSAGE.to_string());
            }
            Outcome::FixFailed => {
                query.status = QueryStatus::Failed;
                query.error = Some(FIX_FAILED_MESSAGE.to_string());
            }
            Outcome::Located {
                status,
                coordinates,
                address,
            } => {
                query.status = *status;
                query.coordinates = Some(*coordinates);
                query.address = Some(address.clone());
            }
        }

        let applied = self.state.send_if_modified(|state| {
            if state.sequence != sequence {
                return false;
            }
            state.status = query.status;
            state.loading = false;
            state.error = query.error.clone();
            // Denied and fix failures keep the last known place
            if let Outcome::Located {
                coordinates,
                address,
                ..
            } = &outcome
            {
                state.coordinates = Some(*coordinates);
                state.address = Some(address.clone());
            }
            true
        });

        if !applied {
            debug!("Location query #{} superseded, result dropped", sequence);
            query.superseded = true;
            return query;
        }

        let address = self.state.borrow().display_address().to_string();
        let _ = self.event_bus.publish(CheckinEvent::LocationUpdated {
            sequence,
            status: query.status,
            address,
            timestamp: SystemTime::now(),
        });
        query
    }

    async fn run(&self, sequence: u64) -> Outcome {
        let permission = self.source.request_permission().await;
        if !permission.is_granted() {
            warn!("Location query #{}: permission {:?}", sequence, permission);
            return Outcome::Denied;
        }

        let coordinates = match self.source.current_position(Accuracy::Balanced).await {
            Ok(coordinates) => coordinates,
            Err(e) => {
                warn!("Location query #{}: {}", sequence, e);
                return Outcome::FixFailed;
            }
        };

        match self.provider.reverse_geocode(coordinates).await {
            Ok(address) => {
                info!("Location query #{} resolved: {}", sequence, address);
                Outcome::Located {
                    status: QueryStatus::Resolved,
                    coordinates,
                    address,
                }
            }
            Err(e) => {
                warn!("Location query #{}: {}", sequence, e);
                Outcome::Located {
                    status: QueryStatus::Failed,
                    coordinates,
                    address: ADDRESS_UNAVAILABLE.to_string(),
                }
            }
        }
    }
}
