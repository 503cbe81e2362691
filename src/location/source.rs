use super::types::{Accuracy, Coordinates};
use crate::config::LocationConfig;
use crate::error::LocationError;
use crate::permission::PermissionStatus;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Device location service
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Prompt for foreground location access if needed and report the answer
    async fn request_permission(&self) -> PermissionStatus;

    async fn current_position(&self, accuracy: Accuracy) -> Result<Coordinates, LocationError>;
}

type FixResult = Result<Coordinates, LocationError>;

/// Position source reporting a fixed coordinate, with hooks to deny access,
/// fail fixes or hold a fix until the caller releases it.
pub struct SimulatedPositionSource {
    state: Mutex<SimulatedFixState>,
}

struct SimulatedFixState {
    position: Coordinates,
    permission: PermissionStatus,
    fail_next: Option<String>,
    holds: VecDeque<oneshot::Receiver<FixResult>>,
    permission_requests: u64,
    fixes: u64,
}

impl SimulatedPositionSource {
    pub fn new(position: Coordinates) -> Self {
        Self {
            state: Mutex::new(SimulatedFixState {
                position,
                permission: PermissionStatus::Granted,
                fail_next: None,
                holds: VecDeque::new(),
                permission_requests: 0,
                fixes: 0,
            }),
        }
    }

    pub fn from_config(config: &LocationConfig) -> Self {
        let (latitude, longitude) = config.simulated_position;
        Self::new(Coordinates::new(latitude, longitude))
    }

    pub fn set_position(&self, position: Coordinates) {
        self.state.lock().position = position;
    }

    /// Answer given to the next permission prompts
    pub fn set_permission(&self, permission: PermissionStatus) {
        self.state.lock().permission = permission;
    }

    pub fn fail_next_fix<S: Into<String>>(&self, details: S) {
        self.state.lock().fail_next = Some(details.into());
    }

    /// Keep the next fix pending; it completes with whatever is sent
    pub fn hold_next_fix(&self) -> oneshot::Sender<FixResult> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().holds.push_back(rx);
        tx
    }

    pub fn permission_request_count(&self) -> u64 {
        self.state.lock().permission_requests
    }

    pub fn fix_count(&self) -> u64 {
        self.state.lock().fixes
    }
}

#[async_trait]
impl PositionSource for SimulatedPositionSource {
    async fn request_permission(&self) -> PermissionStatus {
        let mut state = self.state.lock();
        state.permission_requests += 1;
        state.permission
    }

    async fn current_position(&self, accuracy: Accuracy) -> Result<Coordinates, LocationError> {
        let hold = {
            let mut state = self.state.lock();
            state.fixes += 1;
            state.holds.pop_front()
        };

        if let Some(hold) = hold {
            trace!("Simulated fix waiting for release");
            return hold.await.unwrap_or_else(|_| {
                Err(LocationError::PositionUnavailable {
                    details: "fix abandoned".to_string(),
                })
            });
        }

        let mut state = self.state.lock();
        if let Some(details) = state.fail_next.take() {
            return Err(LocationError::PositionUnavailable { details });
        }
        debug!("Simulated {:?} fix at {}", accuracy, state.position);
        Ok(state.position)
    }
}
