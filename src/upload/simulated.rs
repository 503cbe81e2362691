use super::{CheckinId, CheckinLocation, CheckinPayload, UploadGateway};
use crate::error::UploadError;
use crate::session::Privacy;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, trace};

type UploadResult = Result<CheckinId, UploadError>;

/// Most recent uploads kept for inspection
pub const RECORDED_CALLS: usize = 32;

/// What a simulated upload received; the photo itself is not retained
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCheckin {
    pub photo_path: PathBuf,
    pub description: String,
    pub location: CheckinLocation,
    pub privacy: Privacy,
}

/// Stand-in backend: waits, then accepts with a timestamp id
pub struct SimulatedUploadGateway {
    delay: Duration,
    state: Mutex<SimulatedUploadState>,
}

struct SimulatedUploadState {
    calls: VecDeque<RecordedCheckin>,
    call_count: usize,
    fail_next: Option<UploadError>,
    holds: VecDeque<oneshot::Receiver<UploadResult>>,
}

impl SimulatedUploadGateway {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Mutex::new(SimulatedUploadState {
                calls: VecDeque::with_capacity(RECORDED_CALLS),
                call_count: 0,
                fail_next: None,
                holds: VecDeque::new(),
            }),
        }
    }

    pub fn fail_next(&self, error: UploadError) {
        self.state.lock().fail_next = Some(error);
    }

    /// Keep the next upload pending until a result is sent
    pub fn hold_next(&self) -> oneshot::Sender<UploadResult> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().holds.push_back(rx);
        tx
    }

    /// Uploads received since creation
    pub fn call_count(&self) -> usize {
        self.state.lock().call_count
    }

    /// The last `RECORDED_CALLS` payloads received, oldest first
    pub fn calls(&self) -> Vec<RecordedCheckin> {
        self.state.lock().calls.iter().cloned().collect()
    }
}

#[async_trait]
impl UploadGateway for SimulatedUploadGateway {
    async fn submit_checkin(&self, payload: &CheckinPayload) -> Result<CheckinId, UploadError> {
        let hold = {
            let mut state = self.state.lock();
            if state.calls.len() == RECORDED_CALLS {
                state.calls.pop_front();
            }
            state.calls.push_back(RecordedCheckin {
                photo_path: payload.photo.path().to_path_buf(),
                description: payload.description.clone(),
                location: payload.location.clone(),
                privacy: payload.privacy,
            });
            state.call_count += 1;
            state.holds.pop_front()
        };

        if let Some(hold) = hold {
            trace!("Simulated upload waiting for release");
            return hold.await.unwrap_or_else(|_| {
                Err(UploadError::Transport {
                    details: "connection dropped".to_string(),
                })
            });
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failure = self.state.lock().fail_next.take();
        if let Some(error) = failure {
            return Err(error);
        }

        let id = CheckinId(format!("checkin_{}", Utc::now().timestamp_millis()));
        info!(
            "Simulated upload accepted {} ({} privacy, {:?})",
            id,
            payload.privacy.as_str(),
            payload.location.address
        );
        Ok(id)
    }
}
