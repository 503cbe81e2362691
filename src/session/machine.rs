use super::ticket::UploadTicket;
use super::types::{
    truncate_description, Phase, Privacy, SessionDefaults, SessionSnapshot, UploadOutcome,
};
use crate::camera::{
    CameraLifecycleController, CameraStatus, EligibilityRequest, FlashMode, HostSignals, Lens,
    PhotoHandle,
};
use crate::error::{CameraError, SessionError, UploadError};
use crate::events::{CheckinEvent, EventBus};
use crate::location::{LocationQuery, LocationResolver};
use crate::upload::{CheckinId, CheckinLocation, CheckinPayload, UploadGateway};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::SystemTime;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One check-in attempt: capture, review, submit.
///
/// Cloning yields another handle to the same session. The photo file is
/// deleted on cancel, after a successful upload, or when the last handle
/// (and any in-flight upload) lets go of it.
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    defaults: SessionDefaults,
    camera: Arc<CameraLifecycleController>,
    locator: Arc<LocationResolver>,
    gateway: Arc<dyn UploadGateway>,
    event_bus: Arc<EventBus>,
    state: Mutex<SessionState>,
}

struct SessionState {
    phase: Phase,
    photo: Option<Arc<PhotoHandle>>,
    description: String,
    privacy: Privacy,
    host: HostSignals,
    last_outcome: Option<UploadOutcome>,
    upload_attempts: u64,
}

impl SessionInner {
    fn transition(&self, state: &mut SessionState, to: Phase) {
        let from = state.phase;
        if from == to {
            return;
        }
        state.phase = to;
        debug!("Session phase {:?} -> {:?}", from, to);
        let _ = self.event_bus.publish(CheckinEvent::PhaseChanged {
            from,
            to,
            timestamp: SystemTime::now(),
        });
    }

    /// Eligibility forwarded to the camera for the current phase and host inputs
    fn camera_eligible(state: &SessionState) -> bool {
        state.host.eligible() && state.phase.shows_camera()
    }

    /// Reserve the camera eligibility for `state` while its lock is held, so the
    /// controller sees requests in the order the session decided them
    fn reserve_camera(&self, state: &SessionState) -> EligibilityRequest {
        self.camera.request_eligibility(Self::camera_eligible(state))
    }

    /// Apply a gateway answer; returns the camera eligibility to restore, if any
    fn finish_upload(
        &self,
        attempt: u64,
        result: &Result<CheckinId, UploadError>,
    ) -> Option<EligibilityRequest> {
        let (released, eligible) = {
            let mut state = self.state.lock();
            if state.phase != Phase::Uploading || state.upload_attempts != attempt {
                warn!("Ignoring result of stale upload attempt {}", attempt);
                return None;
            }

            match result {
                Ok(id) => {
                    let released = state.photo.take();
                    state.description.clear();
                    state.privacy = self.defaults.default_privacy;
                    state.last_outcome = Some(UploadOutcome::Succeeded(id.clone()));
                    self.transition(&mut state, Phase::Idle);
                    let _ = self.event_bus.publish(CheckinEvent::CheckinUploaded {
                        checkin_id: id.to_string(),
                        timestamp: SystemTime::now(),
                    });
                    (released, Some(self.reserve_camera(&state)))
                }
                Err(e) => {
                    state.last_outcome = Some(UploadOutcome::Failed(e.to_string()));
                    self.transition(&mut state, Phase::Reviewing);
                    let _ = self.event_bus.publish(CheckinEvent::UploadFailed {
                        error: e.to_string(),
                        timestamp: SystemTime::now(),
                    });
                    (None, None)
                }
            }
        };
        drop(released);
        eligible
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.camera.release_session();
        info!("Capture session closed");
    }
}

/// Returns the session to Idle if a capture future ends without a photo
struct LiveCapture<'a> {
    inner: &'a SessionInner,
}

impl Drop for LiveCapture<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        if state.phase == Phase::CameraLive {
            self.inner.transition(&mut state, Phase::Idle);
        }
    }
}

impl CaptureSession {
    /// Attach a new session to the camera; fails if another session holds it
    pub fn new(
        defaults: SessionDefaults,
        camera: Arc<CameraLifecycleController>,
        locator: Arc<LocationResolver>,
        gateway: Arc<dyn UploadGateway>,
        event_bus: Arc<EventBus>,
    ) -> Result<Self, SessionError> {
        if !camera.claim_session() {
            return Err(SessionError::SessionActive);
        }

        info!(
            "Capture session created ({} camera, {} privacy)",
            defaults.default_facing, defaults.default_privacy
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                defaults,
                camera,
                locator,
                gateway,
                event_bus,
                state: Mutex::new(SessionState {
                    phase: Phase::Idle,
                    photo: None,
                    description: String::new(),
                    privacy: defaults.default_privacy,
                    host: HostSignals::default(),
                    last_outcome: None,
                    upload_attempts: 0,
                }),
            }),
        })
    }

    /// Point the camera at the default facing, apply host signals and start
    /// locating in the background
    pub async fn start(&self) -> CameraStatus {
        self.inner.locator.refresh();

        if self.inner.camera.facing() != self.inner.defaults.default_facing {
            self.inner
                .camera
                .switch_facing(self.inner.defaults.default_facing)
                .await;
        }

        let request = self.inner.reserve_camera(&self.inner.state.lock());
        self.inner.camera.apply_eligibility(request).await
    }

    /// Report screen visibility and app foreground state
    pub async fn set_host_signals(&self, signals: HostSignals) -> CameraStatus {
        let request = {
            let mut state = self.inner.state.lock();
            state.host = signals;
            self.inner.reserve_camera(&state)
        };
        debug!(
            "Host signals visible={} foreground={} -> camera eligible={}",
            signals.screen_visible,
            signals.app_foreground,
            request.eligible()
        );
        self.inner.camera.apply_eligibility(request).await
    }

    /// Take the photo for this check-in and move to review
    pub async fn capture(&self) -> Result<(), SessionError> {
        {
            let mut state = self.inner.state.lock();
            match state.phase {
                Phase::Idle => {}
                Phase::CameraLive => return Err(CameraError::AlreadyCapturing.into()),
                phase => {
                    return Err(SessionError::InvalidAction {
                        action: "capture",
                        phase,
                    })
                }
            }
            self.inner.transition(&mut state, Phase::CameraLive);
        }

        let live = LiveCapture { inner: &self.inner };
        let photo = match self.inner.camera.request_capture().await {
            Ok(photo) => photo,
            Err(e) => {
                warn!("Capture failed: {}", e);
                drop(live);
                return Err(e.into());
            }
        };

        let request = {
            let mut state = self.inner.state.lock();
            state.photo = Some(Arc::new(photo));
            state.last_outcome = None;
            self.inner.transition(&mut state, Phase::Reviewing);
            self.inner.reserve_camera(&state)
        };
        drop(live);

        self.inner.camera.apply_eligibility(request).await;
        Ok(())
    }

    /// Discard the photo and go back to the viewfinder
    pub async fn cancel(&self) -> Result<(), SessionError> {
        let (photo, request) = {
            let mut state = self.inner.state.lock();
            if state.phase != Phase::Reviewing {
                return Err(SessionError::InvalidAction {
                    action: "cancel",
                    phase: state.phase,
                });
            }
            let photo = state.photo.take();
            state.description.clear();
            state.last_outcome = None;
            self.inner.transition(&mut state, Phase::Idle);
            (photo, self.inner.reserve_camera(&state))
        };
        drop(photo);

        self.inner.camera.apply_eligibility(request).await;
        Ok(())
    }

    /// Replace the description; longer input is cut to the character limit
    pub fn edit_description(&self, text: &str) -> Result<String, SessionError> {
        let mut state = self.inner.state.lock();
        if state.phase != Phase::Reviewing {
            return Err(SessionError::InvalidAction {
                action: "edit description",
                phase: state.phase,
            });
        }
        state.description = truncate_description(text);
        Ok(state.description.clone())
    }

    pub fn set_privacy(&self, privacy: Privacy) -> Result<Privacy, SessionError> {
        let mut state = self.inner.state.lock();
        if state.phase == Phase::Uploading {
            return Err(SessionError::InvalidAction {
                action: "change privacy",
                phase: state.phase,
            });
        }
        state.privacy = privacy;
        Ok(privacy)
    }

    pub fn cycle_privacy(&self) -> Result<Privacy, SessionError> {
        let next = self.privacy().next();
        self.set_privacy(next)
    }

    /// Hand the check-in to the gateway.
    ///
    /// Validation and the move to Uploading happen before this returns. The
    /// upload itself runs detached and is not cancelled if the session goes away.
    pub fn submit(&self) -> Result<UploadTicket, SessionError> {
        let location = self.inner.locator.state();

        let (payload, attempt) = {
            let mut state = self.inner.state.lock();
            if state.phase == Phase::Uploading {
                return Err(SessionError::UploadInProgress);
            }
            if state.phase != Phase::Reviewing {
                return Err(SessionError::IncompleteSession);
            }
            let (photo, coordinates) = match (&state.photo, location.coordinates) {
                (Some(photo), Some(coordinates)) => (Arc::clone(photo), coordinates),
                _ => return Err(SessionError::IncompleteSession),
            };

            let payload = CheckinPayload {
                photo,
                description: state.description.clone(),
                location: CheckinLocation {
                    latitude: coordinates.latitude,
                    longitude: coordinates.longitude,
                    address: location.display_address().to_string(),
                },
                privacy: state.privacy,
            };
            state.upload_attempts += 1;
            self.inner.transition(&mut state, Phase::Uploading);
            (payload, state.upload_attempts)
        };

        info!(
            "Submitting check-in (attempt {}, {} privacy)",
            attempt, payload.privacy
        );

        let (tx, rx) = oneshot::channel();
        let session: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let gateway = Arc::clone(&self.inner.gateway);

        tokio::spawn(async move {
            let result = gateway.submit_checkin(&payload).await;
            drop(payload);

            match session.upgrade() {
                Some(inner) => {
                    if let Some(request) = inner.finish_upload(attempt, &result) {
                        inner.camera.apply_eligibility(request).await;
                    }
                }
                None => info!(
                    "Session closed before upload attempt {} finished; result not applied",
                    attempt
                ),
            }

            let _ = tx.send(result);
        });

        Ok(UploadTicket::new(attempt, rx))
    }

    pub fn cycle_lens(&self) -> Lens {
        self.inner.camera.cycle_lens()
    }

    pub fn cycle_flash(&self) -> FlashMode {
        self.inner.camera.cycle_flash()
    }

    pub fn toggle_mirror(&self) -> bool {
        self.inner.camera.toggle_mirror()
    }

    /// Flip between front and back cameras; not allowed mid-capture
    pub async fn switch_facing(&self) -> Result<CameraStatus, SessionError> {
        let phase = self.phase();
        if phase == Phase::CameraLive {
            return Err(SessionError::InvalidAction {
                action: "switch camera",
                phase,
            });
        }
        let facing = self.inner.camera.facing().opposite();
        Ok(self.inner.camera.switch_facing(facing).await)
    }

    /// Start a new location query; older in-flight queries lose
    pub fn refresh_location(&self) -> JoinHandle<LocationQuery> {
        self.inner.locator.refresh()
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.lock().phase
    }

    pub fn description(&self) -> String {
        self.inner.state.lock().description.clone()
    }

    pub fn privacy(&self) -> Privacy {
        self.inner.state.lock().privacy
    }

    pub fn photo(&self) -> Option<Arc<PhotoHandle>> {
        self.inner.state.lock().photo.clone()
    }

    pub fn last_outcome(&self) -> Option<UploadOutcome> {
        self.inner.state.lock().last_outcome.clone()
    }

    pub fn defaults(&self) -> SessionDefaults {
        self.inner.defaults
    }

    pub fn camera(&self) -> &Arc<CameraLifecycleController> {
        &self.inner.camera
    }

    pub fn locator(&self) -> &Arc<LocationResolver> {
        &self.inner.locator
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let location = self.inner.locator.state();
        let camera = self.inner.camera.status();
        let state = self.inner.state.lock();
        SessionSnapshot {
            phase: state.phase,
            photo_path: state.photo.as_ref().map(|photo| photo.path().to_path_buf()),
            description: state.description.clone(),
            privacy: state.privacy,
            location,
            camera,
            host: state.host,
            last_outcome: state.last_outcome.clone(),
            upload_attempts: state.upload_attempts,
        }
    }
}
