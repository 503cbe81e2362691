use super::backend::CameraBackend;
use super::eligibility::should_stream;
use super::photo::PhotoHandle;
use super::types::{
    CameraCondition, CameraDeviceState, CameraStatus, CaptureSettings, DeviceDescriptor, Facing,
    FlashMode, Lens, LifecycleState, SupportedLenses,
};
use crate::error::CameraError;
use crate::events::{CheckinEvent, EventBus};
use crate::permission::PermissionStatus;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Owns the binding between the app and the physical camera.
///
/// The sensor is streaming exactly when the most recent eligibility request was
/// `true`, permission is granted and a device exists for the current facing.
/// Nothing else may flip `is_active`; callers only report eligibility.
pub struct CameraLifecycleController {
    backend: Arc<dyn CameraBackend>,
    event_bus: Arc<EventBus>,
    state: Mutex<ControllerState>,
    session_attached: AtomicBool,
}

struct ControllerState {
    device: CameraDeviceState,
    lifecycle: LifecycleState,
    /// Last value passed to `set_eligible`
    eligible: bool,
    permission: PermissionStatus,
    descriptor: Option<DeviceDescriptor>,
    lenses: Option<SupportedLenses>,
    condition: Option<CameraCondition>,
    capture_in_flight: bool,
    /// Bumped whenever the sensor stops streaming; pending captures from an
    /// older activation are discarded
    activation: u64,
    /// Bumped by every eligibility or facing request; the newest one owns the outcome
    request: u64,
}

impl ControllerState {
    fn status(&self) -> CameraStatus {
        CameraStatus {
            device: self.device.clone(),
            lifecycle: self.lifecycle,
            condition: self.condition,
            lens_cycling_enabled: self.lenses.as_ref().map_or(false, |l| l.can_cycle()),
        }
    }

    fn adopt_descriptor(&mut self, descriptor: &DeviceDescriptor) {
        let lenses = SupportedLenses::from_descriptor(descriptor);
        if !lenses.contains(self.device.lens) {
            self.device.lens = Lens::Normal;
        }
        self.lenses = Some(lenses);
        self.descriptor = Some(descriptor.clone());
    }

    fn mark_unavailable(&mut self) {
        self.descriptor = None;
        self.lenses = None;
        self.lifecycle = LifecycleState::Unbound;
        self.device.is_active = false;
        self.condition = Some(CameraCondition::DeviceUnavailable);
    }
}

/// An eligibility change reserved with `request_eligibility`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityRequest {
    eligible: bool,
    request: u64,
}

impl EligibilityRequest {
    pub fn eligible(&self) -> bool {
        self.eligible
    }
}

/// Clears the single-flight flag even if the capture future is dropped
struct CaptureFlight<'a> {
    state: &'a Mutex<ControllerState>,
}

impl Drop for CaptureFlight<'_> {
    fn drop(&mut self) {
        self.state.lock().capture_in_flight = false;
    }
}

impl CameraLifecycleController {
    pub fn new(backend: Arc<dyn CameraBackend>, facing: Facing, event_bus: Arc<EventBus>) -> Self {
        info!("Initializing camera lifecycle controller ({} facing)", facing);
        Self {
            backend,
            event_bus,
            state: Mutex::new(ControllerState {
                device: CameraDeviceState::new(facing),
                lifecycle: LifecycleState::Unbound,
                eligible: false,
                permission: PermissionStatus::Undetermined,
                descriptor: None,
                lenses: None,
                condition: None,
                capture_in_flight: false,
                activation: 0,
                request: 0,
            }),
            session_attached: AtomicBool::new(false),
        }
    }

    /// React to a change of the hosting screen's eligibility.
    ///
    /// Deactivation takes effect before the first suspension point. Activation
    /// re-checks permission and device availability every time, since either may
    /// have changed while the camera was paused.
    pub async fn set_eligible(&self, eligible: bool) -> CameraStatus {
        let request = self.request_eligibility(eligible);
        self.apply_eligibility(request).await
    }

    /// Record an eligibility change without touching the sensor.
    ///
    /// Requests are ordered by this call, not by `apply_eligibility`; callers
    /// that decide eligibility under their own lock reserve it there.
    pub fn request_eligibility(&self, eligible: bool) -> EligibilityRequest {
        let mut state = self.state.lock();
        state.eligible = eligible;
        state.request += 1;
        EligibilityRequest {
            eligible,
            request: state.request,
        }
    }

    /// Bring the sensor in line with a reserved request; a no-op once a newer
    /// request has been made
    pub async fn apply_eligibility(&self, request: EligibilityRequest) -> CameraStatus {
        if self.state.lock().request != request.request {
            debug!("Eligibility request {} superseded", request.request);
            return self.status();
        }

        debug!("Camera eligibility requested: {}", request.eligible);

        if !request.eligible {
            self.deactivate(LifecycleState::Paused).await;
            return self.status();
        }

        self.activate(request.request).await
    }

    async fn activate(&self, request: u64) -> CameraStatus {
        let mut permission = self.backend.permission_status().await;
        if permission == PermissionStatus::Undetermined {
            permission = self.backend.request_permission().await;
        }

        let facing = {
            let mut state = self.state.lock();
            if state.request != request {
                return state.status();
            }
            state.permission = permission;
            if !permission.is_granted() {
                state.condition = Some(CameraCondition::PermissionDenied);
            }
            state.device.facing
        };

        if !permission.is_granted() {
            warn!("Camera permission not granted ({:?})", permission);
            self.deactivate(LifecycleState::Unbound).await;
            self.publish_status();
            return self.status();
        }

        let discovered = self.backend.discover(facing).await;

        let descriptor = {
            let mut state = self.state.lock();
            if state.request != request {
                return state.status();
            }
            match discovered {
                None => None,
                Some(descriptor) => {
                    let already_streaming = state.lifecycle == LifecycleState::Active
                        && state.descriptor.as_ref() == Some(&descriptor);
                    if already_streaming {
                        state.condition = None;
                        return state.status();
                    }
                    state.adopt_descriptor(&descriptor);
                    state.lifecycle = LifecycleState::Binding;
                    Some(descriptor)
                }
            }
        };

        let descriptor = match descriptor {
            Some(descriptor) => descriptor,
            None => {
                warn!("No camera device for {} facing", facing);
                self.deactivate(LifecycleState::Unbound).await;
                self.state.lock().mark_unavailable();
                self.publish_status();
                return self.status();
            }
        };

        let bound = self.backend.bind(&descriptor).await;

        let (status, stale_unbind) = {
            let mut state = self.state.lock();
            if state.request != request {
                // A newer request took over while binding; if it turned the camera
                // off it unbound before our bind finished, so unbind again.
                let stale_unbind = bound.is_ok() && !state.eligible;
                (state.status(), stale_unbind)
            } else {
                match bound {
                    Ok(()) => {
                        state.device.is_active = should_stream(
                            state.eligible,
                            state.permission,
                            state.descriptor.is_some(),
                        );
                        state.lifecycle = if state.device.is_active {
                            LifecycleState::Active
                        } else {
                            LifecycleState::Unbound
                        };
                        state.condition = None;
                        info!(
                            "Camera {} active ({} lens)",
                            descriptor.id,
                            state.device.lens.label()
                        );
                    }
                    Err(ref e) => {
                        warn!("Failed to bind camera {}: {}", descriptor.id, e);
                        state.mark_unavailable();
                    }
                }
                (state.status(), false)
            }
        };

        if stale_unbind {
            debug!("Unbinding camera after superseded bind");
            self.backend.unbind().await;
            return self.status();
        }

        self.publish_status();
        status
    }

    /// Stop streaming; `target` is the lifecycle state to land in if we were bound
    async fn deactivate(&self, target: LifecycleState) {
        let was_bound = {
            let mut state = self.state.lock();
            let was_bound = matches!(
                state.lifecycle,
                LifecycleState::Active | LifecycleState::Binding
            );
            if was_bound {
                state.lifecycle = if state.lifecycle == LifecycleState::Active {
                    target
                } else {
                    LifecycleState::Unbound
                };
            } else if target == LifecycleState::Unbound {
                state.lifecycle = LifecycleState::Unbound;
            }
            if state.device.is_active {
                state.activation += 1;
            }
            state.device.is_active = false;
            was_bound
        };

        if was_bound {
            self.backend.unbind().await;
            info!("Camera deactivated ({:?})", target);
            self.publish_status();
        }
    }

    /// Take a photo with the current lens/flash settings.
    ///
    /// Single-flight: a second call while one is pending is rejected.
    pub async fn request_capture(&self) -> Result<PhotoHandle, CameraError> {
        let (settings, activation) = {
            let mut state = self.state.lock();
            if !state.device.is_active {
                return Err(CameraError::DeviceUnavailable {
                    facing: state.device.facing,
                });
            }
            if state.capture_in_flight {
                return Err(CameraError::AlreadyCapturing);
            }
            state.capture_in_flight = true;
            (CaptureSettings::from(&state.device), state.activation)
        };

        let flight = CaptureFlight { state: &self.state };
        let result = self.backend.take_photo(&settings).await;
        drop(flight);

        let path = result?;
        let photo = PhotoHandle::new(path, settings.facing);

        let stale = self.state.lock().activation != activation;
        if stale {
            info!("Discarding capture {} taken before camera deactivated", photo.id());
            drop(photo);
            return Err(CameraError::CaptureDiscarded);
        }

        info!(
            "Captured photo {} at {} -> {:?}",
            photo.id(),
            photo.captured_at().format("%H:%M:%S%.3f"),
            photo.path()
        );
        Ok(photo)
    }

    /// Advance to the next lens the bound device supports; no-op with a single lens
    pub fn cycle_lens(&self) -> Lens {
        let (lens, flash, changed) = {
            let mut state = self.state.lock();
            let next = match &state.lenses {
                Some(lenses) if lenses.can_cycle() => Some(lenses.next_after(state.device.lens)),
                _ => None,
            };
            if let Some(next) = next {
                state.device.lens = next;
            }
            (state.device.lens, state.device.flash, next.is_some())
        };

        if changed {
            debug!("Lens switched to {}", lens.label());
            let _ = self
                .event_bus
                .publish(CheckinEvent::CameraControlsChanged { lens, flash });
        }
        lens
    }

    /// Whether the lens toggle should be offered at all
    pub fn lens_cycling_enabled(&self) -> bool {
        self.state
            .lock()
            .lenses
            .as_ref()
            .map_or(false, |lenses| lenses.can_cycle())
    }

    /// Off -> On -> Auto -> Off; independent of the device
    pub fn cycle_flash(&self) -> FlashMode {
        let (lens, flash) = {
            let mut state = self.state.lock();
            state.device.flash = state.device.flash.next();
            (state.device.lens, state.device.flash)
        };
        debug!("Flash mode set to {:?}", flash);
        let _ = self
            .event_bus
            .publish(CheckinEvent::CameraControlsChanged { lens, flash });
        flash
    }

    /// Toggle preview mirroring; only the front camera mirrors
    pub fn toggle_mirror(&self) -> bool {
        let mut state = self.state.lock();
        if state.device.facing == Facing::Front {
            state.device.mirrored = !state.device.mirrored;
        }
        state.device.mirrored
    }

    /// Rebind to the other side of the device.
    ///
    /// Lens resets to `Normal` because lens availability differs per facing. A
    /// missing device is surfaced in the returned status, not as an error.
    pub async fn switch_facing(&self, facing: Facing) -> CameraStatus {
        let (request, eligible) = {
            let mut state = self.state.lock();
            state.request += 1;
            (state.request, state.eligible)
        };

        info!("Switching camera to {} facing", facing);
        self.deactivate(LifecycleState::Unbound).await;

        {
            let mut state = self.state.lock();
            if state.request != request {
                return state.status();
            }
            state.device.facing = facing;
            state.device.lens = Lens::Normal;
            state.device.mirrored = facing == Facing::Front;
            state.descriptor = None;
            state.lenses = None;
            state.condition = None;
        }

        if eligible {
            return self.activate(request).await;
        }

        // Not eligible: probe the device so lens support and availability are known
        let discovered = self.backend.discover(facing).await;
        {
            let mut state = self.state.lock();
            if state.request != request {
                return state.status();
            }
            match discovered {
                Some(descriptor) => state.adopt_descriptor(&descriptor),
                None => state.mark_unavailable(),
            }
        }
        self.publish_status();
        self.status()
    }

    /// Unbind unconditionally (shutdown)
    pub async fn release(&self) {
        {
            let mut state = self.state.lock();
            state.eligible = false;
            state.request += 1;
        }
        self.deactivate(LifecycleState::Unbound).await;
    }

    pub fn status(&self) -> CameraStatus {
        self.state.lock().status()
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().device.is_active
    }

    pub fn facing(&self) -> Facing {
        self.state.lock().device.facing
    }

    pub fn is_capturing(&self) -> bool {
        self.state.lock().capture_in_flight
    }

    /// Attach a capture session; only one may hold the camera at a time
    pub fn claim_session(&self) -> bool {
        self.session_attached
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release_session(&self) {
        self.session_attached.store(false, Ordering::Release);
    }

    fn publish_status(&self) {
        let (active, facing, condition) = {
            let state = self.state.lock();
            (state.device.is_active, state.device.facing, state.condition)
        };
        let _ = self.event_bus.publish(CheckinEvent::CameraStatusChanged {
            active,
            facing,
            condition,
            timestamp: SystemTime::now(),
        });
    }
}
