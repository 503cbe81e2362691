use super::backend::CameraBackend;
use super::types::{CaptureSettings, DeviceDescriptor, Facing, Lens};
use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::permission::PermissionStatus;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Camera backend that writes synthetic JPEG stills to a capture directory.
///
/// Used by the binary when no platform camera is available and by tests to
/// script permission prompts, missing devices, sensor failures and slow captures.
pub struct SimulatedCamera {
    capture_dir: PathBuf,
    capture_delay: Duration,
    frame_counter: AtomicU64,
    state: Mutex<SimulatedState>,
}

struct SimulatedState {
    permission: PermissionStatus,
    /// Answer given when an undetermined permission is requested
    grant_on_request: bool,
    devices: HashMap<Facing, DeviceDescriptor>,
    bound: Option<String>,
    fail_next_capture: Option<String>,
    capture_holds: VecDeque<oneshot::Receiver<()>>,
    bind_holds: VecDeque<oneshot::Receiver<()>>,
    prompt_holds: VecDeque<oneshot::Receiver<()>>,
    bind_count: u64,
    prompt_count: u64,
}

impl SimulatedCamera {
    /// Create a simulated camera with no devices and undetermined permission
    pub fn new<P: Into<PathBuf>>(capture_dir: P, capture_delay: Duration) -> Self {
        Self {
            capture_dir: capture_dir.into(),
            capture_delay,
            frame_counter: AtomicU64::new(0),
            state: Mutex::new(SimulatedState {
                permission: PermissionStatus::Undetermined,
                grant_on_request: true,
                devices: HashMap::new(),
                bound: None,
                fail_next_capture: None,
                capture_holds: VecDeque::new(),
                bind_holds: VecDeque::new(),
                prompt_holds: VecDeque::new(),
                bind_count: 0,
                prompt_count: 0,
            }),
        }
    }

    /// Build from configuration; an empty lens list means no device for that facing
    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self::new(
            &config.capture_dir,
            Duration::from_millis(config.capture_delay_ms),
        );
        if !config.front_lenses.is_empty() {
            camera = camera.with_device(Facing::Front, config.front_lenses.clone());
        }
        if !config.back_lenses.is_empty() {
            camera = camera.with_device(Facing::Back, config.back_lenses.clone());
        }
        camera
    }

    pub fn with_device(self, facing: Facing, lenses: Vec<Lens>) -> Self {
        self.set_device(facing, Some(lenses));
        self
    }

    pub fn with_permission(self, permission: PermissionStatus) -> Self {
        self.set_permission(permission);
        self
    }

    /// Add, replace or remove (`None`) the device for a facing
    pub fn set_device(&self, facing: Facing, lenses: Option<Vec<Lens>>) {
        let mut state = self.state.lock();
        match lenses {
            Some(lenses) => {
                let id = format!("sim-{}", facing);
                state
                    .devices
                    .insert(facing, DeviceDescriptor::new(id, facing, lenses));
            }
            None => {
                state.devices.remove(&facing);
            }
        }
    }

    /// Simulate the user changing the permission in system settings
    pub fn set_permission(&self, permission: PermissionStatus) {
        self.state.lock().permission = permission;
    }

    pub fn set_grant_on_request(&self, grant: bool) {
        self.state.lock().grant_on_request = grant;
    }

    /// Make the next `take_photo` fail with a sensor error
    pub fn fail_next_capture<S: Into<String>>(&self, details: S) {
        self.state.lock().fail_next_capture = Some(details.into());
    }

    /// Keep the next capture pending until the returned sender fires or is dropped
    pub fn hold_next_capture(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().capture_holds.push_back(rx);
        tx
    }

    /// Keep the next bind pending until the returned sender fires or is dropped
    pub fn hold_next_bind(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().bind_holds.push_back(rx);
        tx
    }

    /// Leave the next permission prompt unanswered until the sender fires
    pub fn hold_next_prompt(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().prompt_holds.push_back(rx);
        tx
    }

    pub fn is_bound(&self) -> bool {
        self.state.lock().bound.is_some()
    }

    pub fn bind_count(&self) -> u64 {
        self.state.lock().bind_count
    }

    /// Permission prompts shown so far, including ones still pending
    pub fn prompt_count(&self) -> u64 {
        self.state.lock().prompt_count
    }

    pub fn capture_dir(&self) -> &PathBuf {
        &self.capture_dir
    }

    /// Minimal JFIF payload with a per-shot pattern
    fn synthetic_jpeg(frame_id: u64) -> Vec<u8> {
        let mut data = vec![
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x01,
            0x00, 0x48, 0x00, 0x48, 0x00, 0x00,
        ];
        let pattern_size = 1000 + (frame_id % 500) as usize;
        let pattern_byte = (frame_id % 256) as u8;
        data.extend(vec![pattern_byte; pattern_size]);
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }
}

#[async_trait]
impl CameraBackend for SimulatedCamera {
    async fn permission_status(&self) -> PermissionStatus {
        self.state.lock().permission
    }

    async fn request_permission(&self) -> PermissionStatus {
        let hold = {
            let mut state = self.state.lock();
            state.prompt_count += 1;
            state.prompt_holds.pop_front()
        };
        if let Some(hold) = hold {
            trace!("Simulated permission prompt waiting for the user");
            let _ = hold.await;
        }

        let mut state = self.state.lock();
        if state.permission == PermissionStatus::Undetermined {
            state.permission = if state.grant_on_request {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            };
            info!("Simulated camera permission prompt answered: {:?}", state.permission);
        }
        state.permission
    }

    async fn discover(&self, facing: Facing) -> Option<DeviceDescriptor> {
        self.state.lock().devices.get(&facing).cloned()
    }

    async fn bind(&self, device: &DeviceDescriptor) -> Result<(), CameraError> {
        let hold = self.state.lock().bind_holds.pop_front();
        if let Some(hold) = hold {
            trace!("Simulated bind waiting for release");
            let _ = hold.await;
        }

        let mut state = self.state.lock();
        if !state.devices.contains_key(&device.facing) {
            return Err(CameraError::Bind {
                details: format!("device {} disappeared", device.id),
            });
        }
        state.bound = Some(device.id.clone());
        state.bind_count += 1;
        debug!("Simulated camera bound to {}", device.id);
        Ok(())
    }

    async fn unbind(&self) {
        if let Some(id) = self.state.lock().bound.take() {
            debug!("Simulated camera unbound from {}", id);
        }
    }

    async fn take_photo(&self, settings: &CaptureSettings) -> Result<PathBuf, CameraError> {
        let hold = self.state.lock().capture_holds.pop_front();
        if let Some(hold) = hold {
            trace!("Simulated capture waiting for release");
            let _ = hold.await;
        }

        if !self.capture_delay.is_zero() {
            tokio::time::sleep(self.capture_delay).await;
        }

        let failure = self.state.lock().fail_next_capture.take();
        if let Some(details) = failure {
            warn!("Simulated sensor error: {}", details);
            return Err(CameraError::CaptureFailed { details });
        }

        tokio::fs::create_dir_all(&self.capture_dir)
            .await
            .map_err(|e| CameraError::CaptureFailed {
                details: format!("cannot create {:?}: {}", self.capture_dir, e),
            })?;

        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        let path = self.capture_dir.join(format!("{}.jpg", Uuid::new_v4()));
        let data = Self::synthetic_jpeg(frame_id);
        let data_len = data.len();

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| CameraError::CaptureFailed {
                details: format!("cannot write {:?}: {}", path, e),
            })?;

        debug!(
            "Simulated {} capture {} ({} lens, flash {:?}, {} bytes) -> {:?}",
            settings.facing,
            frame_id,
            settings.lens.label(),
            settings.flash,
            data_len,
            path
        );

        Ok(path)
    }
}
