use super::types::{CaptureSettings, DeviceDescriptor, Facing};
use crate::error::CameraError;
use crate::permission::PermissionStatus;
use async_trait::async_trait;
use std::path::PathBuf;

/// Platform camera service.
///
/// Only `CameraLifecycleController` talks to a backend; every method may suspend.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Current permission without prompting
    async fn permission_status(&self) -> PermissionStatus;

    /// Prompt the user if the permission is still undetermined
    async fn request_permission(&self) -> PermissionStatus;

    /// Device for the given facing, if the hardware has one
    async fn discover(&self, facing: Facing) -> Option<DeviceDescriptor>;

    /// Bind the sensor and start streaming
    async fn bind(&self, device: &DeviceDescriptor) -> Result<(), CameraError>;

    /// Stop streaming and release the sensor
    async fn unbind(&self);

    /// Take a still photo and write it to a device-local file
    async fn take_photo(&self, settings: &CaptureSettings) -> Result<PathBuf, CameraError>;
}
