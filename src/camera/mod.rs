mod backend;
mod controller;
mod eligibility;
mod photo;
mod simulated;
mod types;

pub use backend::CameraBackend;
pub use controller::{CameraLifecycleController, EligibilityRequest};
pub use eligibility::{should_stream, HostSignals};
pub use photo::PhotoHandle;
pub use simulated::SimulatedCamera;
pub use types::{
    CameraCondition, CameraDeviceState, CameraStatus, CaptureSettings, DeviceDescriptor, Facing,
    FlashMode, Lens, LifecycleState, SupportedLenses,
};
