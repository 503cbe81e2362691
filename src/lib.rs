pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod events;
pub mod location;
pub mod permission;
pub mod session;
pub mod upload;

pub use app::{
    ActionDispatcher, ComponentState, KeyboardInputHandler, PlaceSnapApp, ShutdownReason,
};
pub use camera::{
    CameraBackend, CameraDeviceState, CameraLifecycleController, CameraStatus, Facing, FlashMode,
    HostSignals, Lens, LifecycleState, PhotoHandle, SimulatedCamera,
};
pub use config::PlaceSnapConfig;
pub use error::{CameraError, LocationError, PlaceSnapError, Result, SessionError, UploadError};
pub use events::{CheckinEvent, EventBus, EventFilter, EventReceiver, UserAction};
pub use location::{
    Coordinates, GeocodingProvider, GoogleGeocoder, LocationQuery, LocationResolver, LocationState,
    MapboxGeocoder, PositionSource, ProviderKind, QueryStatus, SimulatedPositionSource,
};
pub use permission::PermissionStatus;
pub use session::{
    CaptureSession, Phase, Privacy, SessionDefaults, SessionSnapshot, UploadOutcome, UploadTicket,
};
pub use upload::{
    CheckinId, CheckinPayload, HttpUploadGateway, SimulatedUploadGateway, UploadGateway,
};
