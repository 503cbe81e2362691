use crate::camera::Facing;
use crate::location::ProviderKind;
use crate::session::Phase;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaceSnapError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl PlaceSnapError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Whether the user can get past this error without restarting the app
    pub fn is_recoverable(&self) -> bool {
        match self {
            PlaceSnapError::Camera(e) => e.is_recoverable(),
            PlaceSnapError::Session(_) => true,
            PlaceSnapError::Upload(_) => true,
            PlaceSnapError::Location(_) => true,
            PlaceSnapError::EventBus(EventBusError::PublishFailed { .. }) => true,
            _ => false,
        }
    }
}

/// Camera device errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("No camera device available for {facing} facing")]
    DeviceUnavailable { facing: Facing },

    #[error("A capture is already in progress")]
    AlreadyCapturing,

    #[error("Capture failed: {details}")]
    CaptureFailed { details: String },

    #[error("Capture result discarded because the camera was deactivated")]
    CaptureDiscarded,

    #[error("Failed to bind camera device: {details}")]
    Bind { details: String },
}

impl CameraError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CameraError::PermissionDenied)
    }

    pub fn user_message(&self) -> String {
        match self {
            CameraError::PermissionDenied => "Camera permission required".to_string(),
            CameraError::DeviceUnavailable { .. } => "Camera device not available".to_string(),
            CameraError::AlreadyCapturing => "Hold on, still taking the last photo".to_string(),
            CameraError::CaptureFailed { .. } => "Could not take photo, try again".to_string(),
            CameraError::CaptureDiscarded => "Camera was paused before the photo finished".to_string(),
            CameraError::Bind { .. } => "Camera device not available".to_string(),
        }
    }
}

/// Location service and geocoding errors
///
/// These never escape the resolver; they are reduced to a degraded query result.
#[derive(Error, Debug, Clone)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable: {details}")]
    PositionUnavailable { details: String },

    #[error("Geocoding via {provider} failed: {details}")]
    GeocodingFailed {
        provider: ProviderKind,
        details: String,
    },

    #[error("Missing credentials for {provider}")]
    MissingCredentials { provider: ProviderKind },
}

/// Caller misuse of the capture session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Session is incomplete: a photo and location coordinates are required")]
    IncompleteSession,

    #[error("An upload is already in progress")]
    UploadInProgress,

    #[error("Cannot {action} while {phase:?}")]
    InvalidAction { action: &'static str, phase: Phase },

    #[error("Another capture session is already attached to the camera")]
    SessionActive,

    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// Upload gateway failures
#[derive(Error, Debug, Clone)]
pub enum UploadError {
    #[error("Upload transport error: {details}")]
    Transport { details: String },

    #[error("Upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid upload response: {details}")]
    InvalidResponse { details: String },

    #[error("Failed to read photo {path:?}: {source}")]
    PhotoUnreadable {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        UploadError::Transport {
            details: e.to_string(),
        }
    }
}

/// Event bus errors
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, PlaceSnapError>;
