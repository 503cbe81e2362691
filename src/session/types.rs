use crate::camera::{CameraStatus, Facing, HostSignals};
use crate::config::SessionConfig;
use crate::location::LocationState;
use crate::upload::CheckinId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Longest description a check-in accepts, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    /// A capture request is in flight
    CameraLive,
    Reviewing,
    Uploading,
}

impl Phase {
    /// Phases in which the viewfinder is on screen
    pub fn shows_camera(&self) -> bool {
        matches!(self, Phase::Idle | Phase::CameraLive)
    }
}

/// Who can see a check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Friends,
    Public,
    Private,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Friends => "friends",
            Privacy::Public => "public",
            Privacy::Private => "private",
        }
    }

    /// Friends -> Public -> Private -> Friends
    pub fn next(&self) -> Self {
        match self {
            Privacy::Friends => Privacy::Public,
            Privacy::Public => Privacy::Private,
            Privacy::Private => Privacy::Friends,
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User settings captured when a session is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDefaults {
    pub default_facing: Facing,
    pub default_privacy: Privacy,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            default_facing: Facing::Back,
            default_privacy: Privacy::Friends,
        }
    }
}

impl From<&SessionConfig> for SessionDefaults {
    fn from(config: &SessionConfig) -> Self {
        Self {
            default_facing: config.default_facing,
            default_privacy: config.default_privacy,
        }
    }
}

/// Result of the most recent upload attempt
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Succeeded(CheckinId),
    Failed(String),
}

/// Point-in-time view of a session for rendering
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub photo_path: Option<PathBuf>,
    pub description: String,
    pub privacy: Privacy,
    pub location: LocationState,
    pub camera: CameraStatus,
    pub host: HostSignals,
    pub last_outcome: Option<UploadOutcome>,
    pub upload_attempts: u64,
}

impl SessionSnapshot {
    pub fn has_photo(&self) -> bool {
        self.photo_path.is_some()
    }

    /// Whether `submit` would be accepted right now
    pub fn can_submit(&self) -> bool {
        self.phase == Phase::Reviewing
            && self.has_photo()
            && self.location.coordinates.is_some()
    }
}

/// Clamp user text to the description limit on a character boundary
pub fn truncate_description(text: &str) -> String {
    text.chars().take(MAX_DESCRIPTION_CHARS).collect()
}
