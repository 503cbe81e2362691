use serde::{Deserialize, Serialize};

/// OS-level permission state for a device capability (camera, location)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// The user has not been asked yet
    Undetermined,
    Granted,
    /// Terminal until the user changes it in system settings
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}
