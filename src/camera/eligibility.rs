use crate::permission::PermissionStatus;

/// Visibility inputs reported by the hosting screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostSignals {
    /// Capture screen is the focused tab
    pub screen_visible: bool,
    /// Application is in the foreground
    pub app_foreground: bool,
}

impl HostSignals {
    pub fn new(screen_visible: bool, app_foreground: bool) -> Self {
        Self {
            screen_visible,
            app_foreground,
        }
    }

    /// Both host inputs allow a live preview
    pub fn eligible(&self) -> bool {
        self.screen_visible && self.app_foreground
    }
}

impl Default for HostSignals {
    fn default() -> Self {
        Self::new(true, true)
    }
}

/// Whether the sensor may be bound and streaming.
///
/// Pure function of the requested eligibility and the two device preconditions.
pub fn should_stream(requested: bool, permission: PermissionStatus, device_available: bool) -> bool {
    requested && permission.is_granted() && device_available
}
