use crate::camera::HostSignals;
use crate::error::Result;
use crate::events::UserAction;
use crate::session::CaptureSession;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Applies host driver actions to a capture session
#[derive(Clone)]
pub struct ActionDispatcher {
    session: CaptureSession,
    host: Arc<Mutex<HostSignals>>,
}

impl ActionDispatcher {
    pub fn new(session: CaptureSession, host: Arc<Mutex<HostSignals>>) -> Self {
        Self { session, host }
    }

    /// Apply one action; rejected actions are returned as errors and leave state as is
    pub async fn dispatch(&self, action: UserAction) -> Result<()> {
        debug!("Dispatching {:?}", action);

        match action {
            UserAction::Capture => {
                self.session.capture().await?;
                info!("Photo captured, reviewing");
            }
            UserAction::Cancel => {
                self.session.cancel().await?;
                info!("Check-in discarded");
            }
            UserAction::Submit => {
                let ticket = self.session.submit()?;
                match ticket.outcome().await {
                    Ok(id) => info!("Check-in {} posted", id),
                    Err(e) => warn!("Check-in not posted: {}", e),
                }
            }
            UserAction::EditDescription(text) => {
                self.session.edit_description(&text)?;
            }
            UserAction::SetPrivacy(privacy) => {
                self.session.set_privacy(privacy)?;
            }
            UserAction::CyclePrivacy => {
                let privacy = self.session.cycle_privacy()?;
                info!("Privacy: {}", privacy);
            }
            UserAction::CycleFlash => {
                let flash = self.session.cycle_flash();
                info!("Flash: {:?}", flash);
            }
            UserAction::CycleLens => {
                let lens = self.session.cycle_lens();
                info!("Lens: {}", lens.label());
            }
            UserAction::SwitchFacing => {
                let status = self.session.switch_facing().await?;
                info!("Camera facing {}", status.device.facing);
            }
            UserAction::ToggleMirror => {
                let mirrored = self.session.toggle_mirror();
                info!("Mirror preview: {}", mirrored);
            }
            UserAction::RefreshLocation => {
                let query = self.session.refresh_location();
                if let Ok(query) = query.await {
                    debug!("Location query #{} finished: {:?}", query.sequence, query.status);
                }
            }
            UserAction::ToggleScreenVisible => {
                let signals = {
                    let mut host = self.host.lock();
                    host.screen_visible = !host.screen_visible;
                    *host
                };
                self.session.set_host_signals(signals).await;
            }
            UserAction::ToggleAppForeground => {
                let signals = {
                    let mut host = self.host.lock();
                    host.app_foreground = !host.app_foreground;
                    *host
                };
                self.session.set_host_signals(signals).await;
            }
        }

        Ok(())
    }
}
