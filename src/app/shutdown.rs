use super::{ComponentState, PlaceSnapApp};
use crate::error::Result;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

const CAMERA_RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

impl PlaceSnapApp {
    /// Stop the driver, release the camera and drop the session (and its photo)
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();

        let mut exit_code = 0;

        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                self.set_component_state("keyboard", ComponentState::Stopping)
                    .await;
                match keyboard_handler.stop().await {
                    Ok(()) => {
                        self.set_component_state("keyboard", ComponentState::Stopped)
                            .await
                    }
                    Err(e) => {
                        error!("Error stopping keyboard: {}", e);
                        self.set_component_state("keyboard", ComponentState::Failed)
                            .await;
                        exit_code = 1;
                    }
                }
            }
        }

        self.set_component_state("camera", ComponentState::Stopping)
            .await;
        match timeout(CAMERA_RELEASE_TIMEOUT, self.camera.release()).await {
            Ok(()) => {
                self.set_component_state("camera", ComponentState::Stopped)
                    .await;
                info!("Camera released");
            }
            Err(_) => {
                error!("Camera release timed out");
                self.set_component_state("camera", ComponentState::Failed)
                    .await;
                exit_code = 1;
            }
        }

        if let Some(session) = self.session.take() {
            let snapshot = session.snapshot();
            if snapshot.has_photo() {
                warn!(
                    "Discarding unsent check-in photo ({:?})",
                    snapshot.phase
                );
            }
            drop(session);
        }
        self.set_component_state("session", ComponentState::Stopped)
            .await;
        self.set_component_state("location", ComponentState::Stopped)
            .await;

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}
