use super::{ComponentState, PlaceSnapApp};
use crate::error::{PlaceSnapError, Result};
use crate::session::{CaptureSession, SessionDefaults};
use std::sync::Arc;
use tracing::{info, warn};

impl PlaceSnapApp {
    /// Register components and attach the capture session to the camera
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing PlaceSnap components");

        {
            let mut states = self.component_states.lock().await;
            states.insert("camera".to_string(), ComponentState::Stopped);
            states.insert("location".to_string(), ComponentState::Stopped);
            states.insert("session".to_string(), ComponentState::Stopped);
            if self.keyboard_enabled {
                states.insert("keyboard".to_string(), ComponentState::Stopped);
            }
        }

        let session = CaptureSession::new(
            SessionDefaults::from(&self.config.session),
            Arc::clone(&self.camera),
            Arc::clone(&self.locator),
            Arc::clone(&self.gateway),
            Arc::clone(&self.event_bus),
        )?;
        self.session = Some(session);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Bring the camera live and start locating
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting PlaceSnap");

        let session = self
            .session
            .clone()
            .ok_or_else(|| PlaceSnapError::system("Capture session not initialized"))?;

        self.set_component_state("location", ComponentState::Running)
            .await;

        let status = self
            .track("camera", async {
                let signals = *self.host.lock();
                session.set_host_signals(signals).await;
                Ok(session.start().await)
            })
            .await?;

        match status.condition {
            Some(condition) => warn!(
                "Camera ({}) not streaming: {:?}",
                status.device.facing, condition
            ),
            None => info!(
                "Camera ({}) live, lens {}",
                status.device.facing,
                status.device.lens.label()
            ),
        }

        self.set_component_state("session", ComponentState::Running)
            .await;

        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                self.track("keyboard", keyboard_handler.start()).await?;
                info!("Keyboard driver started - press SPACE to capture, q to quit");
            }
        }

        info!("PlaceSnap started successfully");
        Ok(())
    }
}
