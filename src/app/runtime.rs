use super::dispatch::ActionDispatcher;
use super::{PlaceSnapApp, ShutdownReason};
use crate::error::{EventBusError, PlaceSnapError, Result};
use crate::events::{CheckinEvent, EventFilter, EventReceiver};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

type ShutdownSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl PlaceSnapApp {
    /// Run until a signal or the driver asks to quit, then shut down
    pub async fn run(&mut self) -> Result<i32> {
        info!("PlaceSnap is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| PlaceSnapError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| PlaceSnapError::system("Shutdown receiver already taken"))?;

        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        self.setup_signal_handlers(Arc::clone(&shutdown_sender));
        self.spawn_event_loop(shutdown_sender)?;
        if self.keyboard_enabled {
            self.spawn_status_reporter();
        }

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| PlaceSnapError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("PlaceSnap shutdown complete");
        Ok(exit_code)
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self, shutdown_sender: ShutdownSender) {
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm =
                    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                        Ok(sigterm) => sigterm,
                        Err(e) => {
                            error!("Failed to register SIGTERM handler: {}", e);
                            return;
                        }
                    };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });
    }

    /// Route driver actions to the session and watch for quit requests
    fn spawn_event_loop(&self, shutdown_sender: ShutdownSender) -> Result<()> {
        let session = self
            .session
            .clone()
            .ok_or_else(|| PlaceSnapError::system("Capture session not initialized"))?;
        let dispatcher = ActionDispatcher::new(session, Arc::clone(&self.host));
        let cancellation_token = self.cancellation_token.clone();
        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::EventTypes(vec!["user_action", "shutdown_requested"]),
            "action_dispatcher".to_string(),
        );

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancellation_token.cancelled() => break,
                    event = receiver.recv() => event,
                };

                match event {
                    Ok(CheckinEvent::UserAction { action }) => {
                        // One task per action; host signals must not queue behind a capture
                        let dispatcher = dispatcher.clone();
                        tokio::spawn(async move {
                            if let Err(e) = dispatcher.dispatch(action).await {
                                warn!("Action rejected: {}", e);
                            }
                        });
                    }
                    Ok(CheckinEvent::ShutdownRequested { reason, .. }) => {
                        info!("Shutdown requested by driver: {}", reason);
                        if let Some(sender) = shutdown_sender.lock().await.take() {
                            let _ = sender.send(ShutdownReason::UserRequest);
                        }
                        break;
                    }
                    Ok(_) => {}
                    Err(EventBusError::ChannelClosed) => break,
                    Err(e) => warn!("Action dispatcher: {}", e),
                }
            }
            debug!("Action dispatcher stopped");
        });

        Ok(())
    }

    /// Echo session progress to the terminal while the keyboard driver owns it
    fn spawn_status_reporter(&self) {
        let cancellation_token = self.cancellation_token.clone();
        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::Custom(|event| !matches!(event, CheckinEvent::UserAction { .. })),
            "status_reporter".to_string(),
        );

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancellation_token.cancelled() => break,
                    event = receiver.recv() => event,
                };
                match event {
                    // Raw mode needs an explicit carriage return
                    Ok(event) => print!("{}\r\n", event.description()),
                    Err(EventBusError::ChannelClosed) => break,
                    Err(_) => {}
                }
            }
        });
    }
}
