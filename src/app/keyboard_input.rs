use crate::error::Result;
use crate::events::{CheckinEvent, EventBus, UserAction};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a key press means to the capture screen
#[derive(Debug, Clone, PartialEq)]
pub enum KeyCommand {
    Action(UserAction),
    Quit,
}

/// Key bindings for the terminal driver
pub fn command_for_key(code: KeyCode) -> Option<KeyCommand> {
    let action = match code {
        KeyCode::Char(' ') => UserAction::Capture,
        KeyCode::Char('x') => UserAction::Cancel,
        KeyCode::Char('s') | KeyCode::Enter => UserAction::Submit,
        KeyCode::Char('p') => UserAction::CyclePrivacy,
        KeyCode::Char('f') => UserAction::CycleFlash,
        KeyCode::Char('l') => UserAction::CycleLens,
        KeyCode::Char('c') => UserAction::SwitchFacing,
        KeyCode::Char('m') => UserAction::ToggleMirror,
        KeyCode::Char('r') => UserAction::RefreshLocation,
        KeyCode::Char('b') => UserAction::ToggleAppForeground,
        KeyCode::Char('v') => UserAction::ToggleScreenVisible,
        KeyCode::Char('q') | KeyCode::Esc => return Some(KeyCommand::Quit),
        _ => return None,
    };
    Some(KeyCommand::Action(action))
}

/// Terminal driver standing in for the touch UI: keys become user actions
pub struct KeyboardInputHandler {
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start reading keys on a blocking thread
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard driver");

        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard driver active");

            while !cancellation_token.is_cancelled() {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let key_event = match event::read() {
                            Ok(Event::Key(key_event)) if key_event.kind == KeyEventKind::Press => {
                                key_event
                            }
                            _ => continue,
                        };

                        let event = match command_for_key(key_event.code) {
                            Some(KeyCommand::Action(action)) => CheckinEvent::UserAction { action },
                            Some(KeyCommand::Quit) => CheckinEvent::ShutdownRequested {
                                timestamp: SystemTime::now(),
                                reason: "User requested via keyboard".to_string(),
                            },
                            None => {
                                debug!("Unbound key: {:?}", key_event.code);
                                continue;
                            }
                        };

                        let quit = matches!(event, CheckinEvent::ShutdownRequested { .. });
                        if let Err(e) = event_bus.publish(event) {
                            warn!("Failed to publish key event: {}", e);
                        }
                        if quit {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard driver task exited");
        });

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard driver");
        self.cancellation_token.cancel();

        // Let the polling thread notice and restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;

        let _ = disable_raw_mode();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert_eq!(
            command_for_key(KeyCode::Char(' ')),
            Some(KeyCommand::Action(UserAction::Capture))
        );
        assert_eq!(
            command_for_key(KeyCode::Char('b')),
            Some(KeyCommand::Action(UserAction::ToggleAppForeground))
        );
        assert_eq!(
            command_for_key(KeyCode::Char('v')),
            Some(KeyCommand::Action(UserAction::ToggleScreenVisible))
        );
        assert_eq!(command_for_key(KeyCode::Esc), Some(KeyCommand::Quit));
        assert_eq!(command_for_key(KeyCode::Char('z')), None);
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let event_bus = Arc::new(EventBus::new(100));
        let handler = KeyboardInputHandler::new(event_bus);

        assert!(!handler.cancellation_token.is_cancelled());
        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }
}
