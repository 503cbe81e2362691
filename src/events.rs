use crate::camera::{CameraCondition, Facing, FlashMode, Lens};
use crate::error::EventBusError;
use crate::location::QueryStatus;
use crate::session::{Phase, Privacy};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

/// Actions a hosting screen (keyboard driver, scripted run) can request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UserAction {
    Capture,
    Cancel,
    Submit,
    EditDescription(String),
    SetPrivacy(Privacy),
    CyclePrivacy,
    CycleFlash,
    CycleLens,
    SwitchFacing,
    ToggleMirror,
    RefreshLocation,
    ToggleScreenVisible,
    ToggleAppForeground,
}

/// Events that can occur during check-in capture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CheckinEvent {
    /// Capture session moved between phases
    PhaseChanged {
        from: Phase,
        to: Phase,
        timestamp: SystemTime,
    },
    /// Camera binding changed or a device condition was surfaced
    CameraStatusChanged {
        active: bool,
        facing: Facing,
        condition: Option<CameraCondition>,
        timestamp: SystemTime,
    },
    /// Lens or flash selection changed
    CameraControlsChanged { lens: Lens, flash: FlashMode },
    /// The latest location query produced a result
    LocationUpdated {
        sequence: u64,
        status: QueryStatus,
        address: String,
        timestamp: SystemTime,
    },
    /// A check-in was accepted by the gateway
    CheckinUploaded {
        checkin_id: String,
        timestamp: SystemTime,
    },
    /// The gateway rejected or failed a check-in
    UploadFailed { error: String, timestamp: SystemTime },
    /// A host driver requested a user action
    UserAction { action: UserAction },
    /// Shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl CheckinEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            CheckinEvent::PhaseChanged { timestamp, .. } => *timestamp,
            CheckinEvent::CameraStatusChanged { timestamp, .. } => *timestamp,
            CheckinEvent::CameraControlsChanged { .. } => SystemTime::now(),
            CheckinEvent::LocationUpdated { timestamp, .. } => *timestamp,
            CheckinEvent::CheckinUploaded { timestamp, .. } => *timestamp,
            CheckinEvent::UploadFailed { timestamp, .. } => *timestamp,
            CheckinEvent::UserAction { .. } => SystemTime::now(),
            CheckinEvent::ShutdownRequested { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            CheckinEvent::PhaseChanged { from, to, .. } => {
                format!("Phase {:?} -> {:?}", from, to)
            }
            CheckinEvent::CameraStatusChanged {
                active,
                facing,
                condition,
                ..
            } => match condition {
                Some(condition) => format!("Camera ({}) {:?}", facing, condition),
                None => format!(
                    "Camera ({}) {}",
                    facing,
                    if *active { "active" } else { "inactive" }
                ),
            },
            CheckinEvent::CameraControlsChanged { lens, flash } => {
                format!("Lens {} flash {:?}", lens.label(), flash)
            }
            CheckinEvent::LocationUpdated {
                sequence,
                status,
                address,
                ..
            } => format!("Location #{} {:?}: {}", sequence, status, address),
            CheckinEvent::CheckinUploaded { checkin_id, .. } => {
                format!("Check-in uploaded: {}", checkin_id)
            }
            CheckinEvent::UploadFailed { error, .. } => format!("Upload failed: {}", error),
            CheckinEvent::UserAction { action } => format!("User action: {:?}", action),
            CheckinEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            CheckinEvent::PhaseChanged { .. } => "phase_changed",
            CheckinEvent::CameraStatusChanged { .. } => "camera_status_changed",
            CheckinEvent::CameraControlsChanged { .. } => "camera_controls_changed",
            CheckinEvent::LocationUpdated { .. } => "location_updated",
            CheckinEvent::CheckinUploaded { .. } => "checkin_uploaded",
            CheckinEvent::UploadFailed { .. } => "upload_failed",
            CheckinEvent::UserAction { .. } => "user_action",
            CheckinEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Event bus for component coordination using broadcast channels
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CheckinEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity (at least 1)
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<CheckinEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Never suspends, so state machines can publish from inside a transition.
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: CheckinEvent) -> Result<usize, EventBusError> {
        match &event {
            CheckinEvent::CheckinUploaded { checkin_id, .. } => {
                info!("Check-in uploaded: {}", checkin_id);
            }
            CheckinEvent::UploadFailed { error, .. } => {
                warn!("Check-in upload failed: {}", error);
            }
            CheckinEvent::CameraStatusChanged {
                condition: Some(condition),
                facing,
                ..
            } => {
                warn!("Camera ({}) unavailable: {:?}", facing, condition);
            }
            CheckinEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Event: {}", event.description()),
        }

        if self.sender.receiver_count() == 0 {
            trace!("No subscribers for {}", event.event_type());
            return Ok(0);
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&CheckinEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &CheckinEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<CheckinEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<CheckinEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<CheckinEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<CheckinEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    error!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
