use super::keyboard_input::KeyboardInputHandler;
use super::types::{ComponentState, ShutdownReason};
use crate::camera::{CameraBackend, CameraLifecycleController, HostSignals, SimulatedCamera};
use crate::config::PlaceSnapConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::location::{
    provider_from_config, GeocodingProvider, LocationResolver, PositionSource,
    SimulatedPositionSource,
};
use crate::session::CaptureSession;
use crate::upload::{gateway_from_config, UploadGateway};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wires the camera, location and upload components into one capture screen
pub struct PlaceSnapApp {
    pub(super) config: PlaceSnapConfig,
    pub(super) event_bus: Arc<EventBus>,

    // Components
    pub(super) camera: Arc<CameraLifecycleController>,
    pub(super) locator: Arc<LocationResolver>,
    pub(super) gateway: Arc<dyn UploadGateway>,
    pub(super) session: Option<CaptureSession>,
    /// Host inputs as toggled by the driver
    pub(super) host: Arc<parking_lot::Mutex<HostSignals>>,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl PlaceSnapApp {
    /// Create the app with simulated devices and the configured geocoder and gateway
    pub fn new(config: PlaceSnapConfig) -> Result<Self> {
        config.validate()?;

        let backend: Arc<dyn CameraBackend> = Arc::new(SimulatedCamera::from_config(&config.camera));
        let source: Arc<dyn PositionSource> =
            Arc::new(SimulatedPositionSource::from_config(&config.location));
        let provider = provider_from_config(&config.location)?;
        let gateway = gateway_from_config(&config.upload)?;

        info!(
            "Upload gateway: {}",
            config.upload.endpoint.as_deref().unwrap_or("simulated")
        );

        Ok(Self::with_components(config, backend, source, provider, gateway))
    }

    /// Create the app around caller-supplied device backends
    pub fn with_components(
        config: PlaceSnapConfig,
        backend: Arc<dyn CameraBackend>,
        source: Arc<dyn PositionSource>,
        provider: Arc<dyn GeocodingProvider>,
        gateway: Arc<dyn UploadGateway>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let camera = Arc::new(CameraLifecycleController::new(
            backend,
            config.session.default_facing,
            Arc::clone(&event_bus),
        ));
        let locator = Arc::new(LocationResolver::new(
            source,
            provider,
            Arc::clone(&event_bus),
        ));

        // Keyboard driver (disabled by default, enable via set_keyboard_enabled())
        let keyboard_handler = Some(KeyboardInputHandler::new(Arc::clone(&event_bus)));

        Self {
            config,
            event_bus,
            camera,
            locator,
            gateway,
            session: None,
            host: Arc::new(parking_lot::Mutex::new(HostSignals::default())),
            keyboard_handler,
            keyboard_enabled: false,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Enable or disable the keyboard driver
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn config(&self) -> &PlaceSnapConfig {
        &self.config
    }

    pub fn camera(&self) -> &Arc<CameraLifecycleController> {
        &self.camera
    }

    pub fn locator(&self) -> &Arc<LocationResolver> {
        &self.locator
    }

    /// The active capture session, once initialized
    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    pub fn host_signals(&self) -> HostSignals {
        *self.host.lock()
    }
}
