use super::*;
use crate::camera::{CameraBackend, Facing, HostSignals, Lens, SimulatedCamera};
use crate::config::PlaceSnapConfig;
use crate::error::PlaceSnapError;
use crate::events::{CheckinEvent, UserAction};
use crate::location::testing::ScriptedGeocoder;
use crate::location::{Coordinates, GeocodingProvider, PositionSource, SimulatedPositionSource};
use crate::permission::PermissionStatus;
use crate::session::{Phase, Privacy};
use crate::upload::{SimulatedUploadGateway, UploadGateway};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

struct TestApp {
    _dir: TempDir,
    camera: Arc<SimulatedCamera>,
    gateway: Arc<SimulatedUploadGateway>,
    app: PlaceSnapApp,
}

fn create_test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let camera = Arc::new(
        SimulatedCamera::new(dir.path(), Duration::ZERO)
            .with_device(Facing::Back, vec![Lens::Normal, Lens::Telephoto])
            .with_device(Facing::Front, vec![Lens::Normal])
            .with_permission(PermissionStatus::Granted),
    );
    let source: Arc<dyn PositionSource> = Arc::new(SimulatedPositionSource::new(Coordinates {
        latitude: 48.85837,
        longitude: 2.29448,
    }));
    let provider: Arc<dyn GeocodingProvider> =
        Arc::new(ScriptedGeocoder::new("Champ de Mars, 75007 Paris"));
    let gateway = Arc::new(SimulatedUploadGateway::new(Duration::ZERO));

    let app = PlaceSnapApp::with_components(
        PlaceSnapConfig::default(),
        Arc::clone(&camera) as Arc<dyn CameraBackend>,
        source,
        provider,
        Arc::clone(&gateway) as Arc<dyn UploadGateway>,
    );

    TestApp {
        _dir: dir,
        camera,
        gateway,
        app,
    }
}

fn dispatcher(app: &PlaceSnapApp) -> ActionDispatcher {
    ActionDispatcher::new(app.session().unwrap().clone(), Arc::clone(&app.host))
}

#[tokio::test]
async fn test_initialize_registers_components() {
    let mut t = create_test_app();
    assert!(t.app.session().is_none());
    assert!(t.app.component_states().await.is_empty());

    t.app.initialize().await.unwrap();

    assert!(t.app.session().is_some());
    let states = t.app.component_states().await;
    assert_eq!(states.len(), 3);
    assert_eq!(states.get("camera"), Some(&ComponentState::Stopped));
    assert!(!states.contains_key("keyboard"));
}

#[tokio::test]
async fn test_new_rejects_invalid_config() {
    let mut config = PlaceSnapConfig::default();
    config.system.event_bus_capacity = 0;

    let result = PlaceSnapApp::new(config);
    assert!(matches!(result, Err(PlaceSnapError::Config(_))));
}

#[tokio::test]
async fn test_start_requires_initialize() {
    let mut t = create_test_app();
    assert!(t.app.start().await.is_err());
}

#[tokio::test]
async fn test_start_brings_camera_live() {
    let mut t = create_test_app();
    t.app.initialize().await.unwrap();
    t.app.start().await.unwrap();

    assert!(t.app.camera().is_active());
    assert!(t.camera.is_bound());
    assert_eq!(
        t.app.component_state("camera").await,
        Some(ComponentState::Running)
    );
    assert_eq!(
        t.app.component_state("session").await,
        Some(ComponentState::Running)
    );
    assert!(t.app.failed_components().await.is_empty());
}

#[tokio::test]
async fn test_host_toggles_follow_driver() {
    let mut t = create_test_app();
    t.app.initialize().await.unwrap();
    t.app.start().await.unwrap();
    let dispatcher = dispatcher(&t.app);

    dispatcher
        .dispatch(UserAction::ToggleAppForeground)
        .await
        .unwrap();
    assert_eq!(t.app.host_signals(), HostSignals::new(true, false));
    assert!(!t.app.camera().is_active());
    assert!(!t.camera.is_bound());

    dispatcher
        .dispatch(UserAction::ToggleAppForeground)
        .await
        .unwrap();
    assert!(t.app.camera().is_active());

    dispatcher
        .dispatch(UserAction::ToggleScreenVisible)
        .await
        .unwrap();
    assert_eq!(t.app.host_signals(), HostSignals::new(false, true));
    assert!(!t.app.camera().is_active());
}

#[tokio::test]
async fn test_dispatch_capture_and_submit() {
    let mut t = create_test_app();
    t.app.initialize().await.unwrap();
    t.app.start().await.unwrap();
    t.app.locator().resolve().await;
    let dispatcher = dispatcher(&t.app);
    let session = t.app.session().unwrap().clone();

    // Nothing to submit yet
    assert!(dispatcher.dispatch(UserAction::Submit).await.is_err());

    dispatcher.dispatch(UserAction::Capture).await.unwrap();
    assert_eq!(session.phase(), Phase::Reviewing);

    dispatcher
        .dispatch(UserAction::EditDescription("Picnic".to_string()))
        .await
        .unwrap();
    dispatcher
        .dispatch(UserAction::SetPrivacy(Privacy::Public))
        .await
        .unwrap();
    dispatcher.dispatch(UserAction::Submit).await.unwrap();

    assert_eq!(session.phase(), Phase::Idle);
    assert!(session.photo().is_none());

    let calls = t.gateway.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].description, "Picnic");
    assert_eq!(calls[0].privacy, Privacy::Public);
    assert_eq!(calls[0].location.address, "Champ de Mars, 75007 Paris");
    assert!(!calls[0].photo_path.exists());
}

#[tokio::test]
async fn test_dispatch_cancel_discards_photo() {
    let mut t = create_test_app();
    t.app.initialize().await.unwrap();
    t.app.start().await.unwrap();
    let dispatcher = dispatcher(&t.app);
    let session = t.app.session().unwrap().clone();

    dispatcher.dispatch(UserAction::Capture).await.unwrap();
    let path = session.photo().unwrap().path().to_path_buf();
    assert!(path.exists());

    dispatcher.dispatch(UserAction::Cancel).await.unwrap();
    assert_eq!(session.phase(), Phase::Idle);
    assert!(!path.exists());
    assert!(t.app.camera().is_active());
}

#[tokio::test]
async fn test_run_scripted_posts_one_checkin() {
    let mut t = create_test_app();
    t.app.initialize().await.unwrap();
    t.app.start().await.unwrap();

    let exit_code = t.app.run_scripted().await.unwrap();

    assert_eq!(exit_code, 0);
    assert_eq!(t.gateway.call_count(), 1);
    assert_eq!(t.gateway.calls()[0].description, "Checked in with placesnap");
    assert!(t.app.session().is_none());
    assert!(!t.camera.is_bound());
}

#[tokio::test]
async fn test_run_scripted_reports_upload_failure() {
    let mut t = create_test_app();
    t.app.initialize().await.unwrap();
    t.app.start().await.unwrap();
    t.gateway.fail_next(crate::error::UploadError::Transport {
        details: "offline".to_string(),
    });

    let exit_code = t.app.run_scripted().await.unwrap();
    assert_eq!(exit_code, 1);
}

#[tokio::test]
async fn test_shutdown_releases_camera_and_photo() {
    let mut t = create_test_app();
    t.app.initialize().await.unwrap();
    t.app.start().await.unwrap();

    let session = t.app.session().unwrap().clone();
    session.capture().await.unwrap();
    let path = session.photo().unwrap().path().to_path_buf();
    drop(session);

    let exit_code = t.app.shutdown().await.unwrap();

    assert_eq!(exit_code, 0);
    assert!(!t.camera.is_bound());
    assert!(t.app.session().is_none());
    assert!(!path.exists());
    assert_eq!(
        t.app.component_state("camera").await,
        Some(ComponentState::Stopped)
    );
}

#[tokio::test]
async fn test_run_stops_on_shutdown_request() {
    let mut t = create_test_app();
    t.app.initialize().await.unwrap();
    t.app.start().await.unwrap();
    let event_bus = Arc::clone(t.app.event_bus());

    let mut app = t.app;
    let handle = tokio::spawn(async move { app.run().await });

    // The dispatcher subscribes once run() is underway; keep asking until it listens
    while !handle.is_finished() {
        let _ = event_bus.publish(CheckinEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: "test".to_string(),
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let exit_code = handle.await.unwrap().unwrap();
    assert_eq!(exit_code, 0);
    assert!(!t.camera.is_bound());
}

#[test]
fn test_shutdown_reason_types() {
    assert_eq!(
        ShutdownReason::Signal("SIGTERM".to_string()),
        ShutdownReason::Signal("SIGTERM".to_string())
    );
    assert_ne!(ShutdownReason::UserRequest, ShutdownReason::Completed);
    assert_eq!(
        ShutdownReason::Signal("SIGINT".to_string()).to_string(),
        "received SIGINT"
    );
}
