use super::*;
use crate::camera::{
    CameraBackend, CameraLifecycleController, Facing, HostSignals, Lens, LifecycleState,
    SimulatedCamera,
};
use crate::error::{CameraError, SessionError, UploadError};
use crate::events::{CheckinEvent, EventBus};
use crate::location::testing::ScriptedGeocoder;
use crate::location::{
    Coordinates, GeocodingProvider, LocationResolver, PositionSource, SimulatedPositionSource,
};
use crate::permission::PermissionStatus;
use crate::upload::{CheckinId, SimulatedUploadGateway, UploadGateway};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const OPERA_HOUSE: Coordinates = Coordinates {
    latitude: 10.7765,
    longitude: 106.7031,
};

struct Harness {
    _dir: TempDir,
    camera: Arc<SimulatedCamera>,
    controller: Arc<CameraLifecycleController>,
    source: Arc<SimulatedPositionSource>,
    locator: Arc<LocationResolver>,
    gateway: Arc<SimulatedUploadGateway>,
    event_bus: Arc<EventBus>,
    session: CaptureSession,
}

fn create_harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let event_bus = Arc::new(EventBus::new(64));
    let camera = Arc::new(
        SimulatedCamera::new(dir.path(), Duration::ZERO)
            .with_device(Facing::Back, vec![Lens::Normal, Lens::UltraWide])
            .with_device(Facing::Front, vec![Lens::Normal])
            .with_permission(PermissionStatus::Granted),
    );
    let controller = Arc::new(CameraLifecycleController::new(
        Arc::clone(&camera) as Arc<dyn CameraBackend>,
        Facing::Back,
        Arc::clone(&event_bus),
    ));
    let source = Arc::new(SimulatedPositionSource::new(OPERA_HOUSE));
    let geocoder: Arc<dyn GeocodingProvider> =
        Arc::new(ScriptedGeocoder::new("7 Công Trường Lam Sơn, Quận 1"));
    let locator = Arc::new(LocationResolver::new(
        Arc::clone(&source) as Arc<dyn PositionSource>,
        geocoder,
        Arc::clone(&event_bus),
    ));
    let gateway = Arc::new(SimulatedUploadGateway::new(Duration::ZERO));

    let session = CaptureSession::new(
        SessionDefaults::default(),
        Arc::clone(&controller),
        Arc::clone(&locator),
        Arc::clone(&gateway) as Arc<dyn UploadGateway>,
        Arc::clone(&event_bus),
    )
    .unwrap();

    Harness {
        _dir: dir,
        camera,
        controller,
        source,
        locator,
        gateway,
        event_bus,
        session,
    }
}

/// Camera live and a resolved location, without racing the background query
async fn ready(h: &Harness) {
    h.session.set_host_signals(HostSignals::default()).await;
    h.locator.resolve().await;
    assert!(h.controller.is_active());
}

async fn wait_until_capturing(controller: &CameraLifecycleController) {
    while !controller.is_capturing() {
        tokio::task::yield_now().await;
    }
}

#[test]
fn test_truncate_description_counts_characters() {
    let long: String = "ữ".repeat(150);
    let truncated = truncate_description(&long);

    assert_eq!(truncated.chars().count(), MAX_DESCRIPTION_CHARS);
    assert_eq!(truncate_description("short"), "short");
}

#[test]
fn test_privacy_cycle() {
    assert_eq!(Privacy::Friends.next(), Privacy::Public);
    assert_eq!(Privacy::Public.next(), Privacy::Private);
    assert_eq!(Privacy::Private.next(), Privacy::Friends);
}

#[tokio::test]
async fn test_start_activates_default_facing() {
    let h = create_harness();
    h.controller.switch_facing(Facing::Front).await;

    let status = h.session.start().await;

    assert!(status.is_active());
    assert_eq!(status.device.facing, Facing::Back);
    assert_eq!(h.session.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_backgrounding_while_camera_binds() {
    let h = create_harness();
    let release = h.camera.hold_next_bind();

    let starting = tokio::spawn({
        let session = h.session.clone();
        async move { session.start().await }
    });
    while h.controller.status().lifecycle != LifecycleState::Binding {
        tokio::task::yield_now().await;
    }

    let status = h
        .session
        .set_host_signals(HostSignals::new(true, false))
        .await;
    assert!(!status.is_active());

    release.send(()).unwrap();
    starting.await.unwrap();

    assert!(!h.controller.is_active());
    assert!(!h.camera.is_bound());
}

#[tokio::test]
async fn test_capture_moves_to_review_and_pauses_camera() {
    let h = create_harness();
    ready(&h).await;
    let mut events = h.event_bus.subscribe();

    h.session.capture().await.unwrap();

    assert_eq!(h.session.phase(), Phase::Reviewing);
    let photo = h.session.photo().unwrap();
    assert!(photo.path().exists());
    assert!(!h.controller.is_active());

    let mut phases = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CheckinEvent::PhaseChanged { to, .. } = event {
            phases.push(to);
        }
    }
    assert_eq!(phases, vec![Phase::CameraLive, Phase::Reviewing]);
}

#[tokio::test]
async fn test_capture_outside_idle_is_rejected() {
    let h = create_harness();
    ready(&h).await;
    h.session.capture().await.unwrap();

    assert_eq!(
        h.session.capture().await.unwrap_err(),
        SessionError::InvalidAction {
            action: "capture",
            phase: Phase::Reviewing
        }
    );
}

#[tokio::test]
async fn test_capture_while_capturing_is_rejected() {
    let h = create_harness();
    ready(&h).await;

    let release = h.camera.hold_next_capture();
    let pending = tokio::spawn({
        let session = h.session.clone();
        async move { session.capture().await }
    });
    wait_until_capturing(&h.controller).await;
    assert_eq!(h.session.phase(), Phase::CameraLive);

    assert_eq!(
        h.session.capture().await.unwrap_err(),
        SessionError::Camera(CameraError::AlreadyCapturing)
    );

    release.send(()).unwrap();
    pending.await.unwrap().unwrap();
    assert_eq!(h.session.phase(), Phase::Reviewing);
}

#[tokio::test]
async fn test_capture_failure_returns_to_idle() {
    let h = create_harness();
    ready(&h).await;

    h.camera.fail_next_capture("sensor glitch");
    let result = h.session.capture().await;

    assert!(matches!(
        result,
        Err(SessionError::Camera(CameraError::CaptureFailed { .. }))
    ));
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(h.session.photo().is_none());
    assert!(h.controller.is_active());

    h.session.capture().await.unwrap();
    assert_eq!(h.session.phase(), Phase::Reviewing);
}

#[tokio::test]
async fn test_backgrounding_mid_capture_discards_photo() {
    let h = create_harness();
    ready(&h).await;

    let release = h.camera.hold_next_capture();
    let pending = tokio::spawn({
        let session = h.session.clone();
        async move { session.capture().await }
    });
    wait_until_capturing(&h.controller).await;

    let status = h
        .session
        .set_host_signals(HostSignals::new(true, false))
        .await;
    assert!(!status.is_active());

    release.send(()).unwrap();
    let result = pending.await.unwrap();

    assert_eq!(
        result.unwrap_err(),
        SessionError::Camera(CameraError::CaptureDiscarded)
    );
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(h.session.photo().is_none());
    assert_eq!(std::fs::read_dir(h.camera.capture_dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_foreground_during_review_keeps_camera_off() {
    let h = create_harness();
    ready(&h).await;
    h.session.capture().await.unwrap();

    h.session
        .set_host_signals(HostSignals::new(true, false))
        .await;
    let status = h.session.set_host_signals(HostSignals::default()).await;

    assert!(!status.is_active());
    assert_eq!(h.session.phase(), Phase::Reviewing);

    h.session.cancel().await.unwrap();
    assert!(h.controller.is_active());
}

#[tokio::test]
async fn test_submit_outside_review_is_incomplete() {
    let h = create_harness();
    ready(&h).await;

    assert_eq!(
        h.session.submit().unwrap_err(),
        SessionError::IncompleteSession
    );
    assert_eq!(h.session.phase(), Phase::Idle);
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn test_submit_without_coordinates_is_incomplete() {
    let h = create_harness();
    h.source.set_permission(PermissionStatus::Denied);
    ready(&h).await;
    h.session.capture().await.unwrap();

    assert!(h.locator.coordinates().is_none());
    assert!(!h.session.snapshot().can_submit());
    assert_eq!(
        h.session.submit().unwrap_err(),
        SessionError::IncompleteSession
    );
    assert_eq!(h.session.phase(), Phase::Reviewing);
    assert!(h.session.photo().is_some());
    assert_eq!(h.gateway.call_count(), 0);

    // Retry after granting location access
    h.source.set_permission(PermissionStatus::Granted);
    h.locator.resolve().await;
    assert!(h.session.snapshot().can_submit());
}

#[tokio::test]
async fn test_double_submit_invokes_gateway_once() {
    let h = create_harness();
    ready(&h).await;
    h.session.capture().await.unwrap();

    let release = h.gateway.hold_next();
    let ticket = h.session.submit().unwrap();
    assert_eq!(h.session.phase(), Phase::Uploading);

    assert_eq!(
        h.session.submit().unwrap_err(),
        SessionError::UploadInProgress
    );

    release
        .send(Ok(CheckinId("checkin_1".to_string())))
        .unwrap();
    assert_eq!(ticket.outcome().await.unwrap().as_str(), "checkin_1");
    assert_eq!(h.gateway.call_count(), 1);
}

#[tokio::test]
async fn test_cancel_releases_photo() {
    let h = create_harness();
    ready(&h).await;
    h.session.capture().await.unwrap();
    h.session.edit_description("draft").unwrap();
    h.session.set_privacy(Privacy::Private).unwrap();
    let path = h.session.photo().unwrap().path().to_path_buf();

    h.session.cancel().await.unwrap();

    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(h.session.photo().is_none());
    assert!(!path.exists());
    assert_eq!(h.session.description(), "");
    assert_eq!(h.session.privacy(), Privacy::Private);
    assert!(h.controller.is_active());
}

#[tokio::test]
async fn test_cancel_outside_review_is_rejected() {
    let h = create_harness();

    assert_eq!(
        h.session.cancel().await.unwrap_err(),
        SessionError::InvalidAction {
            action: "cancel",
            phase: Phase::Idle
        }
    );
}

#[tokio::test]
async fn test_description_editable_only_in_review() {
    let h = create_harness();
    ready(&h).await;

    assert!(h.session.edit_description("too early").is_err());

    h.session.capture().await.unwrap();
    let stored = h.session.edit_description(&"a".repeat(200)).unwrap();
    assert_eq!(stored.len(), MAX_DESCRIPTION_CHARS);
    assert_eq!(h.session.description(), stored);
}

#[tokio::test]
async fn test_privacy_locked_while_uploading() {
    let h = create_harness();
    ready(&h).await;

    assert_eq!(h.session.cycle_privacy().unwrap(), Privacy::Public);
    h.session.capture().await.unwrap();

    let release = h.gateway.hold_next();
    let ticket = h.session.submit().unwrap();

    assert!(matches!(
        h.session.set_privacy(Privacy::Private),
        Err(SessionError::InvalidAction { .. })
    ));
    assert_eq!(h.session.privacy(), Privacy::Public);

    drop(release);
    assert!(ticket.outcome().await.is_err());
    assert_eq!(h.session.set_privacy(Privacy::Private).unwrap(), Privacy::Private);
}

#[tokio::test]
async fn test_checkin_success_end_to_end() {
    let h = create_harness();
    let mut events = h.event_bus.subscribe();
    h.session.start().await;
    h.locator.resolve().await;

    h.session.capture().await.unwrap();
    h.session.edit_description("Bánh mì ngon").unwrap();
    h.session.set_privacy(Privacy::Public).unwrap();
    let path = h.session.photo().unwrap().path().to_path_buf();

    let ticket = h.session.submit().unwrap();
    assert_eq!(ticket.attempt(), 1);
    let id = ticket.outcome().await.unwrap();

    assert!(id.as_str().starts_with("checkin_"));
    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(h.session.photo().is_none());
    assert!(!path.exists());
    assert_eq!(h.session.description(), "");
    assert_eq!(h.session.privacy(), Privacy::Friends);
    assert_eq!(h.session.last_outcome(), Some(UploadOutcome::Succeeded(id.clone())));
    assert!(h.controller.is_active());

    let recorded = &h.gateway.calls()[0];
    assert_eq!(recorded.description, "Bánh mì ngon");
    assert_eq!(recorded.privacy, Privacy::Public);
    assert_eq!(recorded.location.latitude, OPERA_HOUSE.latitude);
    assert_eq!(recorded.location.address, "7 Công Trường Lam Sơn, Quận 1");

    let mut uploaded = None;
    while let Ok(event) = events.try_recv() {
        if let CheckinEvent::CheckinUploaded { checkin_id, .. } = event {
            uploaded = Some(checkin_id);
        }
    }
    assert_eq!(uploaded, Some(id.to_string()));
}

#[tokio::test]
async fn test_checkin_failure_then_retry() {
    let h = create_harness();
    ready(&h).await;
    h.session.capture().await.unwrap();
    h.session.edit_description("Phở").unwrap();
    h.session.set_privacy(Privacy::Private).unwrap();
    let path = h.session.photo().unwrap().path().to_path_buf();

    h.gateway.fail_next(UploadError::Rejected {
        status: 503,
        body: "maintenance".to_string(),
    });
    let first = h.session.submit().unwrap();
    assert!(first.outcome().await.is_err());

    assert_eq!(h.session.phase(), Phase::Reviewing);
    assert!(path.exists());
    assert_eq!(h.session.description(), "Phở");
    assert_eq!(h.session.privacy(), Privacy::Private);
    assert!(matches!(
        h.session.last_outcome(),
        Some(UploadOutcome::Failed(_))
    ));
    assert!(!h.controller.is_active());

    let second = h.session.submit().unwrap();
    assert_eq!(second.attempt(), 2);
    second.outcome().await.unwrap();

    assert_eq!(h.session.phase(), Phase::Idle);
    assert!(!path.exists());
    assert_eq!(h.gateway.call_count(), 2);
    assert_eq!(h.session.snapshot().upload_attempts, 2);
}

#[tokio::test]
async fn test_upload_outlives_dropped_session() {
    let h = create_harness();
    ready(&h).await;
    h.session.capture().await.unwrap();
    let path = h.session.photo().unwrap().path().to_path_buf();

    let release = h.gateway.hold_next();
    let ticket = h.session.submit().unwrap();
    let Harness {
        session,
        controller,
        gateway,
        _dir,
        ..
    } = h;
    drop(session);

    assert!(path.exists());
    release
        .send(Ok(CheckinId("checkin_late".to_string())))
        .unwrap();

    assert_eq!(ticket.outcome().await.unwrap().as_str(), "checkin_late");
    assert_eq!(gateway.call_count(), 1);
    assert!(!path.exists());
    assert!(controller.claim_session());
}

#[tokio::test]
async fn test_one_session_per_camera() {
    let h = create_harness();

    let second = CaptureSession::new(
        SessionDefaults::default(),
        Arc::clone(&h.controller),
        Arc::clone(&h.locator),
        Arc::clone(&h.gateway) as Arc<dyn UploadGateway>,
        Arc::clone(&h.event_bus),
    );
    assert!(matches!(second, Err(SessionError::SessionActive)));

    let Harness {
        session,
        controller,
        locator,
        gateway,
        event_bus,
        _dir,
        ..
    } = h;
    drop(session);

    assert!(CaptureSession::new(
        SessionDefaults::default(),
        controller,
        locator,
        gateway as Arc<dyn UploadGateway>,
        event_bus,
    )
    .is_ok());
}

#[tokio::test]
async fn test_abandoned_session_deletes_photo() {
    let h = create_harness();
    ready(&h).await;
    h.session.capture().await.unwrap();
    let path = h.session.photo().unwrap().path().to_path_buf();

    let Harness { session, _dir, .. } = h;
    drop(session);

    assert!(!path.exists());
}

#[tokio::test]
async fn test_location_refresh_independent_of_phase() {
    let h = create_harness();
    ready(&h).await;
    h.session.capture().await.unwrap();

    h.source.set_position(Coordinates::new(10.7721, 106.6983));
    let query = h.session.refresh_location().await.unwrap();

    assert!(!query.superseded);
    assert_eq!(h.session.phase(), Phase::Reviewing);
    let snapshot = h.session.snapshot();
    assert_eq!(
        snapshot.location.coordinates,
        Some(Coordinates::new(10.7721, 106.6983))
    );
    assert!(snapshot.can_submit());
}

#[tokio::test]
async fn test_switch_facing_rejected_mid_capture() {
    let h = create_harness();
    ready(&h).await;

    let status = h.session.switch_facing().await.unwrap();
    assert_eq!(status.device.facing, Facing::Front);
    assert!(status.is_active());

    let release = h.camera.hold_next_capture();
    let pending = tokio::spawn({
        let session = h.session.clone();
        async move { session.capture().await }
    });
    wait_until_capturing(&h.controller).await;

    assert!(matches!(
        h.session.switch_facing().await,
        Err(SessionError::InvalidAction { .. })
    ));

    release.send(()).unwrap();
    pending.await.unwrap().unwrap();
    assert_eq!(h.session.photo().unwrap().facing(), Facing::Front);
}
