use super::*;
use crate::camera::Facing;
use crate::config::PlaceSnapConfig;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_payload(dir: &TempDir) -> CheckinPayload {
    let photo_path = dir.path().join("shot.jpg");
    std::fs::write(&photo_path, b"synthetic-jpeg").unwrap();
    CheckinPayload {
        photo: Arc::new(PhotoHandle::new(photo_path, Facing::Back)),
        description: "Cà phê sữa đá".to_string(),
        location: CheckinLocation {
            latitude: 10.7769,
            longitude: 106.7009,
            address: "Quận 1, Hồ Chí Minh".to_string(),
        },
        privacy: Privacy::Public,
    }
}

fn create_http_gateway(server: &MockServer, token: Option<&str>) -> HttpUploadGateway {
    HttpUploadGateway::new(
        &format!("{}/checkins", server.uri()),
        token.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_http_upload_posts_multipart_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checkins"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_string_contains("filename=\"checkin.jpg\""))
        .and(body_string_contains("image/jpeg"))
        .and(body_string_contains("name=\"privacy\""))
        .and(body_string_contains("public"))
        .and(body_string_contains("name=\"latitude\""))
        .and(body_string_contains("10.7769"))
        .and(body_string_contains("Quận 1, Hồ Chí Minh"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "ck_42" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let gateway = create_http_gateway(&server, Some("secret-token"));

    let id = gateway.submit_checkin(&create_payload(&dir)).await.unwrap();
    assert_eq!(id, CheckinId("ck_42".to_string()));
}

#[tokio::test]
async fn test_http_upload_accepts_numeric_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1234 })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let gateway = create_http_gateway(&server, None);

    let id = gateway.submit_checkin(&create_payload(&dir)).await.unwrap();
    assert_eq!(id.as_str(), "1234");
}

#[tokio::test]
async fn test_http_upload_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("description too long"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let gateway = create_http_gateway(&server, None);

    match gateway.submit_checkin(&create_payload(&dir)).await {
        Err(UploadError::Rejected { status, body }) => {
            assert_eq!(status, 422);
            assert_eq!(body, "description too long");
        }
        other => panic!("Unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_http_upload_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let gateway = create_http_gateway(&server, None);

    assert!(matches!(
        gateway.submit_checkin(&create_payload(&dir)).await,
        Err(UploadError::InvalidResponse { .. })
    ));
}

#[tokio::test]
async fn test_http_upload_missing_photo_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let payload = create_payload(&dir);
    std::fs::remove_file(payload.photo.path()).unwrap();
    let gateway = create_http_gateway(&server, None);

    match gateway.submit_checkin(&payload).await {
        Err(UploadError::PhotoUnreadable {
            path: photo_path,
            source,
        }) => {
            assert_eq!(photo_path.as_path(), payload.photo.path());
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("Unexpected result: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_simulated_upload_waits_then_accepts() {
    let dir = TempDir::new().unwrap();
    let gateway = SimulatedUploadGateway::new(Duration::from_millis(2000));
    let started = tokio::time::Instant::now();

    let id = gateway.submit_checkin(&create_payload(&dir)).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert!(id.as_str().starts_with("checkin_"));
    assert_eq!(gateway.call_count(), 1);

    let recorded = &gateway.calls()[0];
    assert_eq!(recorded.privacy, Privacy::Public);
    assert_eq!(recorded.description, "Cà phê sữa đá");
    assert_eq!(recorded.location.address, "Quận 1, Hồ Chí Minh");
}

#[tokio::test]
async fn test_simulated_upload_injected_failure() {
    let dir = TempDir::new().unwrap();
    let gateway = SimulatedUploadGateway::new(Duration::ZERO);
    gateway.fail_next(UploadError::Transport {
        details: "offline".to_string(),
    });

    let payload = create_payload(&dir);
    assert!(gateway.submit_checkin(&payload).await.is_err());
    assert!(gateway.submit_checkin(&payload).await.is_ok());
    assert_eq!(gateway.call_count(), 2);
}

#[tokio::test]
async fn test_simulated_upload_does_not_retain_photo() {
    let dir = TempDir::new().unwrap();
    let gateway = SimulatedUploadGateway::new(Duration::ZERO);
    let payload = create_payload(&dir);
    let photo_path = payload.photo.path().to_path_buf();

    gateway.submit_checkin(&payload).await.unwrap();
    drop(payload);

    assert!(!photo_path.exists());
    assert_eq!(gateway.calls()[0].photo_path, photo_path);
}

#[tokio::test]
async fn test_simulated_upload_history_is_bounded() {
    let dir = TempDir::new().unwrap();
    let gateway = SimulatedUploadGateway::new(Duration::ZERO);
    let mut payload = create_payload(&dir);

    for n in 0..RECORDED_CALLS + 8 {
        payload.description = format!("visit {}", n);
        gateway.submit_checkin(&payload).await.unwrap();
    }

    assert_eq!(gateway.call_count(), RECORDED_CALLS + 8);
    let calls = gateway.calls();
    assert_eq!(calls.len(), RECORDED_CALLS);
    assert_eq!(calls[0].description, "visit 8");
    assert_eq!(
        calls[RECORDED_CALLS - 1].description,
        format!("visit {}", RECORDED_CALLS + 7)
    );
}

#[test]
fn test_gateway_from_config() {
    let mut config = PlaceSnapConfig::default().upload;
    assert!(gateway_from_config(&config).is_ok());

    config.endpoint = Some("https://api.example.com/checkins".to_string());
    config.auth_token = Some("token".to_string());
    assert!(gateway_from_config(&config).is_ok());
}
