//! Integration tests for the scan workflow over real HTTP.
//!
//! Wires `ScanWorkflow` to `PredictionClient` and a local mock server,
//! with files on disk, a fixed location provider and a history snapshot.

mod mock_server;

use blight_scan_lib::api::PredictionClient;
use blight_scan_lib::config::ApiConfig;
use blight_scan_lib::error::{ScanError, ValidationError};
use blight_scan_lib::history::ScanHistoryStore;
use blight_scan_lib::location::{LocationEnricher, LocationStatus, StaticLocationProvider};
use blight_scan_lib::monitor::{run_monitor, MonitorOptions};
use blight_scan_lib::source::{DirectorySource, FileSource, ImageSource};
use blight_scan_lib::workflow::{NotificationKind, ScanState, ScanWorkflow};
use mock_server::MockServer;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn client(url: &str) -> Arc<PredictionClient> {
    Arc::new(PredictionClient::new(ApiConfig::new(url).unwrap()).unwrap())
}

fn write_png(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([90, 140, 60]));
    img.save(path).unwrap();
}

#[tokio::test]
async fn oversized_file_is_rejected_without_network() {
    let server = MockServer::start(vec![]).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.jpg");
    std::fs::write(&path, vec![0u8; 6_000_000]).unwrap();

    let selection = FileSource::new(&path).pick().await.unwrap().unwrap();
    let mut workflow = ScanWorkflow::new(client(&server.url()));
    let err = workflow.accept(selection).await.err().unwrap();

    assert!(matches!(
        err,
        ScanError::Validation(ValidationError::TooLarge { .. })
    ));
    assert_eq!(err.message(), "File size should not exceed 5MB");
    assert_eq!(workflow.state(), &ScanState::Idle);
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn unsupported_type_is_rejected_without_network() {
    let server = MockServer::start(vec![]).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leaf.gif");
    std::fs::write(&path, b"GIF89a").unwrap();

    let selection = FileSource::new(&path).pick().await.unwrap().unwrap();
    let mut workflow = ScanWorkflow::new(client(&server.url()));
    workflow.submit(selection).await;

    let notes = workflow.take_notifications();
    assert_eq!(notes[0].kind, NotificationKind::Error);
    assert_eq!(
        notes[0].message,
        "Please upload a valid image file (JPG, JPEG, or PNG)"
    );
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn geotagged_scan_is_recorded_and_persisted() {
    let server = MockServer::start(vec![(
        200,
        r#"{"class":"Late Blight","confidence":0.85}"#,
    )])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("leaf.png");
    write_png(&image_path, 64, 64);
    let snapshot = dir.path().join("state").join("scans.json");

    let store = Arc::new(ScanHistoryStore::new());
    let provider = StaticLocationProvider::new(-1.286389, 36.817223, Some(12.0)).unwrap();
    let mut workflow = ScanWorkflow::new(client(&server.url()))
        .with_location(LocationEnricher::new(
            Arc::new(provider),
            Duration::from_secs(5),
        ))
        .with_history(Arc::clone(&store));

    let selection = FileSource::new(&image_path).pick().await.unwrap().unwrap();
    let state = workflow.submit(selection).await.clone();
    assert!(matches!(state, ScanState::Displaying(_)));
    assert!(matches!(
        workflow.location_status(),
        LocationStatus::Acquired(_)
    ));

    let record = &store.list()[0];
    assert_eq!(record.disease, "Late Blight");
    assert_eq!(record.confidence, "85.00");
    assert!(record.image_uri.ends_with("leaf.png"));
    assert_eq!(record.location.unwrap().latitude, -1.286389);

    store.save_json(&snapshot).unwrap();
    let restored = ScanHistoryStore::load_json(&snapshot).unwrap();
    assert_eq!(restored.list(), store.list());
}

#[tokio::test]
async fn server_error_then_retry_succeeds() {
    let server = MockServer::start(vec![
        (500, "boom"),
        (200, r#"{"class":"Healthy","confidence":0.97}"#),
    ])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("leaf.png");
    write_png(&image_path, 32, 32);

    let mut workflow = ScanWorkflow::new(client(&server.url()));
    let selection = FileSource::new(&image_path).pick().await.unwrap().unwrap();
    workflow.submit(selection).await;
    assert_eq!(
        workflow.state(),
        &ScanState::ErrorDisplayed(ScanError::server(
            500,
            "An error occurred while processing the image"
        ))
    );
    assert!(workflow.can_retry());

    workflow.retry_now().await;
    assert!(matches!(workflow.state(), ScanState::Displaying(_)));

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    let file_bytes = std::fs::read(&image_path).unwrap();
    assert!(requests
        .iter()
        .all(|r| r.part("file").unwrap().bytes == file_bytes));
}

#[tokio::test]
async fn monitor_scans_directory_and_downscales() {
    let server = MockServer::start(vec![
        (200, r#"{"class":"Early Blight","confidence":0.66}"#),
        (200, r#"{"class":"Healthy","confidence":0.88}"#),
    ])
    .await;
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("frame_1.png"), 2048, 1024);
    write_png(&dir.path().join("frame_2.png"), 64, 64);

    let store = Arc::new(ScanHistoryStore::new());
    let mut workflow =
        ScanWorkflow::new(client(&server.url())).with_history(Arc::clone(&store));
    let source = DirectorySource::new(dir.path());
    let options = MonitorOptions {
        interval: Duration::from_millis(5),
        error_backoff: Duration::from_millis(5),
        max_cycles: Some(3),
        max_dimension: Some(1024),
    };

    let report = run_monitor(&source, &mut workflow, &options, std::future::pending()).await;
    assert_eq!(report.cycles, 3);
    assert_eq!(report.scanned, 2);
    assert_eq!(report.idle, 1);
    assert_eq!(store.len(), 2);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    // The large frame goes up re-encoded as JPEG, the small one untouched.
    let files: Vec<_> = requests.iter().map(|r| r.part("file").unwrap()).collect();
    assert!(files.iter().any(|f| {
        f.content_type.as_deref() == Some("image/jpeg")
            && f.file_name.as_deref() == Some("frame_1.jpg")
            && image::load_from_memory(&f.bytes).unwrap().width() == 1024
    }));
    assert!(files.iter().any(|f| {
        f.content_type.as_deref() == Some("image/png")
            && f.file_name.as_deref() == Some("frame_2.png")
    }));
}
