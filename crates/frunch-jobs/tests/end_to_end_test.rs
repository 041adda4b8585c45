//! Sync, geocode, and rotation wired over a real SQLite catalog.

use std::sync::Arc;
use std::time::Duration;

use frunch_core::defaults::SYNC_CURSOR_KEY;
use frunch_core::mock::{
    GeocodeOutcome, RecordingSink, ScriptedFileSource, ScriptedGeocoder, StaticImageResolver,
};
use frunch_core::{
    Address, CatalogRepository, ChangePage, ImageMediaMetadata, KeyValueRepository,
    MediaLocation, RemoteChange, RemoteFile,
};
use frunch_db::Database;
use frunch_jobs::{
    CatalogSynchronizer, GeocodeConfig, GeocodeWorker, PictureScheduler, RotationConfig,
    SyncConfig,
};

fn file(id: &str, mime: &str) -> RemoteFile {
    RemoteFile {
        id: id.to_string(),
        mime_type: Some(mime.to_string()),
        file_extension: Some("jpg".to_string()),
        created_time: Some("2024-01-01T00:00:00Z".to_string()),
        ..Default::default()
    }
}

fn synchronizer(
    db: &Database,
    source: &ScriptedFileSource,
    worker: &GeocodeWorker,
) -> CatalogSynchronizer {
    CatalogSynchronizer::new(
        Arc::new(source.clone()),
        db.catalog(),
        db.key_values(),
        worker.trigger(),
        SyncConfig::default(),
    )
}

fn idle_worker(db: &Database) -> GeocodeWorker {
    GeocodeWorker::new(
        db.catalog(),
        Arc::new(ScriptedGeocoder::new(GeocodeOutcome::NoData)),
        GeocodeConfig::default(),
    )
}

#[tokio::test]
async fn test_full_listing_into_empty_catalog() {
    let db = Database::connect_in_memory().await.unwrap();
    let source = ScriptedFileSource::new()
        .with_listing(vec![vec![
            file("a", "image/jpeg"),
            file("b", "image/png"),
            file("notes", "text/plain"),
            file("c", "image/heic"),
        ]])
        .with_start_cursor("start-77");

    synchronizer(&db, &source, &idle_worker(&db)).sync().await.unwrap();

    assert_eq!(db.pictures.count().await.unwrap(), 3);
    assert!(db.pictures.get("notes").await.unwrap().is_none());
    assert_eq!(
        db.key_value.get(SYNC_CURSOR_KEY).await.unwrap().as_deref(),
        Some("start-77")
    );
}

#[tokio::test]
async fn test_incremental_removal_against_sqlite() {
    let db = Database::connect_in_memory().await.unwrap();
    db.key_value.set(SYNC_CURSOR_KEY, "c1").await.unwrap();
    let source = ScriptedFileSource::new().with_changes(
        "c1",
        ChangePage {
            changes: vec![RemoteChange {
                change_type: Some("file".to_string()),
                file_id: Some("known".to_string()),
                removed: true,
                ..Default::default()
            }],
            new_start_page_token: Some("c2".to_string()),
            ..Default::default()
        },
    );
    let sync = synchronizer(&db, &source, &idle_worker(&db));
    sync.add_file(&file("known", "image/jpeg")).await.unwrap();

    sync.sync().await.unwrap();

    assert!(db.pictures.get("known").await.unwrap().is_none());
    assert_eq!(
        db.key_value.get(SYNC_CURSOR_KEY).await.unwrap().as_deref(),
        Some("c2")
    );
}

#[tokio::test]
async fn test_synced_location_is_geocoded_then_displayed() {
    let db = Database::connect_in_memory().await.unwrap();
    let mut photo = file("trip", "image/jpeg");
    photo.image_media_metadata = Some(ImageMediaMetadata {
        location: Some(MediaLocation {
            latitude: Some(35.68),
            longitude: Some(139.69),
        }),
        time: None,
    });
    let source = ScriptedFileSource::new()
        .with_listing(vec![vec![photo]])
        .with_start_cursor("s");
    let geocoder = ScriptedGeocoder::new(GeocodeOutcome::Found(Address {
        city: Some("Tokyo".to_string()),
        region: Some("Tokyo".to_string()),
        country: Some("Japan".to_string()),
        country_code: Some("jp".to_string()),
    }));
    let worker = GeocodeWorker::new(
        db.catalog(),
        Arc::new(geocoder),
        GeocodeConfig::default().with_interval(Duration::from_millis(10)),
    );
    let trigger = worker.trigger();

    synchronizer(&db, &source, &worker).sync().await.unwrap();
    assert!(trigger.is_active());
    assert!(db.pictures.find_pending_geocode().await.unwrap().is_some());

    let handle = worker.start();
    let stored = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let record = db.pictures.get("trip").await.unwrap().unwrap();
            if !record.has_pending_geocode() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("location resolved");
    assert_eq!(stored.location.as_deref(), Some("Tokyo, Japan"));

    let sink = RecordingSink::new();
    let scheduler = PictureScheduler::new(
        db.catalog(),
        Arc::new(StaticImageResolver::new()),
        Arc::new(sink.clone()),
        trigger,
        RotationConfig::default(),
    )
    .unwrap();
    let picture = scheduler.next_picture().await.unwrap();
    scheduler.set_picture(picture).await;

    let published = sink.published();
    let shown = &published[0];
    assert_eq!(shown.id, "trip");
    assert_eq!(shown.location.as_deref(), Some("Tokyo, Japan"));
    assert_eq!(shown.path, "/images/trip.jpg");

    handle.stop().await.unwrap();
}
