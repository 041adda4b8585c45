//! Rotation tick and loop tests on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use frunch_core::mock::{MemoryCatalog, RecordingSink, StaticImageResolver};
use frunch_core::PictureRecord;
use frunch_jobs::{
    start_rotation, tick, GeocodeTrigger, PictureScheduler, RotationConfig, TickOutcome,
};

const DWELL: Duration = Duration::from_secs(20);
const LIMIT: Duration = Duration::from_secs(60);

fn records(count: usize) -> Vec<PictureRecord> {
    (0..count)
        .map(|i| PictureRecord {
            id: format!("p{}", i),
            extension: Some("jpg".to_string()),
            author: None,
            added_at: 1_700_000_000 + i as i64,
            taken_at: None,
            location: None,
        })
        .collect()
}

fn scheduler(
    count: usize,
    resolver: StaticImageResolver,
    sink: &RecordingSink,
) -> Arc<PictureScheduler> {
    let config = RotationConfig::default()
        .with_interval(DWELL)
        .with_timeout(LIMIT);
    Arc::new(
        PictureScheduler::new(
            Arc::new(MemoryCatalog::new().with_records(records(count))),
            Arc::new(resolver),
            Arc::new(sink.clone()),
            GeocodeTrigger::new(),
            config,
        )
        .unwrap()
        .with_seed(4),
    )
}

#[tokio::test(start_paused = true)]
async fn test_tick_waits_for_dwell_then_publishes() {
    let sink = RecordingSink::new();
    let s = scheduler(3, StaticImageResolver::new(), &sink);

    let start = Instant::now();
    let outcome = tick(&s, DWELL, LIMIT).await;

    assert!(start.elapsed() >= DWELL);
    assert!(matches!(outcome, TickOutcome::Published(_)));
    assert_eq!(sink.published().len(), 1);
    assert!(s.current().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_slow_selection_extends_tick_up_to_timeout() {
    let sink = RecordingSink::new();
    let s = scheduler(3, StaticImageResolver::new().with_delay(Duration::from_secs(45)), &sink);

    let start = Instant::now();
    let outcome = tick(&s, DWELL, LIMIT).await;

    assert!(matches!(outcome, TickOutcome::Published(_)));
    assert!(start.elapsed() >= Duration::from_secs(45));
    assert!(start.elapsed() < LIMIT);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_selection_is_discarded() {
    let sink = RecordingSink::new();
    let s = scheduler(3, StaticImageResolver::new().with_delay(Duration::from_secs(90)), &sink);

    let start = Instant::now();
    let outcome = tick(&s, DWELL, LIMIT).await;

    assert_eq!(outcome, TickOutcome::TimedOut);
    assert!(start.elapsed() >= LIMIT);
    assert!(start.elapsed() < LIMIT + Duration::from_secs(1));

    // Let the abandoned selection finish: its result must never surface.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(sink.published().is_empty());
    assert!(s.current().await.is_none());
    assert!(s.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_catalog_skips_tick() {
    let sink = RecordingSink::new();
    let s = scheduler(0, StaticImageResolver::new(), &sink);

    let start = Instant::now();
    assert_eq!(tick(&s, DWELL, LIMIT).await, TickOutcome::Empty);
    assert!(start.elapsed() >= DWELL);
    assert!(sink.published().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_loop_publishes_immediately_then_every_interval() {
    let sink = RecordingSink::new();
    let s = scheduler(12, StaticImageResolver::new(), &sink);
    let handle = start_rotation(s.clone());

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(sink.published().len(), 1);

    tokio::time::sleep(DWELL).await;
    assert_eq!(sink.published().len(), 2);

    tokio::time::sleep(DWELL * 3).await;
    assert_eq!(sink.published().len(), 5);

    let ids: Vec<String> = sink.published().into_iter().map(|p| p.id).collect();
    let mut distinct = ids.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), ids.len());

    handle.stop().await.unwrap();
    tokio::time::sleep(DWELL * 2).await;
    assert_eq!(sink.published().len(), 5);
}
