use crate::clipboard::CaptureLog;
use crate::platforms::ClipboardSink;
use crate::synchronizer::wait_until;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const MAX_WAIT: Duration = Duration::from_millis(2000);
const POLL: Duration = Duration::from_millis(100);

fn spawn_writes(log: &Arc<CaptureLog>, at: Duration, count: usize) {
    let log = log.clone();
    tokio::spawn(async move {
        sleep(at).await;
        for i in 0..count {
            log.write_text(&format!("captured assistant response number {i}"));
        }
    });
}

#[tokio::test(start_paused = true)]
async fn test_returns_at_first_poll_after_target_is_reached() {
    let log = Arc::new(CaptureLog::new(20));
    spawn_writes(&log, Duration::from_millis(250), 3);

    let start = Instant::now();
    let outcome = wait_until(&log, 3, MAX_WAIT, POLL).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.captured, 3);
    assert_eq!(outcome.elapsed, Duration::from_millis(300));
    assert_eq!(start.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_times_out_at_exactly_max_wait_with_partial_count() {
    let log = Arc::new(CaptureLog::new(20));
    spawn_writes(&log, Duration::from_millis(120), 2);

    let start = Instant::now();
    let outcome = wait_until(&log, 5, MAX_WAIT, POLL).await;

    assert!(!outcome.is_complete());
    assert_eq!(outcome.captured, 2);
    assert_eq!(outcome.elapsed, MAX_WAIT);
    assert_eq!(start.elapsed(), MAX_WAIT);
}

#[tokio::test(start_paused = true)]
async fn test_already_satisfied_returns_immediately() {
    let log = Arc::new(CaptureLog::new(0));
    log.write_text("one");

    let start = Instant::now();
    let outcome = wait_until(&log, 1, MAX_WAIT, POLL).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.elapsed, Duration::ZERO);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_uneven_poll_interval_still_stops_at_max_wait() {
    let log = Arc::new(CaptureLog::new(0));

    let start = Instant::now();
    let outcome = wait_until(&log, 1, Duration::from_millis(1000), Duration::from_millis(300)).await;

    assert_eq!(outcome.captured, 0);
    assert_eq!(outcome.elapsed, Duration::from_millis(1000));
    assert_eq!(start.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_zero_expected_never_waits() {
    let log = Arc::new(CaptureLog::new(0));
    let outcome = wait_until(&log, 0, MAX_WAIT, POLL).await;
    assert!(outcome.is_complete());
    assert_eq!(outcome.elapsed, Duration::ZERO);
}
