//! Capture failures, edge clamping and off-display regions.

mod common;

use std::time::Duration;

use common::{bounded, builder_with, pattern_engine, wait_until};
use zoomlens::{PatternCaptureSource, Point, Rect, Size};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_capture_keeps_the_previous_frame() {
    let (engine, stats) = pattern_engine();
    engine.start().unwrap();
    assert!(wait_until(|| engine.current_frame().is_some()).await);

    stats.set_erroring(true);
    let failures = stats.failures();
    // Let any capture that was already in flight finish first.
    assert!(wait_until(|| stats.failures() >= failures + 2).await);
    let kept = engine.current_frame().unwrap();

    assert!(wait_until(|| stats.failures() >= failures + 6).await);
    let still = engine.current_frame().unwrap();
    assert_eq!(still.sequence, kept.sequence);
    assert_eq!(still.timestamp, kept.timestamp);
    assert!(engine.is_active());
    assert!(engine.performance_metrics().frames_dropped >= 4);

    stats.set_erroring(false);
    assert!(wait_until(|| engine.current_frame().is_some_and(|f| f.sequence > kept.sequence)).await);
    bounded(engine.stop()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unavailable_capture_is_reported_and_skipped() {
    let (engine, stats) = pattern_engine();
    assert!(engine.is_capture_available());
    stats.set_unavailable(true);
    engine.start().unwrap();

    assert!(wait_until(|| engine.performance_metrics().frames_dropped >= 3).await);
    assert!(!engine.is_capture_available());
    assert!(engine.current_frame().is_none());
    assert_eq!(engine.performance_metrics().frames_rendered, 0);

    stats.set_unavailable(false);
    assert!(wait_until(|| engine.current_frame().is_some()).await);
    assert!(engine.is_capture_available());
    bounded(engine.stop()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scripted_misses_do_not_stop_the_loop() {
    let source = PatternCaptureSource::new(800, 600).fail_every(3);
    let engine = builder_with(source).build().unwrap();
    engine.start().unwrap();

    assert!(wait_until(|| engine.performance_metrics().frames_rendered >= 6).await);
    assert!(engine.performance_metrics().frames_dropped >= 2);
    bounded(engine.stop()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rect_near_the_edge_is_clamped_to_the_display() {
    let (engine, _stats) = pattern_engine();
    engine.set_center(Point::new(10.0, 10.0));
    engine.set_window_size(Size::new(400.0, 300.0));
    engine.set_level(2.0);
    engine.start().unwrap();

    assert!(wait_until(|| engine.current_frame().is_some()).await);
    let frame = engine.current_frame().unwrap();
    assert_eq!(frame.capture_rect, Rect::new(0.0, 0.0, 110.0, 85.0));
    assert_eq!((frame.image.width, frame.image.height), (220, 170));
    bounded(engine.stop()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn region_entirely_off_display_drops_frames() {
    let (engine, stats) = pattern_engine();
    engine.set_center(Point::new(5000.0, 5000.0));
    engine.start().unwrap();

    assert!(wait_until(|| engine.performance_metrics().frames_dropped >= 3).await);
    assert!(engine.current_frame().is_none());
    // Off-display iterations never reach the capture source.
    assert_eq!(stats.captures() + stats.failures(), 0);
    bounded(engine.stop()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_interrupts_a_slow_capture() {
    let source = PatternCaptureSource::new(640, 480).with_delay(Duration::from_secs(30));
    let stats = source.stats();
    let engine = builder_with(source).build().unwrap();
    engine.start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    bounded(engine.stop()).await.unwrap();
    assert!(engine.current_frame().is_none());
    assert_eq!(stats.shutdowns(), 1);
}
