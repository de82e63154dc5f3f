//! # Performance Monitor
//!
//! Rolling frame-time statistics for the capture loop.
//!
//! Each loop iteration reports how long its capture, scale and publish work
//! took. Every [`SAMPLE_WINDOW`] frames the monitor publishes
//!
//! ```text
//! avg_frame_time_ms = sum(frame_time_ms) / SAMPLE_WINDOW
//! fps               = 1000 / avg_frame_time_ms
//! ```
//!
//! Until the first window completes the same formula is applied to the frames
//! seen so far, so a freshly started engine reports a provisional estimate
//! instead of zero. The estimate measures throughput of the work itself; the
//! pacing sleep is not part of a frame time.
//!
//! The monitor never alarms. [`PerformanceMonitor::is_frame_budget_exceeded`]
//! is a per-frame check the loop uses for logging.

use std::time::Duration;

use serde::Serialize;

/// Frames per statistics window.
pub const SAMPLE_WINDOW: usize = 60;

/// Snapshot of the monitor's published values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PerformanceMetrics {
    /// Frames per second estimated from the last window
    pub fps: f64,
    /// Average frame work time over the last window, in milliseconds
    pub avg_frame_time_ms: f64,
    /// Whether the accelerated backend produced the most recent frame
    pub is_gpu_accelerated: bool,
    /// Frames published since the last reset
    pub frames_rendered: u64,
    /// Iterations skipped since the last reset (capture or render failure)
    pub frames_dropped: u64,
    /// Frames whose work time exceeded the target interval
    pub budget_overruns: u64,
}

/// Collects per-frame timings and derives [`PerformanceMetrics`].
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    budget_ms: f64,
    window: Vec<f64>,
    windows_completed: u64,
    metrics: PerformanceMetrics,
}

impl PerformanceMonitor {
    /// Monitor for a loop targeting `target_interval` per frame.
    pub fn new(target_interval: Duration) -> Self {
        Self {
            budget_ms: target_interval.as_secs_f64() * 1000.0,
            window: Vec::with_capacity(SAMPLE_WINDOW),
            windows_completed: 0,
            metrics: PerformanceMetrics::default(),
        }
    }

    /// Record the work time of one published frame.
    pub fn record(&mut self, frame_time_ms: f64) {
        let frame_time_ms = if frame_time_ms.is_finite() {
            frame_time_ms.max(0.0)
        } else {
            0.0
        };
        self.metrics.frames_rendered += 1;
        if self.is_frame_budget_exceeded(frame_time_ms) {
            self.metrics.budget_overruns += 1;
        }

        self.window.push(frame_time_ms);
        if self.window.len() >= SAMPLE_WINDOW {
            self.publish_window();
            self.window.clear();
            self.windows_completed += 1;
        } else if self.windows_completed == 0 {
            self.publish_window();
        }
    }

    /// Record an iteration that produced no frame.
    pub fn record_dropped(&mut self) {
        self.metrics.frames_dropped += 1;
    }

    /// Note which backend produced the most recent frame.
    pub fn set_accelerated(&mut self, accelerated: bool) {
        self.metrics.is_gpu_accelerated = accelerated;
    }

    /// True when `frame_time_ms` is over the per-frame budget.
    pub fn is_frame_budget_exceeded(&self, frame_time_ms: f64) -> bool {
        frame_time_ms > self.budget_ms
    }

    /// Change the per-frame budget, e.g. after a configuration change.
    pub fn set_target_interval(&mut self, target_interval: Duration) {
        self.budget_ms = target_interval.as_secs_f64() * 1000.0;
    }

    /// Clear all counters and estimates.
    pub fn reset(&mut self) {
        self.window.clear();
        self.windows_completed = 0;
        self.metrics = PerformanceMetrics::default();
    }

    pub fn current_metrics(&self) -> PerformanceMetrics {
        self.metrics
    }

    fn publish_window(&mut self) {
        if self.window.is_empty() {
            return;
        }
        let avg = self.window.iter().sum::<f64>() / self.window.len() as f64;
        self.metrics.avg_frame_time_ms = avg;
        // Sub-microsecond averages would report an unbounded rate.
        self.metrics.fps = 1000.0 / avg.max(0.001);
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs_f64(1.0 / 60.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisional_estimate_before_the_first_window() {
        let mut monitor = PerformanceMonitor::default();
        assert_eq!(monitor.current_metrics().fps, 0.0);
        monitor.record(10.0);
        monitor.record(30.0);
        let metrics = monitor.current_metrics();
        assert_eq!(metrics.avg_frame_time_ms, 20.0);
        assert_eq!(metrics.fps, 50.0);
        assert_eq!(metrics.frames_rendered, 2);
    }

    #[test]
    fn estimate_updates_once_per_window_after_the_first() {
        let mut monitor = PerformanceMonitor::default();
        for _ in 0..SAMPLE_WINDOW {
            monitor.record(4.0);
        }
        assert_eq!(monitor.current_metrics().fps, 250.0);

        for _ in 0..SAMPLE_WINDOW - 1 {
            monitor.record(10.0);
        }
        assert_eq!(monitor.current_metrics().fps, 250.0);
        monitor.record(10.0);
        assert_eq!(monitor.current_metrics().fps, 100.0);
        assert_eq!(monitor.current_metrics().avg_frame_time_ms, 10.0);
    }

    #[test]
    fn budget_overruns_are_counted() {
        let mut monitor = PerformanceMonitor::new(Duration::from_millis(16));
        assert!(monitor.is_frame_budget_exceeded(17.0));
        assert!(!monitor.is_frame_budget_exceeded(16.0));
        monitor.record(20.0);
        monitor.record(5.0);
        assert_eq!(monitor.current_metrics().budget_overruns, 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut monitor = PerformanceMonitor::default();
        monitor.record(8.0);
        monitor.record_dropped();
        monitor.set_accelerated(true);
        monitor.reset();
        assert_eq!(monitor.current_metrics(), PerformanceMetrics::default());
    }

    #[test]
    fn dropped_frames_do_not_touch_the_estimate() {
        let mut monitor = PerformanceMonitor::default();
        monitor.record(5.0);
        monitor.record_dropped();
        let metrics = monitor.current_metrics();
        assert_eq!(metrics.fps, 200.0);
        assert_eq!(metrics.frames_dropped, 1);
        assert_eq!(metrics.frames_rendered, 1);
    }
}
