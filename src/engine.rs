//! # Zoom Engine
//!
//! Owns the zoom state and runs the capture loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  resolve   ┌──────────────┐  rect   ┌───────────────┐
//! │ FocusTracker │──────────▶│ capture loop │───────▶│ CaptureSource │
//! └──────────────┘  center    │ (tokio task) │◀───────└───────────────┘
//!                             │              │  raw
//!                             │              │───────▶┌───────────────┐
//!                             │              │◀───────│   Renderer    │
//!                             └──────┬───────┘ scaled └───────────────┘
//!                                    │ publish (Arc swap)
//!                                    ▼
//!                            current_frame() readers
//! ```
//!
//! One iteration resolves the center, derives the capture rectangle
//! (`window_size / level` around the center, clamped to the display),
//! captures, scales by `level`, publishes, records the work time and sleeps
//! out the rest of the frame interval. Settings are read once per iteration
//! as a snapshot, so a change lands on the next frame.
//!
//! A failed or empty capture skips the iteration: the previous frame stays
//! published and the monitor counts a dropped frame.
//!
//! ## Lifecycle
//!
//! The engine owns its capture source and renderer. While idle they are
//! parked in the shared state; the loop task takes them when it begins and
//! parks them again after it has released GPU textures and shut the capture
//! session down. `stop` cancels the task and waits for that hand-back, so a
//! `stop` future dropped halfway leaves the engine `Stopping` rather than
//! broken: a later `stop` finishes the wait and a later `start` runs once
//! the old loop has parked the pipeline.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::capture::CaptureSource;
use crate::config::MagnifierConfig;
use crate::error::{HasSeverity, MagnifierError, Result};
use crate::focus::{FocusTracker, TrackingMode};
use crate::frame::RenderedFrame;
use crate::geometry::{capture_rect, clamp_to_display, Point, Size};
use crate::performance::{PerformanceMetrics, PerformanceMonitor};
use crate::pointer::PointerSource;
use crate::render::{CpuBackend, RenderBackend, Renderer};

/// What a magnifier UI shows next to the lens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoomIndicator {
    pub is_active: bool,
    pub level: f64,
    pub center: Point,
    pub mode: TrackingMode,
}

#[derive(Debug, Clone, Copy)]
struct ZoomState {
    level: f64,
    window_size: Size,
}

/// Capture source and renderer, owned by whoever runs frames.
struct Pipeline {
    capture: Box<dyn CaptureSource>,
    renderer: Renderer,
}

/// `done` is cancelled when the loop task exits, normally or by panic.
enum Lifecycle {
    Idle,
    Running {
        cancel: CancellationToken,
        done: CancellationToken,
    },
    Stopping {
        done: CancellationToken,
    },
}

/// State shared between the engine handle and the loop task.
struct Shared {
    config: MagnifierConfig,
    state: Mutex<ZoomState>,
    focus: Mutex<FocusTracker>,
    current: RwLock<Option<Arc<RenderedFrame>>>,
    monitor: Mutex<PerformanceMonitor>,
    active: AtomicBool,
    capture_available: AtomicBool,
    sequence: AtomicU64,
    /// Pipeline of an idle engine. Empty while a loop owns it, or after a
    /// loop panicked.
    parked: Mutex<Option<Pipeline>>,
}

impl Shared {
    fn snapshot(&self) -> ZoomState {
        *self.state.lock()
    }

    fn publish(&self, frame: RenderedFrame) {
        *self.current.write() = Some(Arc::new(frame));
    }
}

/// Real-time magnifier.
///
/// All methods take `&self`; wrap the engine in an `Arc` to drive it from
/// several tasks.
pub struct ZoomEngine {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

impl ZoomEngine {
    pub fn builder() -> ZoomEngineBuilder {
        ZoomEngineBuilder::new()
    }

    /// The normalized configuration this engine was built with.
    pub fn config(&self) -> &MagnifierConfig {
        &self.shared.config
    }

    pub fn level(&self) -> f64 {
        self.shared.state.lock().level
    }

    /// Set the zoom level, clamped to the configured bounds.
    pub fn set_level(&self, level: f64) {
        let level = self.shared.config.clamp_level(level);
        Self::apply_level(&mut self.shared.state.lock(), level);
    }

    /// Step the level up by `zoom_step`.
    pub fn zoom_in(&self) {
        self.step_level(self.shared.config.zoom_step);
    }

    /// Step the level down by `zoom_step`.
    pub fn zoom_out(&self) {
        self.step_level(-self.shared.config.zoom_step);
    }

    fn step_level(&self, delta: f64) {
        let mut state = self.shared.state.lock();
        let level = self.shared.config.clamp_level(state.level + delta);
        Self::apply_level(&mut state, level);
    }

    fn apply_level(state: &mut ZoomState, level: f64) {
        if state.level != level {
            log::debug!("zoom level {} -> {}", state.level, level);
            state.level = level;
        }
    }

    /// Return to the configured default level.
    pub fn reset_level(&self) {
        self.set_level(self.shared.config.default_level);
    }

    pub fn window_size(&self) -> Size {
        self.shared.state.lock().window_size
    }

    /// Set the output window size; each side is clamped independently.
    pub fn set_window_size(&self, size: Size) {
        let size = self.shared.config.clamp_window_size(size);
        self.shared.state.lock().window_size = size;
    }

    pub fn mode(&self) -> TrackingMode {
        self.shared.focus.lock().mode()
    }

    pub fn set_mode(&self, mode: TrackingMode) {
        self.shared.focus.lock().set_mode(mode);
    }

    /// Store the fixed-position center. Kept across mode switches.
    pub fn set_center(&self, point: Point) {
        self.shared.focus.lock().set_center(point);
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Whether the capture source reports it can deliver images.
    pub fn is_capture_available(&self) -> bool {
        self.shared.capture_available.load(Ordering::SeqCst)
    }

    /// Latest published frame, if any.
    pub fn current_frame(&self) -> Option<Arc<RenderedFrame>> {
        self.shared.current.read().clone()
    }

    pub fn zoom_indicator(&self) -> ZoomIndicator {
        let state = self.shared.snapshot();
        let focus = self.shared.focus.lock();
        ZoomIndicator {
            is_active: self.is_active(),
            level: state.level,
            center: focus.center(),
            mode: focus.mode(),
        }
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        self.shared.monitor.lock().current_metrics()
    }

    /// Spawn the capture loop on the current Tokio runtime. Idempotent.
    ///
    /// Performance counters restart from zero on every start. When a previous
    /// loop is still shutting down, the new one waits for it to hand the
    /// pipeline back before its first frame.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        let previous = match &*lifecycle {
            Lifecycle::Running { .. } => return Ok(()),
            Lifecycle::Stopping { done } if !done.is_cancelled() => Some(done.clone()),
            Lifecycle::Stopping { .. } | Lifecycle::Idle => None,
        };
        let runtime = Handle::try_current().map_err(|_| MagnifierError::NoRuntime)?;
        if previous.is_none() && self.shared.parked.lock().is_none() {
            return Err(MagnifierError::MissingCollaborator("capture pipeline"));
        }

        self.shared.monitor.lock().reset();
        self.shared.active.store(true, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        runtime.spawn(run_loop(
            Arc::clone(&self.shared),
            previous,
            cancel.clone(),
            done.clone(),
        ));
        *lifecycle = Lifecycle::Running { cancel, done };
        log::info!("zoom engine started");
        Ok(())
    }

    /// Stop the capture loop and release its resources. Idempotent.
    ///
    /// Returns once the loop has exited; the current frame stays readable.
    /// Dropping the returned future early is safe: the loop still stops and
    /// a later call waits for it.
    pub async fn stop(&self) -> Result<()> {
        let done = {
            let mut lifecycle = self.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Idle) {
                Lifecycle::Idle => return Ok(()),
                Lifecycle::Running { cancel, done } => {
                    self.shared.active.store(false, Ordering::SeqCst);
                    cancel.cancel();
                    *lifecycle = Lifecycle::Stopping { done: done.clone() };
                    done
                }
                Lifecycle::Stopping { done } => {
                    *lifecycle = Lifecycle::Stopping { done: done.clone() };
                    done
                }
            }
        };

        done.cancelled().await;

        let mut lifecycle = self.lifecycle.lock();
        if !matches!(*lifecycle, Lifecycle::Stopping { .. }) {
            // Restarted while this call was waiting.
            return Ok(());
        }
        *lifecycle = Lifecycle::Idle;
        if self.shared.parked.lock().is_none() {
            log::error!("capture loop ended without returning its pipeline");
            return Err(MagnifierError::MissingCollaborator("capture pipeline"));
        }
        log::info!("zoom engine stopped");
        Ok(())
    }

    /// Stop when active, start otherwise.
    pub async fn toggle(&self) -> Result<()> {
        if self.is_active() {
            self.stop().await
        } else {
            self.start()
        }
    }
}

impl Drop for ZoomEngine {
    fn drop(&mut self) {
        // The loop releases its resources once it sees the cancellation.
        if let Lifecycle::Running { cancel, .. } = &*self.lifecycle.lock() {
            cancel.cancel();
        }
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    previous: Option<CancellationToken>,
    cancel: CancellationToken,
    done: CancellationToken,
) {
    let _done = done.drop_guard();
    if let Some(previous) = previous {
        previous.cancelled().await;
    }
    let Some(mut pipeline) = shared.parked.lock().take() else {
        log::error!("no capture pipeline to run; an earlier loop lost it");
        shared.active.store(false, Ordering::SeqCst);
        return;
    };
    if cancel.is_cancelled() {
        *shared.parked.lock() = Some(pipeline);
        return;
    }

    if let Err(e) = pipeline.capture.initialize().await {
        log::warn!("capture session did not initialize: {:#}", e);
    }
    let interval = shared.config.target_frame_interval();
    shared.monitor.lock().set_target_interval(interval);

    while !cancel.is_cancelled() {
        let started = Instant::now();
        let ZoomState { level, window_size } = shared.snapshot();

        let display = pipeline.capture.display_bounds();
        shared
            .capture_available
            .store(pipeline.capture.is_available(), Ordering::SeqCst);
        let center = {
            let mut focus = shared.focus.lock();
            focus.set_display_bounds(display);
            focus.resolve()
        };

        let outcome = match clamp_to_display(capture_rect(center, window_size, level), display) {
            None => Err(MagnifierError::capture_unavailable("capture rect is off the display")),
            Some(rect) => {
                let captured = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    captured = pipeline.capture.capture(rect) => captured,
                };
                match captured {
                    Ok(Some(raw)) if !raw.is_empty() => pipeline
                        .renderer
                        .render(&raw, level)
                        .map(|output| (rect, output)),
                    Ok(_) => Err(MagnifierError::capture_unavailable("no image returned")),
                    Err(e) => Err(MagnifierError::capture_failed(&e)),
                }
            }
        };

        match outcome {
            Ok((rect, output)) => {
                let sequence = shared.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                shared.publish(RenderedFrame {
                    image: output.image,
                    timestamp: Instant::now(),
                    sequence,
                    capture_rect: rect,
                    level,
                    accelerated: output.accelerated,
                });
                let frame_time_ms = started.elapsed().as_secs_f64() * 1000.0;
                let mut monitor = shared.monitor.lock();
                monitor.set_accelerated(output.accelerated);
                monitor.record(frame_time_ms);
                if monitor.is_frame_budget_exceeded(frame_time_ms) {
                    log::debug!("frame {} took {:.2} ms, over budget", sequence, frame_time_ms);
                }
            }
            Err(e) => {
                shared.monitor.lock().record_dropped();
                let level: log::Level = e.severity().into();
                log::log!(level, "frame skipped: {}", e);
            }
        }

        let remaining = interval.saturating_sub(started.elapsed());
        if !remaining.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(remaining) => {}
            }
        }
    }

    pipeline.renderer.release();
    if let Err(e) = pipeline.capture.shutdown().await {
        log::warn!("capture session did not shut down cleanly: {:#}", e);
    }
    *shared.parked.lock() = Some(pipeline);
}

/// Builder for [`ZoomEngine`].
///
/// A capture source is required. Without a pointer source follow-pointer
/// mode keeps the last resolved center. An accelerated backend passed here
/// replaces the GPU probe; `prefer_gpu = false` disables both.
pub struct ZoomEngineBuilder {
    config: MagnifierConfig,
    capture: Option<Box<dyn CaptureSource>>,
    pointer: Option<Arc<dyn PointerSource>>,
    accelerated: Option<Box<dyn RenderBackend>>,
}

impl ZoomEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: MagnifierConfig::default(),
            capture: None,
            pointer: None,
            accelerated: None,
        }
    }

    pub fn with_config(mut self, config: MagnifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_capture_source<S: CaptureSource + 'static>(mut self, source: S) -> Self {
        self.capture = Some(Box::new(source));
        self
    }

    pub fn with_pointer_source<P: PointerSource + 'static>(mut self, pointer: P) -> Self {
        self.pointer = Some(Arc::new(pointer));
        self
    }

    pub fn with_accelerated_backend<B: RenderBackend + 'static>(mut self, backend: B) -> Self {
        self.accelerated = Some(Box::new(backend));
        self
    }

    pub fn build(self) -> Result<ZoomEngine> {
        let config = self.config.normalized();
        let capture = self
            .capture
            .ok_or(MagnifierError::MissingCollaborator("capture source"))?;

        let renderer = match self.accelerated {
            Some(backend) if config.prefer_gpu => {
                Renderer::new(CpuBackend::new(config.filter), Some(backend))
            }
            _ => Renderer::from_config(&config),
        };

        let mode = if config.mouse_tracking {
            TrackingMode::FollowPointer
        } else {
            TrackingMode::FixedPosition
        };
        let focus = FocusTracker::new(
            mode,
            capture.display_bounds(),
            config.pointer_origin,
            self.pointer,
        );
        let available = capture.is_available();
        if !available {
            log::warn!("capture source reports it is unavailable");
        }

        let shared = Shared {
            state: Mutex::new(ZoomState {
                level: config.default_level,
                window_size: config.window_size,
            }),
            focus: Mutex::new(focus),
            current: RwLock::new(None),
            monitor: Mutex::new(PerformanceMonitor::new(config.target_frame_interval())),
            active: AtomicBool::new(false),
            capture_available: AtomicBool::new(available),
            sequence: AtomicU64::new(0),
            parked: Mutex::new(Some(Pipeline { capture, renderer })),
            config,
        };

        Ok(ZoomEngine {
            shared: Arc::new(shared),
            lifecycle: Mutex::new(Lifecycle::Idle),
        })
    }
}

impl Default for ZoomEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PatternCaptureSource;

    fn engine(config: MagnifierConfig) -> ZoomEngine {
        ZoomEngine::builder()
            .with_config(MagnifierConfig {
                prefer_gpu: false,
                ..config
            })
            .with_capture_source(PatternCaptureSource::new(1920, 1080))
            .build()
            .unwrap()
    }

    #[test]
    fn level_is_clamped_to_bounds() {
        let engine = engine(MagnifierConfig::default());
        engine.set_level(15.0);
        assert_eq!(engine.level(), 10.0);
        engine.set_level(0.2);
        assert_eq!(engine.level(), 1.0);
    }

    #[test]
    fn zoom_in_at_max_is_a_no_op() {
        let engine = engine(MagnifierConfig::default());
        engine.set_level(10.0);
        engine.zoom_in();
        assert_eq!(engine.level(), 10.0);
        engine.zoom_out();
        assert_eq!(engine.level(), 9.5);
        engine.reset_level();
        assert_eq!(engine.level(), 1.0);
    }

    #[test]
    fn concurrent_zoom_steps_are_not_lost() {
        let engine = engine(MagnifierConfig::default());
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    engine.zoom_in();
                    engine.zoom_in();
                });
            }
        });
        // 16 steps of 0.5 from 1.0, below the maximum of 10.
        assert_eq!(engine.level(), 9.0);
    }

    #[test]
    fn window_size_is_clamped_per_axis() {
        let engine = engine(MagnifierConfig::default());
        engine.set_window_size(Size::new(50.0, 5000.0));
        assert_eq!(engine.window_size(), Size::new(100.0, 1200.0));
    }

    #[test]
    fn initial_state_comes_from_config() {
        let engine = engine(MagnifierConfig {
            default_level: 2.5,
            mouse_tracking: false,
            ..MagnifierConfig::default()
        });
        let indicator = engine.zoom_indicator();
        assert!(!indicator.is_active);
        assert_eq!(indicator.level, 2.5);
        assert_eq!(indicator.mode, TrackingMode::FixedPosition);
        assert_eq!(indicator.center, Point::new(960.0, 540.0));
        assert!(engine.current_frame().is_none());
    }

    #[test]
    fn build_without_capture_source_fails() {
        let err = ZoomEngine::builder().build().err().unwrap();
        assert_eq!(err.category(), "builder");
    }

    #[test]
    fn start_outside_a_runtime_is_an_error() {
        let engine = engine(MagnifierConfig::default());
        assert!(matches!(engine.start(), Err(MagnifierError::NoRuntime)));
        assert!(!engine.is_active());
    }
}
