//! Common test utilities for the zoomlens engine tests
//!
//! Engine builders with fast, CPU-only defaults, a polling helper for
//! waiting on the capture loop, and mock collaborators.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use zoomlens::error::MagnifierError;
use zoomlens::{
    CaptureSource, MagnifierConfig, PatternCaptureSource, RawImage, RenderBackend, ZoomEngine,
    ZoomEngineBuilder,
};

/// Upper bound for any wait on the capture loop.
pub const WAIT: Duration = Duration::from_secs(5);

/// Config for tests: CPU only, fixed position, cheap bilinear filter.
pub fn test_config() -> MagnifierConfig {
    MagnifierConfig {
        prefer_gpu: false,
        mouse_tracking: false,
        filter: zoomlens::FilterQuality::Bilinear,
        ..MagnifierConfig::default()
    }
}

/// Builder preloaded with [`test_config`] and `source`.
pub fn builder_with<S: CaptureSource + 'static>(source: S) -> ZoomEngineBuilder {
    ZoomEngine::builder()
        .with_config(test_config())
        .with_capture_source(source)
}

/// Engine over a 1920x1080 pattern display.
pub fn pattern_engine() -> (ZoomEngine, Arc<zoomlens::capture::CaptureStats>) {
    let source = PatternCaptureSource::new(1920, 1080);
    let stats = source.stats();
    let engine = builder_with(source).build().expect("engine builds");
    (engine, stats)
}

/// Poll `condition` every few milliseconds until it holds or [`WAIT`] passes.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Await `future` with the [`WAIT`] bound.
pub async fn bounded<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("operation finished in time")
}

/// Counters for a [`MockGpu`], shared with the test.
#[derive(Debug, Default)]
pub struct MockGpuStats {
    pub calls: AtomicU64,
    pub releases: AtomicU64,
}

impl MockGpuStats {
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }
}

/// Accelerated backend stand-in: nearest-neighbour scaling, or a scripted
/// failure on every call.
pub struct MockGpu {
    pub stats: Arc<MockGpuStats>,
    pub failing: bool,
}

impl MockGpu {
    pub fn working() -> (Self, Arc<MockGpuStats>) {
        Self::with_failing(false)
    }

    pub fn broken() -> (Self, Arc<MockGpuStats>) {
        Self::with_failing(true)
    }

    fn with_failing(failing: bool) -> (Self, Arc<MockGpuStats>) {
        let stats = Arc::new(MockGpuStats::default());
        (
            Self {
                stats: Arc::clone(&stats),
                failing,
            },
            stats,
        )
    }
}

impl RenderBackend for MockGpu {
    fn name(&self) -> &'static str {
        "mock-gpu"
    }

    fn is_accelerated(&self) -> bool {
        true
    }

    fn scale(&mut self, image: &RawImage, factor: f64) -> zoomlens::Result<RawImage> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(MagnifierError::render("mock-gpu", "device lost"));
        }
        let width = ((image.width as f64 * factor).round() as u32).max(1);
        let height = ((image.height as f64 * factor).round() as u32).max(1);
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            let sy = ((y as f64 / factor) as u32).min(image.height - 1);
            for x in 0..width {
                let sx = ((x as f64 / factor) as u32).min(image.width - 1);
                data.extend_from_slice(&image.pixel(sx, sy).unwrap_or([0, 0, 0, 255]));
            }
        }
        Ok(RawImage::from_bgra(data, width, height))
    }

    fn release(&mut self) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
    }
}
