//! Synthetic capture source.
//!
//! Renders a deterministic pattern for any requested rectangle of a virtual
//! display, so the whole pipeline can run without screen-capture permission.
//! Every pixel encodes its absolute display position:
//!   B = x % 256, G = y % 256, R = 255 on odd 32px checker cells, A = 255.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::capture::CaptureSource;
use crate::frame::RawImage;
use crate::geometry::Rect;

/// Shared counters and switches for a [`PatternCaptureSource`].
///
/// Clone it before handing the source to an engine to observe or steer the
/// source while the loop owns it.
#[derive(Debug, Default)]
pub struct CaptureStats {
    captures: AtomicU64,
    failures: AtomicU64,
    initialized: AtomicU64,
    shutdowns: AtomicU64,
    unavailable: AtomicBool,
    erroring: AtomicBool,
}

impl CaptureStats {
    /// Successful captures so far
    pub fn captures(&self) -> u64 {
        self.captures.load(Ordering::SeqCst)
    }

    /// Captures that returned no image or an error
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Number of `initialize` calls
    pub fn initialized(&self) -> u64 {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Number of `shutdown` calls
    pub fn shutdowns(&self) -> u64 {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Make every following capture return `Ok(None)` (or resume).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every following capture return an error (or resume).
    pub fn set_erroring(&self, erroring: bool) {
        self.erroring.store(erroring, Ordering::SeqCst);
    }
}

/// Virtual display that renders a position-encoding pattern.
pub struct PatternCaptureSource {
    bounds: Rect,
    fail_every: Option<u64>,
    delay: Duration,
    shutdown_delay: Duration,
    calls: u64,
    stats: Arc<CaptureStats>,
}

impl PatternCaptureSource {
    /// Virtual display of `width` x `height` pixels at the origin.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, width as f64, height as f64),
            fail_every: None,
            delay: Duration::ZERO,
            shutdown_delay: Duration::ZERO,
            calls: 0,
            stats: Arc::new(CaptureStats::default()),
        }
    }

    /// Return no image on every `n`-th capture call (1-based).
    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    /// Simulate a slow capture path.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Simulate a capture session that takes a while to tear down.
    pub fn with_shutdown_delay(mut self, delay: Duration) -> Self {
        self.shutdown_delay = delay;
        self
    }

    /// Handle for observing this source after it moves into an engine.
    pub fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }

    fn render(&self, rect: Rect) -> Option<RawImage> {
        let clamped = rect.intersection(&self.bounds)?;
        let px = clamped.to_pixels();
        if px.width == 0 || px.height == 0 {
            return None;
        }
        let mut data = vec![0u8; px.width as usize * px.height as usize * 4];
        for (row, line) in data.chunks_exact_mut(px.width as usize * 4).enumerate() {
            let y = px.y as i64 + row as i64;
            for (col, pixel) in line.chunks_exact_mut(4).enumerate() {
                let x = px.x as i64 + col as i64;
                let odd_cell = ((x / 32) + (y / 32)) % 2 == 1;
                pixel[0] = (x % 256) as u8;
                pixel[1] = (y % 256) as u8;
                pixel[2] = if odd_cell { 255 } else { 0 };
                pixel[3] = 255;
            }
        }
        Some(RawImage::from_bgra(data, px.width, px.height))
    }
}

#[async_trait]
impl CaptureSource for PatternCaptureSource {
    async fn initialize(&mut self) -> Result<()> {
        self.stats.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn capture(&mut self, rect: Rect) -> Result<Option<RawImage>> {
        self.calls += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.stats.erroring.load(Ordering::SeqCst) {
            self.stats.failures.fetch_add(1, Ordering::SeqCst);
            return Err(anyhow!("simulated capture failure on call {}", self.calls));
        }
        let scripted_miss = self.fail_every.is_some_and(|n| self.calls % n == 0);
        if scripted_miss || self.stats.unavailable.load(Ordering::SeqCst) {
            self.stats.failures.fetch_add(1, Ordering::SeqCst);
            return Ok(None);
        }

        let image = self.render(rect);
        let counter = if image.is_some() {
            &self.stats.captures
        } else {
            &self.stats.failures
        };
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(image)
    }

    fn display_bounds(&self) -> Rect {
        self.bounds
    }

    fn is_available(&self) -> bool {
        !self.stats.unavailable.load(Ordering::SeqCst)
    }

    async fn shutdown(&mut self) -> Result<()> {
        if !self.shutdown_delay.is_zero() {
            tokio::time::sleep(self.shutdown_delay).await;
        }
        self.stats.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pixels_encode_their_display_position() {
        let mut source = PatternCaptureSource::new(640, 480);
        let image = source
            .capture(Rect::new(100.0, 40.0, 8.0, 4.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!((image.width, image.height), (8, 4));
        assert_eq!(image.pixel(0, 0), Some([100, 40, 0, 255]));
        assert_eq!(image.pixel(7, 3), Some([107, 43, 0, 255]));
    }

    #[tokio::test]
    async fn checker_cells_alternate_every_32_pixels() {
        let mut source = PatternCaptureSource::new(128, 128);
        let image = source
            .capture(Rect::new(0.0, 0.0, 64.0, 1.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(image.pixel(31, 0).unwrap()[2], 0);
        assert_eq!(image.pixel(32, 0).unwrap()[2], 255);
    }

    #[tokio::test]
    async fn scripted_failures_return_none() {
        let mut source = PatternCaptureSource::new(64, 64).fail_every(2);
        let stats = source.stats();
        let rect = Rect::new(0.0, 0.0, 8.0, 8.0);
        assert!(source.capture(rect).await.unwrap().is_some());
        assert!(source.capture(rect).await.unwrap().is_none());
        assert!(source.capture(rect).await.unwrap().is_some());
        assert_eq!(stats.captures(), 2);
        assert_eq!(stats.failures(), 1);
    }

    #[tokio::test]
    async fn unavailable_switch_is_a_capability_signal() {
        let mut source = PatternCaptureSource::new(64, 64);
        let stats = source.stats();
        stats.set_unavailable(true);
        assert!(!source.is_available());
        assert!(source.capture(Rect::new(0.0, 0.0, 4.0, 4.0)).await.unwrap().is_none());
        stats.set_erroring(true);
        assert!(source.capture(Rect::new(0.0, 0.0, 4.0, 4.0)).await.is_err());
    }

    #[tokio::test]
    async fn off_display_rect_yields_none() {
        let mut source = PatternCaptureSource::new(64, 64);
        assert!(source
            .capture(Rect::new(100.0, 100.0, 4.0, 4.0))
            .await
            .unwrap()
            .is_none());
    }
}
