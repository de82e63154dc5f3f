//! # Capture Module
//!
//! The [`CaptureSource`] seam and its implementations:
//!
//! - [`pattern::PatternCaptureSource`]: synthetic display, always available
//! - [`scrap::ScrapCaptureSource`]: primary display via `scrap` (feature `screen-capture`)

use anyhow::Result;
use async_trait::async_trait;

use crate::frame::RawImage;
use crate::geometry::Rect;

pub mod pattern;
#[cfg(feature = "screen-capture")]
pub mod scrap;

pub use pattern::{CaptureStats, PatternCaptureSource};
#[cfg(feature = "screen-capture")]
pub use scrap::ScrapCaptureSource;

/// Abstract interface for "grab a still image of a screen rectangle".
///
/// The engine owns the source exclusively while it is active: `initialize`
/// runs when the capture loop starts, `shutdown` when it stops.
#[async_trait]
pub trait CaptureSource: Send {
    /// Acquire OS-level capture resources.
    async fn initialize(&mut self) -> Result<()>;

    /// Capture a bitmap covering `rect` (capture coordinates, already clamped
    /// to [`display_bounds`](Self::display_bounds)).
    ///
    /// `Ok(None)` means no image is available right now, e.g. permission was
    /// revoked or the display went away.
    async fn capture(&mut self, rect: Rect) -> Result<Option<RawImage>>;

    /// Bounds of the target display in capture coordinates.
    fn display_bounds(&self) -> Rect;

    /// Capability check callers can run before starting the engine.
    fn is_available(&self) -> bool {
        true
    }

    /// Release OS-level capture resources.
    async fn shutdown(&mut self) -> Result<()>;
}
