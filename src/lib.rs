//! # Zoomlens
//!
//! A real-time screen magnifier engine: a rectangle of the screen around a
//! focus point is captured about 60 times a second, scaled by the zoom level
//! and published as the latest frame for a UI to draw.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `engine`: zoom state, lifecycle and the capture loop
//! - `capture`: the capture-source seam and its implementations
//! - `render`: GPU and CPU scaling strategies with a fallback policy
//! - `focus`: follow-pointer, fixed-position and full-screen focus
//! - `performance`: rolling frame-time statistics
//! - `geometry`: capture-rect math and coordinate conversion
//! - `config`: initial values and bounds
//!
//! ## Features
//!
//! - `screen-capture`: primary-display capture through `scrap`
//! - `pointer`: system pointer position through `device_query`
//! - `gpu`: wgpu texture-sampling render path
//!
//! ## Example
//!
//! ```rust,no_run
//! use zoomlens::{MagnifierConfig, PatternCaptureSource, ZoomEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ZoomEngine::builder()
//!     .with_config(MagnifierConfig::default())
//!     .with_capture_source(PatternCaptureSource::new(1920, 1080))
//!     .build()?;
//!
//! engine.set_level(2.0);
//! engine.start()?;
//! tokio::time::sleep(std::time::Duration::from_millis(100)).await;
//! if let Some(frame) = engine.current_frame() {
//!     println!("frame {}: {}x{}", frame.sequence, frame.image.width, frame.image.height);
//! }
//! engine.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod focus;
pub mod frame;
pub mod geometry;
pub mod performance;
pub mod pointer;
pub mod render;

pub use capture::{CaptureSource, PatternCaptureSource};
#[cfg(feature = "screen-capture")]
pub use capture::ScrapCaptureSource;
pub use config::MagnifierConfig;
pub use engine::{ZoomEngine, ZoomEngineBuilder, ZoomIndicator};
pub use error::{ErrorSeverity, HasSeverity, MagnifierError, Result};
pub use focus::{FocusTracker, TrackingMode};
pub use frame::{RawImage, RenderedFrame};
pub use geometry::{Point, Rect, Size};
pub use performance::{PerformanceMetrics, PerformanceMonitor};
#[cfg(feature = "pointer")]
pub use pointer::DevicePointerSource;
pub use pointer::{PointerSource, SharedPointer};
pub use render::{CpuBackend, RenderBackend, Renderer};

pub use zoom_scale::plan::FilterQuality;
