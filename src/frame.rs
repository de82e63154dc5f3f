//! Pixel buffers moving through the pipeline.

use std::sync::Arc;
use std::time::Instant;

use crate::geometry::Rect;

/// A raw BGRA image.
///
/// Pixel data is `Arc`-shared so a published frame can be read by any number
/// of consumers without copying; it is never mutated after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct RawImage {
    /// BGRA pixel data. Length must be at least `stride * (height - 1) + width * 4`.
    pub data: Arc<Vec<u8>>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Bytes per row (>= width * 4)
    pub stride: usize,
}

impl RawImage {
    /// Wrap a tightly packed BGRA buffer.
    pub fn from_bgra(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data: Arc::new(data),
            width,
            height,
            stride: width as usize * 4,
        }
    }

    /// Build an image filled with a single BGRA pixel value.
    pub fn solid(width: u32, height: u32, bgra: [u8; 4]) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * 4];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&bgra);
        }
        Self::from_bgra(data, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// True when the buffer is large enough for the declared geometry.
    pub fn is_consistent(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        let row = self.width as usize * 4;
        self.stride >= row && self.data.len() >= self.stride * (self.height as usize - 1) + row
    }

    pub fn size(&self) -> zoom_scale::plan::Size {
        zoom_scale::plan::Size {
            w: self.width,
            h: self.height,
        }
    }

    /// BGRA value at `(x, y)`, `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.stride + x as usize * 4;
        self.data.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// The most recent magnified image and how it was produced.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    /// Scaled output pixels
    pub image: RawImage,
    /// When the frame was published
    pub timestamp: Instant,
    /// Monotonic frame counter for this engine, starting at 1
    pub sequence: u64,
    /// Screen region that was sampled, after clamping to the display
    pub capture_rect: Rect,
    /// Zoom level the frame was scaled by
    pub level: f64,
    /// Whether the accelerated backend produced this frame
    pub accelerated: bool,
}
