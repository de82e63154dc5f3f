//! # Geometry
//!
//! Screen-space types and the capture-rectangle math.
//!
//! All rectangles handed to a capture source live in one coordinate space:
//! origin at the top-left of the primary display, y growing downwards.
//! Pointer sources that report a bottom-left origin are converted exactly once,
//! in [`to_capture_space`].

use serde::{Deserialize, Serialize};

/// A point in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair in screen units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Component-wise division by a scalar.
    pub fn divided_by(self, factor: f64) -> Self {
        Self::new(self.width / factor, self.height / factor)
    }

    /// Clamp each side independently into `[min, max]`.
    pub fn clamped(self, min: Size, max: Size) -> Self {
        Self::new(
            clamp_f64(self.width, min.width, max.width),
            clamp_f64(self.height, min.height, max.height),
        )
    }

    pub fn is_empty(self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Axis-aligned rectangle: `origin` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Overlap of two rectangles, `None` when they do not share any area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.min_x().max(other.min_x());
        let y0 = self.min_y().max(other.min_y());
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        let rect = Rect::new(x0, y0, x1 - x0, y1 - y0);
        (!rect.is_empty()).then_some(rect)
    }

    /// Smallest whole-pixel rectangle covering `self`.
    pub fn to_pixels(&self) -> PixelRect {
        let x0 = self.min_x().floor();
        let y0 = self.min_y().floor();
        let x1 = self.max_x().ceil();
        let y1 = self.max_y().ceil();
        PixelRect {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0).max(0.0) as u32,
            height: (y1 - y0).max(0.0) as u32,
        }
    }
}

/// Integer rectangle handed to capture backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Where a coordinate system puts its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateOrigin {
    /// Capture convention: y grows downwards.
    #[default]
    TopLeft,
    /// Native convention on some platforms: y grows upwards from the bottom edge.
    BottomLeft,
}

/// Region sampled for one frame: `window_size / level` centred on `center`.
///
/// `level` must be positive; the engine guarantees it through clamping.
pub fn capture_rect(center: Point, window_size: Size, level: f64) -> Rect {
    let region = window_size.divided_by(level);
    Rect {
        origin: Point::new(
            center.x - region.width / 2.0,
            center.y - region.height / 2.0,
        ),
        size: region,
    }
}

/// Clamp a capture rect to the display. The result may be smaller than the
/// request near screen edges; `None` only when nothing of the display is covered.
pub fn clamp_to_display(rect: Rect, display: Rect) -> Option<Rect> {
    rect.intersection(&display)
}

/// Convert a point reported in `origin` convention into capture space.
///
/// One-directional: for `BottomLeft` the y axis is mirrored across the
/// display's vertical extent.
pub fn to_capture_space(point: Point, display: Rect, origin: CoordinateOrigin) -> Point {
    match origin {
        CoordinateOrigin::TopLeft => point,
        CoordinateOrigin::BottomLeft => Point::new(
            point.x,
            display.min_y() + display.size.height - (point.y - display.min_y()),
        ),
    }
}

/// `f64::clamp` that tolerates inverted bounds by preferring `min`.
pub(crate) fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max.max(min))
}
