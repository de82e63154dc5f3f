//! # Configuration Module
//!
//! Initial values and bounds for a [`ZoomEngine`](crate::engine::ZoomEngine).
//! Preference storage lives outside this crate; callers hand the engine a
//! `MagnifierConfig` built from defaults, from code, or from a JSON document.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Default | Description |
//! |-----------|---------|-------------|
//! | `min_level` / `max_level` | 1.0 / 10.0 | Zoom level bounds |
//! | `default_level` | 1.0 | Level at construction and after `reset_level` |
//! | `zoom_step` | 0.5 | Increment used by `zoom_in` / `zoom_out` |
//! | `window_size` | 400×300 | Output window size at construction |
//! | `min_window_size` / `max_window_size` | 100×100 / 1600×1200 | Window bounds |
//! | `target_fps` | 60 | Frame cadence the loop paces to |
//! | `mouse_tracking` | true | Start in follow-pointer mode |
//! | `prefer_gpu` | true | Try the accelerated render path first |
//! | `filter` | `catmull_rom` | CPU interpolation filter |
//! | `pointer_origin` | `top_left` | Convention of the pointer source |
//!
//! Values are never rejected. [`MagnifierConfig::normalized`] repairs
//! inconsistent bounds, and the engine clamps every setter input.
//!
//! ## Examples
//!
//! ```rust
//! use zoomlens::config::MagnifierConfig;
//!
//! let config = MagnifierConfig::from_json_str(r#"{ "default_level": 3.0, "target_fps": 30 }"#)?;
//! assert_eq!(config.default_level, 3.0);
//! assert_eq!(config.max_level, 10.0);
//! # Ok::<(), zoomlens::error::MagnifierError>(())
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zoom_scale::plan::FilterQuality;

use crate::error::{MagnifierError, Result};
use crate::geometry::{clamp_f64, CoordinateOrigin, Size};

/// Configuration for a magnifier engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnifierConfig {
    /// Lowest zoom level; 1.0 means no magnification.
    pub min_level: f64,
    /// Highest zoom level.
    pub max_level: f64,
    /// Level the engine starts at and returns to on `reset_level`.
    pub default_level: f64,
    /// Additive step for `zoom_in` / `zoom_out`.
    pub zoom_step: f64,
    /// Output window size at construction.
    pub window_size: Size,
    /// Smallest accepted window size.
    pub min_window_size: Size,
    /// Largest accepted window size.
    pub max_window_size: Size,
    /// Frame cadence the capture loop paces to.
    pub target_fps: u32,
    /// Start in follow-pointer mode instead of fixed position.
    pub mouse_tracking: bool,
    /// Try the GPU render path before the CPU one.
    pub prefer_gpu: bool,
    /// Interpolation used by the CPU render path.
    pub filter: FilterQuality,
    /// Coordinate convention of the pointer source.
    pub pointer_origin: CoordinateOrigin,
}

impl Default for MagnifierConfig {
    fn default() -> Self {
        Self {
            min_level: 1.0,
            max_level: 10.0,
            default_level: 1.0,
            zoom_step: 0.5,
            window_size: Size::new(400.0, 300.0),
            min_window_size: Size::new(100.0, 100.0),
            max_window_size: Size::new(1600.0, 1200.0),
            target_fps: 60,
            mouse_tracking: true,
            prefer_gpu: true,
            filter: FilterQuality::default(),
            pointer_origin: CoordinateOrigin::TopLeft,
        }
    }
}

impl MagnifierConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MagnifierError::InvalidConfiguration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Repair inconsistent values so every engine invariant can hold:
    /// positive level bounds in order, window bounds in order, defaults
    /// inside their bounds, a positive step and at least 1 fps.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();

        if !(self.min_level.is_finite() && self.min_level > 0.0) {
            self.min_level = defaults.min_level;
        }
        if !self.max_level.is_finite() {
            self.max_level = defaults.max_level;
        }
        if self.max_level < self.min_level {
            std::mem::swap(&mut self.min_level, &mut self.max_level);
            if !(self.min_level > 0.0) {
                self.min_level = defaults.min_level;
            }
        }
        self.default_level = clamp_f64(self.default_level, self.min_level, self.max_level);
        if !(self.zoom_step.is_finite() && self.zoom_step > 0.0) {
            self.zoom_step = defaults.zoom_step;
        }

        let min = &mut self.min_window_size;
        let max = &mut self.max_window_size;
        if !(min.width > 0.0) {
            min.width = defaults.min_window_size.width;
        }
        if !(min.height > 0.0) {
            min.height = defaults.min_window_size.height;
        }
        if !(max.width >= min.width) {
            max.width = min.width.max(defaults.max_window_size.width);
        }
        if !(max.height >= min.height) {
            max.height = min.height.max(defaults.max_window_size.height);
        }
        self.window_size = self
            .window_size
            .clamped(self.min_window_size, self.max_window_size);

        self.target_fps = self.target_fps.max(1);
        self
    }

    /// Wall-clock budget for one loop iteration.
    pub fn target_frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }

    /// Clamp a level into the configured bounds.
    pub fn clamp_level(&self, level: f64) -> f64 {
        clamp_f64(level, self.min_level, self.max_level)
    }

    /// Clamp a window size into the configured bounds.
    pub fn clamp_window_size(&self, size: Size) -> Size {
        size.clamped(self.min_window_size, self.max_window_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MagnifierConfig::default();
        assert_eq!(config.min_level, 1.0);
        assert_eq!(config.max_level, 10.0);
        assert_eq!(config.default_level, 1.0);
        assert_eq!(config.window_size, Size::new(400.0, 300.0));
        assert_eq!(config.target_fps, 60);
        assert!(config.mouse_tracking);
        assert!(config.prefer_gpu);
        assert_eq!(config.clone().normalized(), config);
    }

    #[test]
    fn frame_interval_matches_sixty_fps() {
        let interval = MagnifierConfig::default().target_frame_interval();
        assert!((interval.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn clamp_level_follows_bounds() {
        let config = MagnifierConfig::default();
        assert_eq!(config.clamp_level(15.0), 10.0);
        assert_eq!(config.clamp_level(0.2), 1.0);
        assert_eq!(config.clamp_level(f64::NAN), 1.0);
        assert_eq!(config.clamp_level(4.5), 4.5);
    }

    #[test]
    fn normalized_repairs_inverted_bounds() {
        let config = MagnifierConfig {
            min_level: 8.0,
            max_level: 2.0,
            default_level: 20.0,
            zoom_step: -1.0,
            target_fps: 0,
            window_size: Size::new(10.0, 10.0),
            ..MagnifierConfig::default()
        }
        .normalized();
        assert_eq!(config.min_level, 2.0);
        assert_eq!(config.max_level, 8.0);
        assert_eq!(config.default_level, 8.0);
        assert_eq!(config.zoom_step, 0.5);
        assert_eq!(config.target_fps, 1);
        assert_eq!(config.window_size, Size::new(100.0, 100.0));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = MagnifierConfig::from_json_str(
            r#"{ "window_size": { "width": 800, "height": 600 }, "filter": "lanczos3", "pointer_origin": "bottom_left" }"#,
        )
        .unwrap();
        assert_eq!(config.window_size, Size::new(800.0, 600.0));
        assert_eq!(config.filter, FilterQuality::Lanczos3);
        assert_eq!(config.pointer_origin, CoordinateOrigin::BottomLeft);
        assert_eq!(config.min_level, 1.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = MagnifierConfig::from_json_str("{ not json").unwrap_err();
        assert_eq!(err.category(), "json");
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("magnifier.json");
        std::fs::write(&path, r#"{ "max_level": 4.0, "prefer_gpu": false }"#).unwrap();
        let config = MagnifierConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_level, 4.0);
        assert!(!config.prefer_gpu);

        let missing = MagnifierConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
        assert_eq!(missing.category(), "config");
    }
}
