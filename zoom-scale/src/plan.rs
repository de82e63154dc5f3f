// SPDX-License-Identifier: MIT
//! # Scale Plans
//!
//! Computes the output canvas for a resampling job. The magnifier always
//! scales by a factor (`raw.size * level`); exact targets exist for callers
//! that need to fit a fixed window.
//!
//! - Output sides are rounded to the nearest pixel and never drop below 1px.
//! - Non-finite or non-positive factors are treated as identity.

use serde::{Deserialize, Serialize};

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    /// Byte length of a tightly packed BGRA buffer of this size.
    pub fn bgra_len(self) -> usize {
        (self.w as usize) * (self.h as usize) * 4
    }
}

/// Interpolation used when resampling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FilterQuality {
    /// Fastest acceptable filter, matches what a GPU linear sampler produces.
    Bilinear,
    /// Sharp cubic; good default for text.
    #[default]
    #[clap(name = "catmull-rom")]
    CatmullRom,
    /// Highest quality, most expensive.
    Lanczos3,
}

/// Target size constraint for a plan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleTarget {
    /// Multiply both sides by the factor.
    Factor(f64),
    /// Stretch to exactly these dimensions.
    Exact(Size),
}

/// Everything needed to run one resampling job.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalePlan {
    /// Source dimensions
    pub input: Size,
    /// Destination dimensions
    pub out: Size,
    /// Interpolation filter
    pub filter: FilterQuality,
}

impl ScalePlan {
    /// Required destination buffer length in bytes.
    pub fn out_len(&self) -> usize {
        self.out.bgra_len()
    }

    /// True when the job is a plain copy.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }
}

/// Compute a scale plan for `input` under `target`.
pub fn build_plan(input: Size, target: ScaleTarget, filter: FilterQuality) -> ScalePlan {
    let out = match target {
        ScaleTarget::Factor(factor) => scaled_size(input, factor),
        ScaleTarget::Exact(size) => Size {
            w: size.w.max(1),
            h: size.h.max(1),
        },
    };
    ScalePlan { input, out, filter }
}

/// `input * factor`, rounded, at least 1x1.
pub fn scaled_size(input: Size, factor: f64) -> Size {
    let factor = if factor.is_finite() && factor > 0.0 {
        factor
    } else {
        1.0
    };
    Size {
        w: ((input.w as f64 * factor).round() as u32).max(1),
        h: ((input.h as f64 * factor).round() as u32).max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_plan_multiplies_both_sides() {
        let plan = build_plan(
            Size { w: 200, h: 150 },
            ScaleTarget::Factor(2.0),
            FilterQuality::Bilinear,
        );
        assert_eq!(plan.out, Size { w: 400, h: 300 });
        assert_eq!(plan.out_len(), 400 * 300 * 4);
        assert!(!plan.is_identity());
    }

    #[test]
    fn fractional_factor_rounds_to_nearest_pixel() {
        assert_eq!(scaled_size(Size { w: 133, h: 100 }, 1.5), Size { w: 200, h: 150 });
    }

    #[test]
    fn degenerate_factor_is_identity() {
        let input = Size { w: 64, h: 32 };
        assert_eq!(scaled_size(input, 0.0), input);
        assert_eq!(scaled_size(input, f64::NAN), input);
        assert_eq!(scaled_size(input, -3.0), input);
    }

    #[test]
    fn never_collapses_below_one_pixel() {
        assert_eq!(scaled_size(Size { w: 1, h: 1 }, 0.1), Size { w: 1, h: 1 });
    }

    #[test]
    fn exact_plan_ignores_aspect() {
        let plan = build_plan(
            Size { w: 10, h: 10 },
            ScaleTarget::Exact(Size { w: 30, h: 5 }),
            FilterQuality::Lanczos3,
        );
        assert_eq!(plan.out, Size { w: 30, h: 5 });
    }
}
