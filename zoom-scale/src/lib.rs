// SPDX-License-Identifier: MIT
//! # zoom-scale: BGRA resampling for the magnifier
//!
//! CPU building blocks behind the `zoomlens` fallback render path.
//!
//! ## Key Components
//!
//! - [`plan`]: output-size computation for a magnification factor
//! - [`cpu`]: stride-aware resampling on `fast_image_resize` (SIMD, optional rayon)
//! - [`crop`]: cutting a capture rectangle out of a full-display frame
//!
//! ## Usage Example
//!
//! ```rust
//! use zoom_scale::cpu::{scale_bgra_cpu, Staging};
//! use zoom_scale::plan::{build_plan, FilterQuality, ScaleTarget, Size};
//!
//! let input = Size { w: 200, h: 150 };
//! let plan = build_plan(input, ScaleTarget::Factor(2.0), FilterQuality::CatmullRom);
//! assert_eq!((plan.out.w, plan.out.h), (400, 300));
//!
//! let src = vec![0x80u8; (input.w * input.h * 4) as usize];
//! let mut dst = vec![0u8; plan.out_len()];
//! let mut resizer = fast_image_resize::Resizer::new();
//! scale_bgra_cpu(&mut resizer, &src, input, None, &plan, &mut dst, None::<&mut Staging>)?;
//! # Ok::<(), zoom_scale::cpu::ScaleError>(())
//! ```

pub mod cpu;
pub mod crop;
pub mod plan;
