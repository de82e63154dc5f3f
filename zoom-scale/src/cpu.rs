// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// BGRA8 in → BGRA8 out, direct write into caller-provided dst buffer.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{FilterType, ResizeAlg, ResizeOptions, Resizer};

use crate::plan::{build_plan, FilterQuality, ScalePlan, ScaleTarget, Size};

#[derive(Debug)]
pub enum ScaleError {
    BufferTooSmall,
    StrideMismatchAndNoStaging,
    RegionOutOfBounds,
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::BufferTooSmall => write!(f, "Buffer too small for the requested image"),
            ScaleError::StrideMismatchAndNoStaging => write!(f, "Stride mismatch but no staging buffer provided"),
            ScaleError::RegionOutOfBounds => write!(f, "Region lies outside the source image"),
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Pre-allocated scratch to compact strided input to tightly packed rows (only if needed).
pub struct Staging {
    pub(crate) buf: Vec<u8>,
}
impl Staging {
    pub fn with_capacity(cap: usize) -> Self { Self { buf: Vec::with_capacity(cap) } }
    pub fn ensure_len(&mut self, len: usize) { if self.buf.len() < len { self.buf.resize(len, 0); } }
    pub fn as_slice(&self) -> &[u8] { &self.buf }
}

fn resize_alg(filter: FilterQuality) -> ResizeAlg {
    match filter {
        FilterQuality::Bilinear => ResizeAlg::Convolution(FilterType::Bilinear),
        FilterQuality::CatmullRom => ResizeAlg::Convolution(FilterType::CatmullRom),
        FilterQuality::Lanczos3 => ResizeAlg::Convolution(FilterType::Lanczos3),
    }
}

/// Main scaling entry point.
/// `src_stride_bytes`: bytes per row of source. If `Some(stride) != width*4`, rows are compacted into staging.
/// `dst` must hold at least `plan.out.w * plan.out.h * 4` bytes (BGRA).
pub fn scale_bgra_cpu(
    resizer: &mut Resizer,
    src_bgra: &[u8],
    src: Size,
    src_stride_bytes: Option<usize>,
    plan: &ScalePlan,
    dst: &mut [u8],
    mut staging: Option<&mut Staging>,
) -> Result<(), ScaleError> {
    let dst_len = plan.out_len();
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall);
    }

    if src.w == 0 || src.h == 0 {
        return Err(ScaleError::RegionOutOfBounds);
    }
    let tight_row_bytes = (src.w as usize) * 4;
    let pitch = src_stride_bytes.unwrap_or(tight_row_bytes);
    if pitch < tight_row_bytes || src_bgra.len() < pitch * (src.h as usize - 1) + tight_row_bytes {
        return Err(ScaleError::BufferTooSmall);
    }

    // --- Tightly packed source bytes ---
    let tight: &[u8] = if pitch == tight_row_bytes {
        &src_bgra[..src.bgra_len()]
    } else {
        let st = staging.as_deref_mut().ok_or(ScaleError::StrideMismatchAndNoStaging)?;
        st.ensure_len(src.bgra_len());
        compact_rows(src_bgra, pitch, st.buf.as_mut_slice(), tight_row_bytes, src.h as usize);
        &st.buf[..src.bgra_len()]
    };

    if plan.is_identity() {
        dst[..dst_len].copy_from_slice(tight);
        return Ok(());
    }

    let src_view = TypedImageRef::<U8x4>::from_buffer(src.w, src.h, tight)?;
    let mut dst_image = TypedImage::<U8x4>::from_buffer(plan.out.w, plan.out.h, &mut dst[..dst_len])?;

    // Alpha is opaque on screen captures; skip premultiplication.
    let opts = ResizeOptions::new()
        .resize_alg(resize_alg(plan.filter))
        .use_alpha(false);

    resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;
    Ok(())
}

/// Owns the resizer and staging scratch so repeated frames reuse allocations.
pub struct CpuScaler {
    resizer: Resizer,
    staging: Staging,
    filter: FilterQuality,
}

impl CpuScaler {
    pub fn new(filter: FilterQuality) -> Self {
        Self {
            resizer: Resizer::new(),
            staging: Staging::with_capacity(0),
            filter,
        }
    }

    pub fn filter(&self) -> FilterQuality {
        self.filter
    }

    /// Scale `src` by `factor`, returning the tightly packed output and its size.
    pub fn scale_by(
        &mut self,
        src_bgra: &[u8],
        src: Size,
        src_stride_bytes: usize,
        factor: f64,
    ) -> Result<(Vec<u8>, Size), ScaleError> {
        let plan = build_plan(src, ScaleTarget::Factor(factor), self.filter);
        let mut out = vec![0u8; plan.out_len()];
        scale_bgra_cpu(
            &mut self.resizer,
            src_bgra,
            src,
            Some(src_stride_bytes),
            &plan,
            &mut out,
            Some(&mut self.staging),
        )?;
        Ok((out, plan.out))
    }
}

#[inline]
pub(crate) fn compact_rows(src: &[u8], src_pitch: usize, dst: &mut [u8], row_bytes: usize, rows: usize) {
    for r in 0..rows {
        let s = &src[r * src_pitch .. r * src_pitch + row_bytes];
        let d = &mut dst[r * row_bytes .. (r + 1) * row_bytes];
        d.copy_from_slice(s);
    }
}
