// SPDX-License-Identifier: MIT
// Cut a sub-rectangle out of a (possibly strided) BGRA frame.

use crate::cpu::{compact_rows, ScaleError};
use crate::plan::Size;

/// Pixel-aligned region inside a source frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Copy `region` out of `src` into a tightly packed buffer.
pub fn crop_bgra(
    src_bgra: &[u8],
    src: Size,
    src_stride_bytes: usize,
    region: Region,
) -> Result<Vec<u8>, ScaleError> {
    if region.w == 0
        || region.h == 0
        || region.x.checked_add(region.w).map_or(true, |r| r > src.w)
        || region.y.checked_add(region.h).map_or(true, |b| b > src.h)
    {
        return Err(ScaleError::RegionOutOfBounds);
    }
    if src_stride_bytes < (src.w as usize) * 4
        || src_bgra.len() < src_stride_bytes * (src.h as usize - 1) + (src.w as usize) * 4
    {
        return Err(ScaleError::BufferTooSmall);
    }

    let row_bytes = (region.w as usize) * 4;
    let offset = (region.y as usize) * src_stride_bytes + (region.x as usize) * 4;
    let mut out = vec![0u8; row_bytes * region.h as usize];
    compact_rows(&src_bgra[offset..], src_stride_bytes, &mut out, row_bytes, region.h as usize);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x3 frame whose blue channel encodes `y * 10 + x`.
    fn indexed_frame(stride: usize) -> Vec<u8> {
        let mut v = vec![0u8; stride * 3];
        for y in 0..3 {
            for x in 0..4 {
                let i = y * stride + x * 4;
                v[i] = (y * 10 + x) as u8;
                v[i + 3] = 255;
            }
        }
        v
    }

    #[test]
    fn crops_interior_region() {
        let src = indexed_frame(16);
        let out = crop_bgra(&src, Size { w: 4, h: 3 }, 16, Region { x: 1, y: 1, w: 2, h: 2 }).unwrap();
        let blues: Vec<u8> = out.chunks_exact(4).map(|p| p[0]).collect();
        assert_eq!(blues, vec![11, 12, 21, 22]);
    }

    #[test]
    fn honours_row_padding() {
        let src = indexed_frame(24);
        let out = crop_bgra(&src, Size { w: 4, h: 3 }, 24, Region { x: 3, y: 0, w: 1, h: 3 }).unwrap();
        let blues: Vec<u8> = out.chunks_exact(4).map(|p| p[0]).collect();
        assert_eq!(blues, vec![3, 13, 23]);
    }

    #[test]
    fn rejects_region_past_the_edge() {
        let src = indexed_frame(16);
        let err = crop_bgra(&src, Size { w: 4, h: 3 }, 16, Region { x: 3, y: 0, w: 2, h: 1 })
            .unwrap_err();
        assert!(matches!(err, ScaleError::RegionOutOfBounds));
    }
}
