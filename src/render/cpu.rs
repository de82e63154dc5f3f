// CPU render path: resampling through zoom-scale.

use zoom_scale::cpu::CpuScaler;
use zoom_scale::plan::FilterQuality;

use crate::error::{MagnifierError, Result};
use crate::frame::RawImage;
use crate::render::RenderBackend;

const NAME: &str = "cpu";

/// Always-available backend. Keeps its resizer and staging buffer across
/// frames so steady-state rendering only allocates the output.
pub struct CpuBackend {
    scaler: CpuScaler,
}

impl CpuBackend {
    pub fn new(filter: FilterQuality) -> Self {
        Self {
            scaler: CpuScaler::new(filter),
        }
    }

    pub fn filter(&self) -> FilterQuality {
        self.scaler.filter()
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new(FilterQuality::default())
    }
}

impl RenderBackend for CpuBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_accelerated(&self) -> bool {
        false
    }

    fn scale(&mut self, image: &RawImage, factor: f64) -> Result<RawImage> {
        if !image.is_consistent() {
            return Err(MagnifierError::render(
                NAME,
                format!(
                    "inconsistent input {}x{} stride {} len {}",
                    image.width,
                    image.height,
                    image.stride,
                    image.data.len()
                ),
            ));
        }
        let (data, size) = self
            .scaler
            .scale_by(&image.data, image.size(), image.stride, factor)
            .map_err(|e| MagnifierError::render(NAME, e))?;
        Ok(RawImage::from_bgra(data, size.w, size.h))
    }

    fn release(&mut self) {
        // Drops the staging buffer; the resizer is rebuilt lazily.
        self.scaler = CpuScaler::new(self.scaler.filter());
    }
}
