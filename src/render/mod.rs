//! # Render Module
//!
//! Scaling strategies and the policy that picks between them.
//!
//! - [`cpu::CpuBackend`]: `fast_image_resize` resampling, always available
//! - [`gpu::GpuBackend`]: wgpu texture sampling (feature `gpu`)
//! - [`Renderer`]: accelerated backend first, CPU for any frame it fails
//!
//! ## Selection
//!
//! | Situation | Result |
//! |-----------|--------|
//! | accelerated backend present | used for every frame |
//! | accelerated backend fails a frame | that frame is redone on the CPU, backend stays enabled |
//! | no accelerated backend at construction | CPU for the renderer's lifetime |

use crate::config::MagnifierConfig;
use crate::error::Result;
use crate::frame::RawImage;

pub mod cpu;
#[cfg(feature = "gpu")]
pub mod gpu;

pub use cpu::CpuBackend;
#[cfg(feature = "gpu")]
pub use gpu::GpuBackend;

/// A strategy that scales a captured image by a factor.
///
/// Output size is `input size * factor`, rounded, at least 1x1.
pub trait RenderBackend: Send {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether this backend runs on the GPU.
    fn is_accelerated(&self) -> bool;

    /// Produce a new image scaled by `factor`.
    fn scale(&mut self, image: &RawImage, factor: f64) -> Result<RawImage>;

    /// Drop device-side resources. The backend must stay usable; resources
    /// are recreated on the next `scale`.
    fn release(&mut self) {}
}

/// Output of one [`Renderer::render`] call.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub image: RawImage,
    /// True when the accelerated backend produced `image`.
    pub accelerated: bool,
}

/// Applies the accelerated-first, CPU-fallback policy.
pub struct Renderer {
    accelerated: Option<Box<dyn RenderBackend>>,
    cpu: CpuBackend,
}

impl Renderer {
    /// Renderer with an explicit accelerated backend (or none).
    pub fn new(cpu: CpuBackend, accelerated: Option<Box<dyn RenderBackend>>) -> Self {
        if let Some(backend) = &accelerated {
            log::info!("render backend: {} (cpu fallback)", backend.name());
        } else {
            log::info!("render backend: cpu only");
        }
        Self { accelerated, cpu }
    }

    /// Renderer for `config`: probes the GPU once when `prefer_gpu` is set.
    pub fn from_config(config: &MagnifierConfig) -> Self {
        let cpu = CpuBackend::new(config.filter);
        let accelerated = if config.prefer_gpu {
            probe_accelerated()
        } else {
            None
        };
        Self::new(cpu, accelerated)
    }

    /// True when an accelerated backend is installed.
    pub fn has_accelerated(&self) -> bool {
        self.accelerated.is_some()
    }

    /// Scale `image` by `factor`, falling back to the CPU when the
    /// accelerated backend fails this frame.
    pub fn render(&mut self, image: &RawImage, factor: f64) -> Result<RenderOutput> {
        if let Some(backend) = self.accelerated.as_mut() {
            match backend.scale(image, factor) {
                Ok(image) => {
                    return Ok(RenderOutput {
                        image,
                        accelerated: true,
                    })
                }
                Err(e) => {
                    log::warn!("{}; rendering this frame on the cpu", e);
                }
            }
        }
        let image = self.cpu.scale(image, factor)?;
        Ok(RenderOutput {
            image,
            accelerated: false,
        })
    }

    /// Release device resources held by every backend.
    pub fn release(&mut self) {
        if let Some(backend) = self.accelerated.as_mut() {
            backend.release();
        }
        self.cpu.release();
    }
}

#[cfg(feature = "gpu")]
fn probe_accelerated() -> Option<Box<dyn RenderBackend>> {
    match GpuBackend::new() {
        Ok(gpu) => Some(Box::new(gpu)),
        Err(e) => {
            log::info!("{}", e);
            None
        }
    }
}

#[cfg(not(feature = "gpu"))]
fn probe_accelerated() -> Option<Box<dyn RenderBackend>> {
    log::debug!("built without the gpu feature");
    None
}
