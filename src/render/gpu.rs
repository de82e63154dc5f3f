//! GPU render path.
//!
//! The captured image is uploaded as a `Bgra8Unorm` texture, drawn into an
//! output texture of `size * factor` with a linear sampler and read back into
//! a tightly packed BGRA buffer. Input and output textures are cached and
//! recreated whenever either size changes.

use zoom_scale::plan::{scaled_size, Size};

use crate::error::{MagnifierError, Result};
use crate::frame::RawImage;
use crate::render::RenderBackend;

const NAME: &str = "gpu";
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

const SHADER: &str = r#"
struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VsOut {
    // One triangle covering the whole target.
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VsOut;
    out.pos = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return textureSample(source, source_sampler, in.uv);
}
"#;

/// Textures sized for one input/output pair.
struct Targets {
    input_size: Size,
    output_size: Size,
    input: wgpu::Texture,
    output: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// wgpu-backed scaler.
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    targets: Option<Targets>,
}

impl GpuBackend {
    /// Acquire an adapter and device. Fails with
    /// [`MagnifierError::NoGpuAvailable`] when none can be created.
    pub fn new() -> Result<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| MagnifierError::NoGpuAvailable("no adapter found".into()))?;

        log::info!("Using GPU adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("zoomlens"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| MagnifierError::NoGpuAvailable(format!("device request failed: {}", e)))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("zoom shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("zoom bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("zoom pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("zoom pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("zoom sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            layout,
            sampler,
            targets: None,
        })
    }

    fn ensure_targets(&mut self, input_size: Size, output_size: Size) -> Result<()> {
        let reusable = self
            .targets
            .as_ref()
            .is_some_and(|t| t.input_size == input_size && t.output_size == output_size);
        if !reusable {
            let max = self.device.limits().max_texture_dimension_2d;
            if output_size.w > max || output_size.h > max || input_size.w > max || input_size.h > max {
                return Err(MagnifierError::render(
                    NAME,
                    format!("{}x{} exceeds the {} texture limit", output_size.w, output_size.h, max),
                ));
            }
            self.device.push_error_scope(wgpu::ErrorFilter::Validation);
            let targets = self.create_targets(input_size, output_size);
            if let Some(e) = pollster::block_on(self.device.pop_error_scope()) {
                return Err(MagnifierError::render(NAME, format!("texture creation failed: {}", e)));
            }
            log::debug!(
                "gpu textures recreated: {}x{} -> {}x{}",
                input_size.w,
                input_size.h,
                output_size.w,
                output_size.h
            );
            self.targets = Some(targets);
        }
        Ok(())
    }

    fn create_targets(&self, input_size: Size, output_size: Size) -> Targets {
        let texture = |label, size: Size, usage| {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: size.w,
                    height: size.h,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: FORMAT,
                usage,
                view_formats: &[],
            })
        };
        let input = texture(
            "zoom input",
            input_size,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        let output = texture(
            "zoom output",
            output_size,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        let view = input.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("zoom bind group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        Targets {
            input_size,
            output_size,
            input,
            output,
            bind_group,
        }
    }

    fn read_back(&self, texture: &wgpu::Texture, size: Size) -> Result<Vec<u8>> {
        let bytes_per_row = 4 * size.w;
        // Buffer copies need rows aligned to 256 bytes.
        let padded_bytes_per_row = (bytes_per_row + 255) & !255;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("zoom readback"),
            size: padded_bytes_per_row as u64 * size.h as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("zoom readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(size.h),
                },
            },
            wgpu::Extent3d {
                width: size.w,
                height: size.h,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| MagnifierError::render(NAME, "readback callback dropped"))?
            .map_err(|e| MagnifierError::render(NAME, format!("readback failed: {}", e)))?;

        let mapped = slice.get_mapped_range();
        let mut out = Vec::with_capacity(size.bgra_len());
        for row in mapped.chunks(padded_bytes_per_row as usize).take(size.h as usize) {
            out.extend_from_slice(&row[..bytes_per_row as usize]);
        }
        drop(mapped);
        buffer.unmap();
        Ok(out)
    }
}

impl RenderBackend for GpuBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_accelerated(&self) -> bool {
        true
    }

    fn scale(&mut self, image: &RawImage, factor: f64) -> Result<RawImage> {
        if !image.is_consistent() || image.stride % 4 != 0 {
            return Err(MagnifierError::render(NAME, "inconsistent input image"));
        }
        let input_size = image.size();
        let output_size = scaled_size(input_size, factor);
        self.ensure_targets(input_size, output_size)?;
        let Some(targets) = self.targets.as_ref() else {
            return Err(MagnifierError::render(NAME, "textures missing"));
        };

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &targets.input,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(image.stride as u32),
                rows_per_image: Some(input_size.h),
            },
            wgpu::Extent3d {
                width: input_size.w,
                height: input_size.h,
                depth_or_array_layers: 1,
            },
        );

        let view = targets.output.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("zoom encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("zoom pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &targets.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));

        let data = self.read_back(&targets.output, output_size)?;
        Ok(RawImage::from_bgra(data, output_size.w, output_size.h))
    }

    fn release(&mut self) {
        if let Some(targets) = self.targets.take() {
            targets.input.destroy();
            targets.output.destroy();
            log::debug!("gpu textures released");
        }
    }
}
