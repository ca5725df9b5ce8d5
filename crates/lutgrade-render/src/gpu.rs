//! wgpu compute path.
//!
//! Uploads the image and packed LUT as RGBA8 word buffers, dispatches the
//! grading shader and reads the result back through a staging buffer.

use lutgrade_core::PackedLut;
use wgpu::util::DeviceExt;

use crate::{shaders, Rgba8Image, RenderError, RenderResult};

/// GPU sampler holding a device, queue and the grading pipeline.
pub struct GpuSampler {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    max_texture_size: u32,
}

impl GpuSampler {
    /// Checks whether a usable adapter exists.
    pub fn is_available() -> bool {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .is_some()
        })
    }

    /// Creates the device and compiles the grading pipeline.
    pub fn new() -> RenderResult<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
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
            .ok_or(RenderError::NoAdapter)?;

        let adapter_limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("lutgrade_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter_limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| RenderError::DeviceCreation(e.to_string()))?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lut_grade"),
            source: wgpu::ShaderSource::Wgsl(shaders::LUT_GRADE.into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("lut_grade_pipeline"),
            layout: None, // Auto layout
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            max_texture_size: adapter_limits.max_texture_dimension_2d,
        })
    }

    /// Longest edge the device supports for 2D textures.
    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    /// Grades `image` with `lut` on the GPU.
    pub fn apply(&self, image: &Rgba8Image, lut: &PackedLut) -> RenderResult<Rgba8Image> {
        let total = (image.width as u64) * (image.height as u64);
        let src_words = words_from_rgba(&image.pixels);
        let lut_words = words_from_rgba(&lut.texture);

        let src_buf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("src_image"),
            contents: bytemuck::cast_slice(&src_words),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let lut_buf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("packed_lut"),
            contents: bytemuck::cast_slice(&lut_words),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let dims: [u32; 4] = [image.width, image.height, lut.size as u32, lut.width as u32];
        let dims_buf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("dims_uniform"),
            contents: bytemuck::cast_slice(&dims),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let dst_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("dst_image"),
            size: total * 4,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let layout = self.pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lut_grade_bind_group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: src_buf.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: dst_buf.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: dims_buf.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: lut_buf.as_entire_binding() },
            ],
        });

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size: total * 4,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("grade_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("grade_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups((total as u32).div_ceil(256), 1, 1);
        }
        encoder.copy_buffer_to_buffer(&dst_buf, 0, &staging, 0, total * 4);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| RenderError::OperationFailed("map channel closed".into()))?
            .map_err(|e| RenderError::OperationFailed(format!("map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let pixels = data.to_vec();
        drop(data);
        staging.unmap();

        Rgba8Image::from_pixels(image.width, image.height, pixels)
    }
}

/// Reassembles RGBA byte quads into little-endian words so
/// `unpack4x8unorm` sees R in the low byte.
fn words_from_rgba(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
