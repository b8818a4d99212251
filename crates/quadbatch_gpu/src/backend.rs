//! wgpu implementation of the quad backend
//!
//! Renders into an offscreen RGBA8 target the size of the viewport. Hosts
//! that present to a window copy or sample [`WgpuBackend::target_texture`].

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use quadbatch_core::{
    BackendError, DrawCall, PixelRect, ReadbackOrigin, RenderBackend, Vertex, Viewport,
};
use wgpu::util::DeviceExt;

use crate::readback::read_texture_region;
use crate::shaders::QUAD_SHADER;
use crate::texture::{GpuTexture, TextureBinder, TEXTURE_FORMAT};

/// Projection uniform, laid out to match `Projection` in the quad shader
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct ProjectionUniforms {
    size: [f32; 4],
}

impl ProjectionUniforms {
    fn new(ortho: Viewport) -> Self {
        Self {
            size: [ortho.width.max(1) as f32, ortho.height.max(1) as f32, 0.0, 0.0],
        }
    }
}

struct Pipelines {
    plain: wgpu::RenderPipeline,
    tinted: wgpu::RenderPipeline,
}

struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    viewport: Viewport,
}

impl RenderTarget {
    fn new(device: &wgpu::Device, viewport: Viewport) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Quad Render Target"),
            size: wgpu::Extent3d {
                width: viewport.width.max(1),
                height: viewport.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            viewport,
        }
    }
}

/// Encoder and pass between `begin_frame` and `end_draws`
struct FrameInFlight {
    pass: wgpu::RenderPass<'static>,
    encoder: wgpu::CommandEncoder,
}

/// Headless wgpu backend for the frame builder
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    binder: TextureBinder,
    pipelines: Pipelines,
    projection_buffer: wgpu::Buffer,
    projection_bind_group: wgpu::BindGroup,
    target: RenderTarget,
    frame: Option<FrameInFlight>,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, width: u32, height: u32) -> Self {
        let viewport = Viewport::new(width, height);
        let binder = TextureBinder::new(&device);

        let projection_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Quad Projection Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let projection_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Projection Buffer"),
            contents: bytemuck::bytes_of(&ProjectionUniforms::new(viewport)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let projection_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Projection Bind Group"),
            layout: &projection_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: projection_buffer.as_entire_binding(),
            }],
        });

        let pipelines = create_pipelines(&device, &projection_layout, binder.layout());
        let target = RenderTarget::new(&device, viewport);

        tracing::debug!(width, height, "wgpu quad backend created");

        Self {
            device,
            queue,
            binder,
            pipelines,
            projection_buffer,
            projection_bind_group,
            target,
            frame: None,
        }
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Wrap a texture created by the host so it can be registered with a canvas.
    pub fn import_texture(&self, texture: wgpu::Texture) -> GpuTexture {
        GpuTexture::from_texture(&self.device, &self.binder, texture)
    }

    /// Texture the last frame was rendered into
    pub fn target_texture(&self) -> &wgpu::Texture {
        &self.target.texture
    }

    pub fn target_size(&self) -> Viewport {
        self.target.viewport
    }
}

impl RenderBackend for WgpuBackend {
    type Texture = GpuTexture;
    type Buffer = wgpu::Buffer;

    fn create_texture(&mut self, width: u32, height: u32) -> Result<GpuTexture, BackendError> {
        Ok(GpuTexture::create(&self.device, &self.binder, width, height)?)
    }

    fn write_texture(
        &mut self,
        texture: &GpuTexture,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), BackendError> {
        Ok(texture.write_rgba_sub_rect(&self.queue, x, y, width, height, pixels)?)
    }

    fn delete_texture(&mut self, texture: GpuTexture) {
        texture.texture().destroy();
    }

    fn allocate_vertex_buffer(
        &mut self,
        previous: Option<wgpu::Buffer>,
        vertices: &[Vertex],
    ) -> wgpu::Buffer {
        if let Some(previous) = previous {
            previous.destroy();
        }
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        })
    }

    fn write_vertex_buffer(&mut self, buffer: &wgpu::Buffer, vertices: &[Vertex]) {
        self.queue
            .write_buffer(buffer, 0, bytemuck::cast_slice(vertices));
    }

    fn allocate_index_buffer(
        &mut self,
        previous: Option<wgpu::Buffer>,
        indices: &[u32],
    ) -> wgpu::Buffer {
        if let Some(previous) = previous {
            previous.destroy();
        }
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        })
    }

    fn set_projection(&mut self, viewport: Viewport, ortho: Viewport) {
        if viewport != self.target.viewport {
            tracing::debug!(
                width = viewport.width,
                height = viewport.height,
                "resizing quad render target"
            );
            self.target = RenderTarget::new(&self.device, viewport);
        }
        self.queue.write_buffer(
            &self.projection_buffer,
            0,
            bytemuck::bytes_of(&ProjectionUniforms::new(ortho)),
        );
    }

    fn begin_frame(&mut self, clear: [f32; 3]) {
        if self.frame.take().is_some() {
            tracing::warn!("begin_frame called with a frame still open, discarding it");
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Quad Frame Encoder"),
            });
        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Quad Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear[0] as f64,
                            g: clear[1] as f64,
                            b: clear[2] as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();

        self.frame = Some(FrameInFlight { pass, encoder });
    }

    fn draw(&mut self, call: DrawCall<'_, GpuTexture, wgpu::Buffer>) {
        let Some(frame) = self.frame.as_mut() else {
            tracing::warn!("draw outside begin_frame/end_draws ignored");
            return;
        };

        let pipeline = if call.uses_color {
            &self.pipelines.tinted
        } else {
            &self.pipelines.plain
        };
        let pass = &mut frame.pass;
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.projection_bind_group, &[]);
        pass.set_bind_group(1, call.texture.bind_group(), &[]);
        pass.set_vertex_buffer(0, call.vertices.slice(..));
        pass.set_index_buffer(call.indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..call.index_count, 0, 0..1);
    }

    fn end_draws(&mut self) {
        let Some(FrameInFlight { pass, encoder }) = self.frame.take() else {
            return;
        };
        drop(pass);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn read_pixels(&mut self, rect: PixelRect) -> Result<Vec<u8>, BackendError> {
        let target = self.target.viewport;
        if rect.x + rect.width > target.width || rect.y + rect.height > target.height {
            return Err(BackendError::Readback(format!(
                "{}x{} at ({}, {}) is outside the {}x{} target",
                rect.width, rect.height, rect.x, rect.y, target.width, target.height
            )));
        }
        Ok(read_texture_region(
            &self.device,
            &self.queue,
            &self.target.texture,
            rect,
        )?)
    }

    fn readback_origin(&self) -> ReadbackOrigin {
        ReadbackOrigin::TopLeft
    }
}

fn create_pipelines(
    device: &wgpu::Device,
    projection_layout: &wgpu::BindGroupLayout,
    texture_layout: &wgpu::BindGroupLayout,
) -> Pipelines {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Quad Shader"),
        source: wgpu::ShaderSource::Wgsl(QUAD_SHADER.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Quad Pipeline Layout"),
        bind_group_layouts: &[projection_layout, texture_layout],
        push_constant_ranges: &[],
    });

    let plain_attributes = wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
    let tinted_attributes =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Unorm8x4];

    let color_targets = &[Some(wgpu::ColorTargetState {
        format: TEXTURE_FORMAT,
        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
        write_mask: wgpu::ColorWrites::ALL,
    })];

    let pipeline = |label: &str, entry_point: &str, attributes: &[wgpu::VertexAttribute]| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(entry_point),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: Vertex::SIZE as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: color_targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    };

    Pipelines {
        plain: pipeline("Quad Pipeline", "vs_plain", &plain_attributes),
        tinted: pipeline("Tinted Quad Pipeline", "vs_tinted", &tinted_attributes),
    }
}
