use anyhow::{Result, bail};

use crate::atlas::AtlasSheet;
use crate::backend::{
    CompositeParams, DrawCmd, LayerKind, LayerUniforms, RenderBackend, TargetId,
};
use crate::coords::Vec2;
use crate::layer::{GROW_RECORDS, RECORD_FLOATS, StreamKind};

use super::{GpuContext, GpuInit};

/// All targets render into this format; layer programs and the composite
/// pass blend premultiplied into it.
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const FLOAT_BYTES: u64 = 4;
const INITIAL_STREAM_BYTES: u64 = (GROW_RECORDS * RECORD_FLOATS) as u64 * FLOAT_BYTES;

// ── GPU uniform layouts ───────────────────────────────────────────────────

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct LayerUniformsRaw {
    camera: [f32; 4],
    sheet_dims: [f32; 2],
    pointer: [f32; 2],
}

impl From<&LayerUniforms> for LayerUniformsRaw {
    fn from(u: &LayerUniforms) -> Self {
        Self {
            camera: u.camera,
            sheet_dims: u.sheet_dims,
            pointer: u.pointer,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CompositeUniformsRaw {
    src_rect: [f32; 4],
    dest_size: [f32; 2],
    root_size: [f32; 2],
    layer_size: [f32; 2],
    rotation: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FillUniformsRaw {
    rect: [f32; 4],
    color: [f32; 4],
    target_size: [f32; 2],
    _pad: [f32; 2],
}

// ── per-target state ──────────────────────────────────────────────────────

/// GPU-kind extras: the layer program, its four vertex streams and the
/// uniform/atlas bindings.
struct GpuLayer {
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    streams: [wgpu::Buffer; 4],
    stream_capacity: [u64; 4],
    uniform_ubo: wgpu::Buffer,
    custom_ubo: wgpu::Buffer,
    atlas_tex: wgpu::Texture,
}

struct Target {
    kind: LayerKind,
    size: Vec2,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    /// One composite uniform buffer per target so every layer's draw onto
    /// the root inside a frame keeps its own parameters.
    composite_ubo: wgpu::Buffer,
    gpu: Option<GpuLayer>,
}

/// [`RenderBackend`] over a headless wgpu device.
///
/// Canvas-kind targets get a minimal rasterizer: rectangle fills land on the
/// GPU, the remaining immediate-mode commands are dropped with a one-time
/// warning and belong to an embedder-supplied 2D rasterizer.
pub struct WgpuBackend {
    ctx: GpuContext,
    root_texture: wgpu::Texture,
    root_view: wgpu::TextureView,
    root_size: Vec2,
    targets: Vec<Target>,
    encoder: Option<wgpu::CommandEncoder>,
    sampler: wgpu::Sampler,
    composite_pipeline: wgpu::RenderPipeline,
    composite_bgl: wgpu::BindGroupLayout,
    fill_pipeline: wgpu::RenderPipeline,
    fill_bgl: wgpu::BindGroupLayout,
    raster_warned: bool,
}

impl WgpuBackend {
    /// Acquires a device and builds the fixed pipelines and the root target.
    pub fn new(width: f32, height: f32) -> Result<Self> {
        Self::with_context(pollster::block_on(GpuContext::new(GpuInit::default()))?, width, height)
    }

    pub fn with_context(ctx: GpuContext, width: f32, height: f32) -> Result<Self> {
        let device = ctx.device();

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lamina sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let (composite_pipeline, composite_bgl) = build_composite_pipeline(device);
        let (fill_pipeline, fill_bgl) = build_fill_pipeline(device);

        let root_size = Vec2::new(width.max(1.0), height.max(1.0));
        let (root_texture, root_view) = color_target(device, root_size, "lamina root target");

        Ok(Self {
            ctx,
            root_texture,
            root_view,
            root_size,
            targets: Vec::new(),
            encoder: None,
            sampler,
            composite_pipeline,
            composite_bgl,
            fill_pipeline,
            fill_bgl,
            raster_warned: false,
        })
    }

    /// The root surface after the latest [`end_frame`](RenderBackend::end_frame).
    pub fn root_texture(&self) -> &wgpu::Texture {
        &self.root_texture
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn build_gpu_layer(&self, label_index: usize) -> GpuLayer {
        let device = self.ctx.device();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lamina layer bgl"),
            entries: &[
                uniform_entry(0, std::mem::size_of::<LayerUniformsRaw>() as u64),
                uniform_entry(1, crate::shader::CUSTOM_UNIFORM_FLOATS as u64 * FLOAT_BYTES),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let stream = |kind: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("lamina layer {label_index} {kind} stream")),
                size: INITIAL_STREAM_BYTES,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let streams = [
            stream("geometry"),
            stream("properties"),
            stream("texcoord"),
            stream("crop"),
        ];

        let uniform_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lamina layer uniforms"),
            size: std::mem::size_of::<LayerUniformsRaw>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let custom_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lamina layer custom uniforms"),
            size: crate::shader::CUSTOM_UNIFORM_FLOATS as u64 * FLOAT_BYTES,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Placeholder until the first atlas upload.
        let atlas_tex = create_atlas_texture(device, 1, 1);

        let bind_group = build_layer_bind_group(
            device,
            &bind_group_layout,
            &uniform_ubo,
            &custom_ubo,
            &atlas_tex,
            &self.sampler,
        );

        GpuLayer {
            pipeline: None,
            bind_group_layout,
            bind_group,
            streams,
            stream_capacity: [INITIAL_STREAM_BYTES; 4],
            uniform_ubo,
            custom_ubo,
            atlas_tex,
        }
    }

    fn clear_pass(&mut self, target: TargetId) {
        let Some(t) = self.targets.get(target.0 as usize) else {
            return;
        };
        let device = self.ctx.device();
        let encoder = self.encoder.get_or_insert_with(|| frame_encoder(device));
        begin_pass(encoder, &t.view, wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT));
    }
}

impl RenderBackend for WgpuBackend {
    fn create_target(&mut self, size: Vec2, kind: LayerKind) -> Result<TargetId> {
        let index = self.targets.len();
        let size = Vec2::new(size.x.max(1.0), size.y.max(1.0));

        let gpu = match kind {
            LayerKind::Gpu => Some(self.build_gpu_layer(index)),
            LayerKind::Canvas => None,
        };

        let device = self.ctx.device();
        let (texture, view) = color_target(device, size, "lamina layer target");
        let composite_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lamina composite uniforms"),
            size: std::mem::size_of::<CompositeUniformsRaw>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.targets.push(Target {
            kind,
            size,
            texture,
            view,
            composite_ubo,
            gpu,
        });

        log::debug!("created {kind:?} target {index} at {}x{}", size.x, size.y);
        Ok(TargetId(index as u32))
    }

    /// Recreating the texture drops its contents; callers repaint after a
    /// resize, matching 2D-canvas semantics.
    fn resize_target(&mut self, target: TargetId, size: Vec2) -> Result<()> {
        let Some(t) = self.targets.get_mut(target.0 as usize) else {
            bail!("resize of unknown target {target:?}");
        };
        let size = Vec2::new(size.x.max(1.0), size.y.max(1.0));
        let (texture, view) = color_target(self.ctx.device(), size, "lamina layer target");
        t.texture = texture;
        t.view = view;
        t.size = size;
        Ok(())
    }

    fn clear_target(&mut self, target: TargetId) {
        self.clear_pass(target);
    }

    fn draw(&mut self, target: TargetId, cmd: DrawCmd) {
        let DrawCmd::Rect { rect, color } = cmd else {
            if !self.raster_warned {
                self.raster_warned = true;
                log::warn!(
                    "wgpu backend rasterizes rectangle fills only; \
                     text/arc/line/image canvas draws are dropped"
                );
            }
            return;
        };
        let Some(t) = self.targets.get(target.0 as usize) else {
            return;
        };

        let uniforms = FillUniformsRaw {
            rect: [rect.x(), rect.y(), rect.width(), rect.height()],
            color: [
                color.r * color.a,
                color.g * color.a,
                color.b * color.a,
                color.a,
            ],
            target_size: [t.size.x, t.size.y],
            _pad: [0.0; 2],
        };

        let device = self.ctx.device();
        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lamina fill uniforms"),
            size: std::mem::size_of::<FillUniformsRaw>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.ctx.queue().write_buffer(&ubo, 0, bytemuck::bytes_of(&uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lamina fill bind group"),
            layout: &self.fill_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        let encoder = self.encoder.get_or_insert_with(|| frame_encoder(device));
        let mut rpass = begin_pass(encoder, &t.view, wgpu::LoadOp::Load);
        rpass.set_pipeline(&self.fill_pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.draw(0..6, 0..1);
    }

    fn upload_stream(&mut self, target: TargetId, kind: StreamKind, data: &[f32]) {
        let Some(t) = self.targets.get_mut(target.0 as usize) else {
            return;
        };
        let Some(gpu) = t.gpu.as_mut() else {
            return;
        };

        let i = kind.index();
        let bytes = bytemuck::cast_slice::<f32, u8>(data);
        if bytes.len() as u64 > gpu.stream_capacity[i] {
            let capacity = (bytes.len() as u64).next_power_of_two();
            gpu.streams[i] = self.ctx.device().create_buffer(&wgpu::BufferDescriptor {
                label: Some("lamina layer stream"),
                size: capacity,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            gpu.stream_capacity[i] = capacity;
        }
        self.ctx.queue().write_buffer(&gpu.streams[i], 0, bytes);
    }

    fn set_uniforms(&mut self, target: TargetId, uniforms: &LayerUniforms) {
        let Some(gpu) = self
            .targets
            .get(target.0 as usize)
            .and_then(|t| t.gpu.as_ref())
        else {
            return;
        };
        let raw = LayerUniformsRaw::from(uniforms);
        self.ctx
            .queue()
            .write_buffer(&gpu.uniform_ubo, 0, bytemuck::bytes_of(&raw));
    }

    fn set_custom_uniforms(&mut self, target: TargetId, data: &[f32; 64]) {
        let Some(gpu) = self
            .targets
            .get(target.0 as usize)
            .and_then(|t| t.gpu.as_ref())
        else {
            return;
        };
        self.ctx
            .queue()
            .write_buffer(&gpu.custom_ubo, 0, bytemuck::cast_slice(data));
    }

    fn upload_atlas(&mut self, target: TargetId, atlas: &AtlasSheet) {
        let Some(t) = self.targets.get_mut(target.0 as usize) else {
            return;
        };
        let Some(gpu) = t.gpu.as_mut() else {
            return;
        };

        let device = self.ctx.device();
        let (width, height) = (atlas.width(), atlas.height());
        gpu.atlas_tex = create_atlas_texture(device, width, height);

        self.ctx.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu.atlas_tex,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            atlas.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        gpu.bind_group = build_layer_bind_group(
            device,
            &gpu.bind_group_layout,
            &gpu.uniform_ubo,
            &gpu.custom_ubo,
            &gpu.atlas_tex,
            &self.sampler,
        );
    }

    fn recompile(&mut self, target: TargetId, vertex_src: &str, fragment_src: &str) -> Result<()> {
        let Some(gpu) = self
            .targets
            .get_mut(target.0 as usize)
            .and_then(|t| t.gpu.as_mut())
        else {
            bail!("recompile on non-GPU target {target:?}");
        };
        let device = self.ctx.device();

        // Hook bodies are user input; trap their validation errors here
        // instead of poisoning the device.
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vs = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lamina layer vertex shader"),
            source: wgpu::ShaderSource::Wgsl(vertex_src.into()),
        });
        let fs = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lamina layer fragment shader"),
            source: wgpu::ShaderSource::Wgsl(fragment_src.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lamina layer pipeline layout"),
            bind_group_layouts: &[&gpu.bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lamina layer pipeline"),
            layout: Some(&layout),

            vertex: wgpu::VertexState {
                module: &vs,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &stream_layouts(),
            },

            fragment: Some(wgpu::FragmentState {
                module: &fs,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(scope.pop()) {
            bail!("layer program rejected: {err}");
        }

        gpu.pipeline = Some(pipeline);
        Ok(())
    }

    fn draw_layer(&mut self, target: TargetId, vertex_count: u32) {
        let Some(t) = self.targets.get(target.0 as usize) else {
            return;
        };
        let Some(gpu) = t.gpu.as_ref() else {
            return;
        };

        let device = self.ctx.device();
        let encoder = self.encoder.get_or_insert_with(|| frame_encoder(device));
        let mut rpass = begin_pass(encoder, &t.view, wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT));

        // No program yet (or the last recompile failed at startup): the
        // clear above still ran, so the layer shows empty rather than stale.
        let Some(pipeline) = gpu.pipeline.as_ref() else {
            return;
        };
        if vertex_count == 0 {
            return;
        }

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &gpu.bind_group, &[]);
        for (slot, stream) in gpu.streams.iter().enumerate() {
            rpass.set_vertex_buffer(slot as u32, stream.slice(..));
        }
        rpass.draw(0..vertex_count, 0..1);
    }

    fn begin_frame(&mut self) {
        let device = self.ctx.device();
        let encoder = self.encoder.get_or_insert_with(|| frame_encoder(device));
        begin_pass(encoder, &self.root_view, wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT));
    }

    fn composite(&mut self, target: TargetId, params: &CompositeParams) {
        let Some(t) = self.targets.get(target.0 as usize) else {
            return;
        };

        let radians = params.rotation_deg.to_radians();
        let uniforms = CompositeUniformsRaw {
            src_rect: [
                params.crop.x(),
                params.crop.y(),
                params.crop.width(),
                params.crop.height(),
            ],
            dest_size: [params.dest_size.x, params.dest_size.y],
            root_size: [self.root_size.x, self.root_size.y],
            layer_size: [t.size.x, t.size.y],
            rotation: [radians.sin(), radians.cos()],
        };
        self.ctx
            .queue()
            .write_buffer(&t.composite_ubo, 0, bytemuck::bytes_of(&uniforms));

        let device = self.ctx.device();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lamina composite bind group"),
            layout: &self.composite_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: t.composite_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&t.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let encoder = self.encoder.get_or_insert_with(|| frame_encoder(device));
        let mut rpass = begin_pass(encoder, &self.root_view, wgpu::LoadOp::Load);
        rpass.set_pipeline(&self.composite_pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.draw(0..6, 0..1);
    }

    fn end_frame(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.ctx.queue().submit([encoder.finish()]);
        }
    }

    fn resize_root(&mut self, size: Vec2) -> Result<()> {
        let size = Vec2::new(size.x.max(1.0), size.y.max(1.0));
        let (texture, view) = color_target(self.ctx.device(), size, "lamina root target");
        self.root_texture = texture;
        self.root_view = view;
        self.root_size = size;
        Ok(())
    }
}

// ── pipeline and resource helpers ─────────────────────────────────────────

fn frame_encoder(device: &wgpu::Device) -> wgpu::CommandEncoder {
    device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("lamina frame encoder"),
    })
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("lamina pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

fn color_target(device: &wgpu::Device, size: Vec2, label: &str) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.x.max(1.0) as u32,
            height: size.y.max(1.0) as u32,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn create_atlas_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("lamina atlas"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn build_layer_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_ubo: &wgpu::Buffer,
    custom_ubo: &wgpu::Buffer,
    atlas_tex: &wgpu::Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let atlas_view = atlas_tex.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("lamina layer bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_ubo.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: custom_ubo.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&atlas_view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn uniform_entry(binding: u32, min_size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: std::num::NonZeroU64::new(min_size),
        },
        count: None,
    }
}

/// Four parallel vertex buffers, one `vec4<f32>` attribute each.
fn stream_layouts() -> [wgpu::VertexBufferLayout<'static>; 4] {
    const STRIDE: u64 = 4 * FLOAT_BYTES;
    [
        wgpu::VertexBufferLayout {
            array_stride: STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x4],
        },
        wgpu::VertexBufferLayout {
            array_stride: STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![1 => Float32x4],
        },
        wgpu::VertexBufferLayout {
            array_stride: STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![2 => Float32x4],
        },
        wgpu::VertexBufferLayout {
            array_stride: STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![3 => Float32x4],
        },
    ]
}

fn build_composite_pipeline(device: &wgpu::Device) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("lamina composite shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/composite.wgsl").into()),
    });

    let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("lamina composite bgl"),
        entries: &[
            uniform_entry(0, std::mem::size_of::<CompositeUniformsRaw>() as u64),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let pipeline = build_quad_pipeline(device, "lamina composite pipeline", &shader, &bgl);
    (pipeline, bgl)
}

fn build_fill_pipeline(device: &wgpu::Device) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("lamina fill shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/fill.wgsl").into()),
    });

    let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("lamina fill bgl"),
        entries: &[uniform_entry(0, std::mem::size_of::<FillUniformsRaw>() as u64)],
    });

    let pipeline = build_quad_pipeline(device, "lamina fill pipeline", &shader, &bgl);
    (pipeline, bgl)
}

/// Bufferless full-quad pipeline: six vertices generated from the vertex
/// index, premultiplied blending into [`TARGET_FORMAT`].
fn build_quad_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    bgl: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bgl],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),

        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },

        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: Some(premul_alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}
