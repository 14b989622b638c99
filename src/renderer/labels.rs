//! Batched text renderer: labels rasterized into a shared atlas texture and
//! drawn as billboards referencing UV sub-rectangles.

use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::primitives::LabelPrimitive;
use crate::renderer::atlas::{AtlasEntry, LabelAtlas};
use crate::renderer::billboard::{
    LABEL_WORLD_SCALE, TexturedVertex, billboard_axes, quad_indices,
};
use crate::renderer::context::with_validation;
use crate::renderer::{INDICES_PER_QUAD, SceneUniforms};
use crate::types::unpack_argb;

struct LabelGpu {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
}

struct LabelBatch {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    /// Keeps the atlas texture alive while its view is bound.
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    quad_count: usize,
}

pub struct LabelRenderer {
    gpu: Option<LabelGpu>,
    batch: Option<LabelBatch>,
    label_count: usize,
    font_scale: f32,
    night_mode: bool,
    failed: bool,
}

impl LabelRenderer {
    pub fn new() -> Self {
        Self {
            gpu: None,
            batch: None,
            label_count: 0,
            font_scale: 1.0,
            night_mode: false,
            failed: false,
        }
    }

    /// Must run on the rendering thread before any update/draw.
    pub fn initialize(&mut self, device: &wgpu::Device, target_format: wgpu::TextureFormat) {
        if self.gpu.is_some() || self.failed {
            return;
        }
        match with_validation(device, || create_gpu_state(device, target_format)) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(err) => {
                log::error!("label pipeline creation failed, renderer disabled: {err}");
                self.failed = true;
            }
        }
    }

    /// Rebuild the atlas and billboard geometry for a new label set. This is
    /// the expensive path — O(total label count) — so callers invoke it only
    /// when the labels actually changed.
    pub fn update_labels(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        labels: &[LabelPrimitive],
    ) {
        self.label_count = labels.len();
        if labels.is_empty() {
            self.batch = None;
            return;
        }
        let Some(gpu) = &self.gpu else {
            // Not initialized; nothing to upload to yet
            return;
        };

        let atlas = LabelAtlas::build(labels, self.font_scale);
        let (vertices, indices) = build_label_geometry(labels, &atlas.entries);
        if vertices.is_empty() {
            self.batch = None;
            return;
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Label Atlas"),
            size: wgpu::Extent3d {
                width: atlas.width,
                height: atlas.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &atlas.pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(atlas.width),
                rows_per_image: Some(atlas.height),
            },
            wgpu::Extent3d {
                width: atlas.width,
                height: atlas.height,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Label Bind Group"),
            layout: &gpu.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: gpu.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&gpu.sampler),
                },
            ],
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Label VB"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Label IB"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        self.batch = Some(LabelBatch {
            vertex_buffer,
            index_buffer,
            _texture: texture,
            bind_group,
            quad_count: vertices.len() / 4,
        });
    }

    pub fn draw<'a>(
        &'a self,
        rpass: &mut wgpu::RenderPass<'a>,
        queue: &wgpu::Queue,
        view_proj: Mat4,
    ) {
        let (Some(gpu), Some(batch)) = (&self.gpu, &self.batch) else {
            return;
        };
        if batch.quad_count == 0 {
            return;
        }

        let uniforms = SceneUniforms::new(view_proj, self.night_mode);
        queue.write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        rpass.set_pipeline(&gpu.pipeline);
        rpass.set_bind_group(0, &batch.bind_group, &[]);
        rpass.set_vertex_buffer(0, batch.vertex_buffer.slice(..));
        rpass.set_index_buffer(batch.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..(batch.quad_count * INDICES_PER_QUAD) as u32, 0, 0..1);
    }

    /// Applies at the next `update_labels`.
    pub fn set_font_scale(&mut self, scale: f32) {
        self.font_scale = scale;
    }

    pub fn set_night_mode(&mut self, enabled: bool) {
        self.night_mode = enabled;
    }

    pub fn label_count(&self) -> usize {
        self.label_count
    }

    pub fn is_ready(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn release(&mut self) {
        self.gpu = None;
        self.batch = None;
        self.label_count = 0;
        self.failed = false;
    }
}

impl Default for LabelRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Billboard quads for every label that received an atlas entry. The quad is
/// displaced along the "down" tangent by the label's offset; texture v runs
/// downward, so the top corners take v0.
pub(crate) fn build_label_geometry(
    labels: &[LabelPrimitive],
    entries: &[Option<AtlasEntry>],
) -> (Vec<TexturedVertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for (label, entry) in labels.iter().zip(entries) {
        let Some(entry) = entry else { continue };

        let anchor = label.location().to_vector3();
        let (u, v) = billboard_axes(anchor);
        let center = anchor - v * label.offset();
        let half_u = u * (entry.width as f32 * LABEL_WORLD_SCALE * 0.5);
        let half_v = v * (entry.height as f32 * LABEL_WORLD_SCALE * 0.5);

        let corners = [
            center - half_u - half_v,
            center - half_u + half_v,
            center + half_u - half_v,
            center + half_u + half_v,
        ];
        let uvs = [
            [entry.u0, entry.v1],
            [entry.u0, entry.v0],
            [entry.u1, entry.v1],
            [entry.u1, entry.v0],
        ];
        let color = unpack_argb(label.color());

        let quad = (vertices.len() / 4) as u32;
        for i in 0..4 {
            vertices.push(TexturedVertex {
                position: corners[i].to_array(),
                color,
                tex_coord: uvs[i],
            });
        }
        indices.extend(quad_indices(quad));
    }

    (vertices, indices)
}

fn create_gpu_state(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> LabelGpu {
    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Label Uniform Buffer"),
        size: std::mem::size_of::<SceneUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Label BGL"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
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

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Label Atlas Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Label WGSL"),
        source: wgpu::ShaderSource::Wgsl(LABEL_WGSL.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Label Pipeline Layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Label Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<TexturedVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute {
                        shader_location: 0,
                        offset: 0,
                        format: wgpu::VertexFormat::Float32x3,
                    },
                    wgpu::VertexAttribute {
                        shader_location: 1,
                        offset: 12,
                        format: wgpu::VertexFormat::Float32x4,
                    },
                    wgpu::VertexAttribute {
                        shader_location: 2,
                        offset: 28,
                        format: wgpu::VertexFormat::Float32x2,
                    },
                ],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: crate::renderer::DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    LabelGpu {
        pipeline,
        bind_group_layout,
        uniform_buffer,
        sampler,
    }
}

const LABEL_WGSL: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    night_mode: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};
@group(0) @binding(0) var<uniform> U: Uniforms;
@group(0) @binding(1) var atlas: texture_2d<f32>;
@group(0) @binding(2) var atlas_sampler: sampler;

struct VSOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
}

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) uv: vec2<f32>,
) -> VSOut {
    var out: VSOut;
    out.clip = U.view_proj * vec4<f32>(position, 1.0);
    out.color = color;
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VSOut) -> @location(0) vec4<f32> {
    let coverage = textureSample(atlas, atlas_sampler, in.uv).r;

    var color = in.color;
    if (U.night_mode == 1u) {
        let gray = 0.299 * color.r + 0.587 * color.g + 0.114 * color.b;
        color = vec4<f32>(gray * 0.8, gray * 0.1, gray * 0.1, color.a);
    }

    return vec4<f32>(color.rgb, color.a * coverage);
}
"#;
