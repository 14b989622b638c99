//! Batched quad renderer for polylines (grid, constellation figures).
//!
//! Each segment becomes a quad widened along an outward-facing perpendicular;
//! the fragment stage fades the quad edges for anti-aliasing.

use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::primitives::LinePrimitive;
use crate::renderer::billboard::{TexturedVertex, append_line_geometry};
use crate::renderer::context::with_validation;
use crate::renderer::{INDICES_PER_QUAD, SceneUniforms};

struct LineGpu {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
}

struct LineGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

pub struct LineRenderer {
    gpu: Option<LineGpu>,
    geometry: Option<LineGeometry>,
    segment_count: usize,
    width_factor: f32,
    night_mode: bool,
    failed: bool,
}

impl LineRenderer {
    pub fn new() -> Self {
        Self {
            gpu: None,
            geometry: None,
            segment_count: 0,
            width_factor: 1.0,
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
                log::error!("line pipeline creation failed, renderer disabled: {err}");
                self.failed = true;
            }
        }
    }

    /// Rebuild per-segment quads for a new line batch.
    pub fn update_lines(&mut self, device: &wgpu::Device, lines: &[LinePrimitive]) {
        let mut vertices: Vec<TexturedVertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        for line in lines {
            append_line_geometry(line, self.width_factor, &mut vertices, &mut indices);
        }

        self.segment_count = vertices.len() / 4;
        if vertices.is_empty() {
            self.geometry = None;
            return;
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Line VB"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Line IB"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.geometry = Some(LineGeometry {
            vertex_buffer,
            index_buffer,
        });
    }

    pub fn draw<'a>(
        &'a self,
        rpass: &mut wgpu::RenderPass<'a>,
        queue: &wgpu::Queue,
        view_proj: Mat4,
    ) {
        let (Some(gpu), Some(geometry)) = (&self.gpu, &self.geometry) else {
            return;
        };
        if self.segment_count == 0 {
            return;
        }

        let uniforms = SceneUniforms::new(view_proj, self.night_mode);
        queue.write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        rpass.set_pipeline(&gpu.pipeline);
        rpass.set_bind_group(0, &gpu.bind_group, &[]);
        rpass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
        rpass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..(self.segment_count * INDICES_PER_QUAD) as u32, 0, 0..1);
    }

    /// Applies at the next `update_lines`.
    pub fn set_width_factor(&mut self, factor: f32) {
        self.width_factor = factor;
    }

    pub fn set_night_mode(&mut self, enabled: bool) {
        self.night_mode = enabled;
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn is_ready(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn release(&mut self) {
        self.gpu = None;
        self.geometry = None;
        self.segment_count = 0;
        self.failed = false;
    }
}

impl Default for LineRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn create_gpu_state(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> LineGpu {
    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Line Uniform Buffer"),
        size: std::mem::size_of::<SceneUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Line BGL"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Line Bind Group"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Line WGSL"),
        source: wgpu::ShaderSource::Wgsl(LINE_WGSL.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Line Pipeline Layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Line Pipeline"),
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

    LineGpu {
        pipeline,
        bind_group,
        uniform_buffer,
    }
}

const LINE_WGSL: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    night_mode: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};
@group(0) @binding(0) var<uniform> U: Uniforms;

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
    // Distance from the segment centerline, 0 at center, 1 at the edge
    let dist = abs(in.uv.y - 0.5) * 2.0;
    let alpha = 1.0 - smoothstep(0.7, 1.0, dist);

    var color = in.color;
    if (U.night_mode == 1u) {
        let gray = 0.299 * color.r + 0.587 * color.g + 0.114 * color.b;
        color = vec4<f32>(gray * 0.8, gray * 0.1, gray * 0.1, color.a);
    }

    return vec4<f32>(color.rgb, color.a * alpha);
}
"#;
