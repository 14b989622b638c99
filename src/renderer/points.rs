//! Batched billboard renderer for point primitives (stars, planets).

use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::primitives::PointPrimitive;
use crate::renderer::billboard::{PointVertex, point_vertices, quad_indices};
use crate::renderer::context::with_validation;
use crate::renderer::{INDICES_PER_QUAD, SceneUniforms};

struct PointGpu {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
}

struct PointGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

/// Owns the GPU buffers for the current point batch and rebuilds them from
/// scratch whenever the input list changes.
pub struct PointRenderer {
    gpu: Option<PointGpu>,
    geometry: Option<PointGeometry>,
    point_count: usize,
    size_factor: f32,
    night_mode: bool,
    failed: bool,
}

impl PointRenderer {
    pub fn new() -> Self {
        Self {
            gpu: None,
            geometry: None,
            point_count: 0,
            size_factor: 1.0,
            night_mode: false,
            failed: false,
        }
    }

    /// Create the shader, pipeline, and uniform buffer. Must run on the
    /// rendering thread before any update/draw. A validation failure leaves
    /// the renderer not-ready; draws then do nothing.
    pub fn initialize(&mut self, device: &wgpu::Device, target_format: wgpu::TextureFormat) {
        if self.gpu.is_some() || self.failed {
            return;
        }
        match with_validation(device, || create_gpu_state(device, target_format)) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(err) => {
                log::error!("point pipeline creation failed, renderer disabled: {err}");
                self.failed = true;
            }
        }
    }

    /// Rebuild the vertex/index buffers for a new point batch.
    pub fn update_points(&mut self, device: &wgpu::Device, points: &[PointPrimitive]) {
        self.point_count = points.len();
        if points.is_empty() {
            self.geometry = None;
            return;
        }

        let mut vertices: Vec<PointVertex> = Vec::with_capacity(points.len() * 4);
        let mut indices: Vec<u32> = Vec::with_capacity(points.len() * INDICES_PER_QUAD);
        for (i, point) in points.iter().enumerate() {
            vertices.extend(point_vertices(point, self.size_factor));
            indices.extend(quad_indices(i as u32));
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point VB"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point IB"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.geometry = Some(PointGeometry {
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
        if self.point_count == 0 {
            return;
        }

        let uniforms = SceneUniforms::new(view_proj, self.night_mode);
        queue.write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        rpass.set_pipeline(&gpu.pipeline);
        rpass.set_bind_group(0, &gpu.bind_group, &[]);
        rpass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
        rpass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..(self.point_count * INDICES_PER_QUAD) as u32, 0, 0..1);
    }

    /// Applies at the next `update_points`, not retroactively.
    pub fn set_size_factor(&mut self, factor: f32) {
        self.size_factor = factor;
    }

    /// Rendering-time color transform; no geometry rebuild.
    pub fn set_night_mode(&mut self, enabled: bool) {
        self.night_mode = enabled;
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn is_ready(&self) -> bool {
        self.gpu.is_some()
    }

    /// Drop all GPU state; the renderer may be initialized again.
    pub fn release(&mut self) {
        self.gpu = None;
        self.geometry = None;
        self.point_count = 0;
        self.failed = false;
    }
}

impl Default for PointRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn create_gpu_state(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> PointGpu {
    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Point Uniform Buffer"),
        size: std::mem::size_of::<SceneUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Point BGL"),
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
        label: Some("Point Bind Group"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Point WGSL"),
        source: wgpu::ShaderSource::Wgsl(POINT_WGSL.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Point Pipeline Layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Point Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<PointVertex>() as u64,
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
                    wgpu::VertexAttribute {
                        shader_location: 3,
                        offset: 36,
                        format: wgpu::VertexFormat::Float32,
                    },
                    wgpu::VertexAttribute {
                        shader_location: 4,
                        offset: 40,
                        format: wgpu::VertexFormat::Uint32,
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
            depth_write_enabled: false, // translucent primitives must not z-fight
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    PointGpu {
        pipeline,
        bind_group,
        uniform_buffer,
    }
}

const POINT_WGSL: &str = r#"
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
    @location(2) @interpolate(flat) shape: u32,
}

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) size: f32,
    @location(4) shape: u32,
) -> VSOut {
    var out: VSOut;
    out.clip = U.view_proj * vec4<f32>(position, 1.0);
    out.color = color;
    out.uv = uv;
    out.shape = shape;
    return out;
}

@fragment
fn fs_main(in: VSOut) -> @location(0) vec4<f32> {
    let pos = in.uv - vec2<f32>(0.5, 0.5);
    let dist = length(pos);
    var alpha = 1.0 - smoothstep(0.4, 0.5, dist);

    if (in.shape == 1u) {
        // Rayed star
        let angle = atan2(pos.y, pos.x);
        let rays = abs(sin(angle * 4.0));
        let star_dist = dist / (0.3 + 0.2 * rays);
        alpha = 1.0 - smoothstep(0.8, 1.0, star_dist);
    } else if (in.shape == 2u) {
        let diamond = abs(pos.x) + abs(pos.y);
        alpha = 1.0 - smoothstep(0.4, 0.5, diamond);
    } else if (in.shape == 3u) {
        let square = max(abs(pos.x), abs(pos.y));
        alpha = 1.0 - smoothstep(0.4, 0.5, square);
    } else if (in.shape == 4u) {
        // Upward triangle: apex at y = 0.45, base at y = -0.35
        alpha = step(abs(pos.x) * 1.6 + pos.y, 0.45) * step(-0.35, pos.y);
    } else if (in.shape == 5u) {
        // Cross: union of a horizontal and a vertical bar
        let bar_h = step(abs(pos.y), 0.08) * step(abs(pos.x), 0.45);
        let bar_v = step(abs(pos.x), 0.08) * step(abs(pos.y), 0.45);
        alpha = max(bar_h, bar_v);
    }

    var color = in.color;
    if (U.night_mode == 1u) {
        let gray = 0.299 * color.r + 0.587 * color.g + 0.114 * color.b;
        color = vec4<f32>(gray * 0.8, gray * 0.1, gray * 0.1, color.a);
    }

    return vec4<f32>(color.rgb, color.a * alpha);
}
"#;
