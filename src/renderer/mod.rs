//! The rendering core: per-kind batch renderers, the frame driver that
//! orchestrates them, and the GPU context they share.
//!
//! The frame driver runs on a single rendering thread. Mutations arriving
//! from other threads (gestures, sensors, UI toggles) are posted as queued
//! events and drained at the start of each frame; nothing outside the render
//! thread touches GPU state directly.

pub mod atlas;
pub mod billboard;
pub mod context;
pub mod labels;
pub mod lines;
pub mod points;

use std::sync::Arc;

use glam::{Mat4, Quat};
use parking_lot::Mutex;

use crate::layers::Layer;
use crate::scene::SceneComposer;
use crate::view::{GestureController, ViewOrientation};

pub use context::GfxContext;
pub use labels::LabelRenderer;
pub use lines::LineRenderer;
pub use points::PointRenderer;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Indices per billboard/segment quad (two triangles).
pub const INDICES_PER_QUAD: usize = 6;

/// Per-pipeline uniform data. Layout must match the WGSL `Uniforms` structs.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4], // 64 B
    pub night_mode: u32,          // +4
    pub _pad: [u32; 3],           // +12 -> 80
}

// Buffer size must match the WGSL-reflected size.
const _: [(); 80] = [(); std::mem::size_of::<SceneUniforms>()];

impl SceneUniforms {
    pub fn new(view_proj: Mat4, night_mode: bool) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            night_mode: night_mode as u32,
            _pad: [0; 3],
        }
    }
}

/// Renderer mutations that may originate off the render thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RendererEvent {
    Pan { dx: f32, dy: f32 },
    Pinch { scale: f32 },
    SetOrientation { azimuth: f32, elevation: f32, roll: f32 },
    SetRotation(Quat),
    SetFieldOfView(f32),
    SetNightMode(bool),
    /// Layer contents changed; re-aggregate on the next frame.
    LayersChanged,
}

struct DepthTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth Target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Frame driver: owns the sub-renderers, the scene composer, and the view
/// state, and runs the per-frame sequence against a surface texture.
pub struct SkyRenderer {
    points: PointRenderer,
    lines: LineRenderer,
    labels: LabelRenderer,
    composer: SceneComposer,
    view: ViewOrientation,
    gestures: GestureController,
    depth: Option<DepthTarget>,
    events: Mutex<Vec<RendererEvent>>,
    night_mode: bool,
    background: wgpu::Color,
    frame_count: u64,
}

const BACKGROUND_DAY: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.08,
    a: 1.0,
};

const BACKGROUND_NIGHT: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

impl SkyRenderer {
    pub fn new() -> Self {
        Self {
            points: PointRenderer::new(),
            lines: LineRenderer::new(),
            labels: LabelRenderer::new(),
            composer: SceneComposer::new(),
            view: ViewOrientation::new(),
            gestures: GestureController::new(),
            depth: None,
            events: Mutex::new(Vec::new()),
            night_mode: false,
            background: BACKGROUND_DAY,
            frame_count: 0,
        }
    }

    // --- Layer management ---

    pub fn add_layer(&mut self, layer: Arc<dyn Layer>) {
        self.composer.add_layer(layer);
    }

    pub fn remove_layer(&mut self, id: &str) -> bool {
        self.composer.remove_layer(id)
    }

    pub fn set_layers(&mut self, layers: Vec<Arc<dyn Layer>>) {
        self.composer.set_layers(layers);
    }

    pub fn composer(&self) -> &SceneComposer {
        &self.composer
    }

    /// Re-aggregate layer data on the next frame. Call after mutating a
    /// layer's contents or visibility.
    pub fn request_layer_update(&mut self) {
        self.composer.mark_changed();
    }

    // --- Cross-thread input ---

    /// Queue a mutation from any thread; applied at the next frame start.
    pub fn post(&self, event: RendererEvent) {
        self.events.lock().push(event);
    }

    fn drain_events(&mut self) {
        let drained: Vec<RendererEvent> = std::mem::take(&mut *self.events.lock());
        for event in drained {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: RendererEvent) {
        match event {
            RendererEvent::Pan { dx, dy } => self.gestures.pan(&mut self.view, dx, dy),
            RendererEvent::Pinch { scale } => self.gestures.pinch(&mut self.view, scale),
            RendererEvent::SetOrientation {
                azimuth,
                elevation,
                roll,
            } => self.view.set_orientation_with_roll(azimuth, elevation, roll),
            RendererEvent::SetRotation(q) => self.view.set_rotation_quaternion(q),
            RendererEvent::SetFieldOfView(fov) => self.view.set_fov(fov),
            RendererEvent::SetNightMode(enabled) => self.set_night_mode(enabled),
            RendererEvent::LayersChanged => self.composer.mark_changed(),
        }
    }

    // --- Display options ---

    pub fn set_night_mode(&mut self, enabled: bool) {
        self.night_mode = enabled;
        self.points.set_night_mode(enabled);
        self.lines.set_night_mode(enabled);
        self.labels.set_night_mode(enabled);
        self.background = if enabled {
            BACKGROUND_NIGHT
        } else {
            BACKGROUND_DAY
        };
    }

    pub fn is_night_mode(&self) -> bool {
        self.night_mode
    }

    pub fn set_background(&mut self, color: wgpu::Color) {
        self.background = color;
    }

    /// Scale factors apply at the next geometry rebuild.
    pub fn set_point_size_factor(&mut self, factor: f32) {
        self.points.set_size_factor(factor);
    }

    pub fn set_line_width_factor(&mut self, factor: f32) {
        self.lines.set_width_factor(factor);
    }

    pub fn set_font_scale(&mut self, scale: f32) {
        self.labels.set_font_scale(scale);
    }

    pub fn view(&self) -> &ViewOrientation {
        &self.view
    }

    /// Direct view access for render-thread callers; off-thread callers go
    /// through [`SkyRenderer::post`].
    pub fn view_mut(&mut self) -> &mut ViewOrientation {
        &mut self.view
    }

    // --- Surface lifecycle ---

    /// Initialize GPU resources. Runs on the rendering thread after the
    /// surface exists; safe to call again after `release`.
    pub fn surface_created(
        &mut self,
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) {
        self.points.initialize(device, target_format);
        self.lines.initialize(device, target_format);
        self.labels.initialize(device, target_format);
        self.depth = Some(DepthTarget::new(device, width, height));
        self.view.set_viewport(width, height);
        self.composer.mark_changed();
        log::info!("renderers initialized for {}x{} surface", width, height);
    }

    pub fn surface_resized(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.depth = Some(DepthTarget::new(device, width, height));
        self.view.set_viewport(width, height);
    }

    /// Per-frame sequence: drain queued input, re-aggregate layers if dirty,
    /// then draw lines, points, and labels back-to-front with depth writes
    /// disabled, over the configured clear color.
    pub fn draw_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
    ) {
        if self.depth.is_none() {
            // Surface not created yet
            return;
        }

        self.frame_count += 1;

        self.drain_events();
        let view_proj = self.view.view_proj();

        if self.composer.is_dirty() {
            let batches = self.composer.aggregate();
            self.points.update_points(device, &batches.points);
            self.lines.update_lines(device, &batches.lines);
            self.labels.update_labels(device, queue, &batches.labels);
        }

        // Sampled diagnostics; every frame would swamp the log
        if self.frame_count % 60 == 1 {
            log::debug!(
                "frame {}: {} points, {} segments, {} labels",
                self.frame_count,
                self.points.point_count(),
                self.lines.segment_count(),
                self.labels.label_count()
            );
        }

        let Some(depth) = &self.depth else { return };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sky Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // Back to front; the pipelines leave depth writes disabled so
            // translucent overlaps blend instead of z-fighting.
            self.lines.draw(&mut pass, queue, view_proj);
            self.points.draw(&mut pass, queue, view_proj);
            self.labels.draw(&mut pass, queue, view_proj);
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Drop all GPU state; the renderer can be re-initialized afterwards.
    pub fn release(&mut self) {
        self.points.release();
        self.lines.release();
        self.labels.release();
        self.depth = None;
    }
}

impl Default for SkyRenderer {
    fn default() -> Self {
        Self::new()
    }
}
