//! Viewer application glue: window surface, pointer input, frame loop.

use anyhow::Result;
use std::sync::Arc;
use winit::{
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::renderer::{GfxContext, RendererEvent, SkyRenderer};

/// Pointer state for mapping mouse input onto sky gestures.
struct PointerState {
    mouse_down: bool,
    last_position: Option<(f64, f64)>,
}

pub struct App {
    pub gfx: GfxContext,
    pub sky: SkyRenderer,
    pointer: PointerState,
}

impl App {
    /// Bind the renderer to a window surface and initialize GPU resources.
    pub async fn new(window: Arc<Window>, mut sky: SkyRenderer) -> Result<Self> {
        let gfx = GfxContext::new(window).await?;
        sky.surface_created(
            &gfx.device,
            gfx.config.format,
            gfx.size.width,
            gfx.size.height,
        );

        Ok(Self {
            gfx,
            sky,
            pointer: PointerState {
                mouse_down: false,
                last_position: None,
            },
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.sky
                .surface_resized(&self.gfx.device, new_size.width, new_size.height);
        }
    }

    /// Map window events onto renderer events. Returns true when consumed.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::Resized(physical_size) => {
                self.resize(*physical_size);
                false
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if *button == MouseButton::Left {
                    self.pointer.mouse_down = *state == ElementState::Pressed;
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = (position.x, position.y);
                if let Some(last) = self.pointer.last_position {
                    if self.pointer.mouse_down {
                        self.sky.post(RendererEvent::Pan {
                            dx: (current.0 - last.0) as f32,
                            dy: (current.1 - last.1) as f32,
                        });
                    }
                }
                self.pointer.last_position = Some(current);
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                // Scroll up zooms in, like spreading a pinch
                self.sky.post(RendererEvent::Pinch {
                    scale: 1.1f32.powf(scroll),
                });
                true
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyN),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                let enable = !self.sky.is_night_mode();
                self.sky.post(RendererEvent::SetNightMode(enable));
                true
            }
            _ => false,
        }
    }

    /// Draw one frame into the surface.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.gfx.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.sky
            .draw_frame(&self.gfx.device, &self.gfx.queue, &view);

        frame.present();
        Ok(())
    }
}
