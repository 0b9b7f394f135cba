// Display module - presentation window for the PPU's framebuffer (§7)
//
// The core produces RGB555-packed scanlines (`Ppu::framebuffer`); this
// module converts them to RGBA8 for `pixels` and drives a `winit` window,
// the same window/framebuffer split the teacher's display module uses.

use crate::keypad::Button;
use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::time::Duration;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

/// Owns the RGBA8 pixels converted from the PPU's RGB555 scanlines.
pub struct FrameBuffer {
    pixels: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer {
            pixels: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT * 4],
        }
    }

    /// Convert a RGB555-in-u16 scanline buffer into this frame's RGBA8 bytes.
    pub fn load_from_rgb555(&mut self, source: &[u16]) {
        for (i, &texel) in source.iter().enumerate() {
            let r = ((texel & 0x1F) as u32 * 255 / 31) as u8;
            let g = (((texel >> 5) & 0x1F) as u32 * 255 / 31) as u8;
            let b = (((texel >> 10) & 0x1F) as u32 * 255 / 31) as u8;
            let offset = i * 4;
            self.pixels[offset] = r;
            self.pixels[offset + 1] = g;
            self.pixels[offset + 2] = b;
            self.pixels[offset + 3] = 0xFF;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Window presentation settings (scale, vsync, target fps).
#[derive(Debug, Clone, Copy)]
pub struct WindowConfig {
    pub scale: u32,
    pub target_fps: f64,
    pub vsync: bool,
}

impl WindowConfig {
    pub fn new() -> Self {
        WindowConfig {
            scale: 2,
            target_fps: 59.7275,
            vsync: true,
        }
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.clamp(1, 8);
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn window_width(&self) -> u32 {
        SCREEN_WIDTH as u32 * self.scale
    }

    pub fn window_height(&self) -> u32 {
        SCREEN_HEIGHT as u32 * self.scale
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a winit logical key to the keypad button it drives, if any.
pub fn button_for_key(key: &Key) -> Option<Button> {
    match key {
        Key::Named(NamedKey::ArrowUp) => Some(Button::Up),
        Key::Named(NamedKey::ArrowDown) => Some(Button::Down),
        Key::Named(NamedKey::ArrowLeft) => Some(Button::Left),
        Key::Named(NamedKey::ArrowRight) => Some(Button::Right),
        Key::Named(NamedKey::Enter) => Some(Button::Start),
        Key::Named(NamedKey::Backspace) => Some(Button::Select),
        Key::Character(c) => match c.as_str() {
            "x" | "X" => Some(Button::A),
            "z" | "Z" => Some(Button::B),
            "a" | "A" => Some(Button::L),
            "s" | "S" => Some(Button::R),
            _ => None,
        },
        _ => None,
    }
}

/// Window + pixel-buffer pair driven by the `winit` event loop.
pub struct DisplayWindow {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    config: WindowConfig,
    frame_buffer: FrameBuffer,
    on_key: Box<dyn FnMut(Button, bool) + Send>,
    on_redraw: Box<dyn FnMut(&mut FrameBuffer) + Send>,
}

impl DisplayWindow {
    pub fn new(
        config: WindowConfig,
        on_key: impl FnMut(Button, bool) + Send + 'static,
        on_redraw: impl FnMut(&mut FrameBuffer) + Send + 'static,
    ) -> Self {
        DisplayWindow {
            window: None,
            pixels: None,
            config,
            frame_buffer: FrameBuffer::new(),
            on_key: Box::new(on_key),
            on_redraw: Box::new(on_redraw),
        }
    }

    fn render(&mut self) {
        (self.on_redraw)(&mut self.frame_buffer);
        if let Some(pixels) = &mut self.pixels {
            pixels.frame_mut().copy_from_slice(self.frame_buffer.as_slice());
            if let Err(err) = pixels.render() {
                log::error!("render error: {err}");
            }
        }
    }
}

impl ApplicationHandler for DisplayWindow {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("gba-rs")
            .with_inner_size(LogicalSize::new(
                self.config.window_width(),
                self.config.window_height(),
            ))
            .with_resizable(false);

        let window = event_loop
            .create_window(window_attributes)
            .expect("failed to create window");
        let window = Arc::new(window);
        let size = window.inner_size();
        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        let pixels = Pixels::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, surface_texture)
            .expect("failed to create pixel buffer");

        self.window = Some(window);
        self.pixels = Some(pixels);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event: KeyEvent { logical_key, state, .. },
                ..
            } => {
                if let Some(button) = button_for_key(&logical_key) {
                    (self.on_key)(button, state == ElementState::Pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

pub fn run_display(
    config: WindowConfig,
    on_key: impl FnMut(Button, bool) + Send + 'static,
    on_redraw: impl FnMut(&mut FrameBuffer) + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(if config.vsync {
        ControlFlow::Wait
    } else {
        ControlFlow::Poll
    });

    let mut display = DisplayWindow::new(config, on_key, on_redraw);
    event_loop.run_app(&mut display)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_config_scales_dimensions() {
        let config = WindowConfig::new().with_scale(3);
        assert_eq!(config.window_width(), SCREEN_WIDTH as u32 * 3);
        assert_eq!(config.window_height(), SCREEN_HEIGHT as u32 * 3);
    }

    #[test]
    fn scale_clamps_to_valid_range() {
        assert_eq!(WindowConfig::new().with_scale(0).scale, 1);
        assert_eq!(WindowConfig::new().with_scale(99).scale, 8);
    }

    #[test]
    fn rgb555_conversion_spreads_5_bit_channels_to_8_bit() {
        let mut fb = FrameBuffer::new();
        fb.load_from_rgb555(&[0x7FFF]);
        assert_eq!(&fb.as_slice()[0..4], &[255, 255, 255, 255]);
    }

    #[test]
    fn key_mapping_covers_all_gba_buttons() {
        assert_eq!(button_for_key(&Key::Named(NamedKey::ArrowUp)), Some(Button::Up));
        assert_eq!(
            button_for_key(&Key::Character("x".into())),
            Some(Button::A)
        );
        assert_eq!(button_for_key(&Key::Named(NamedKey::Escape)), None);
    }
}
