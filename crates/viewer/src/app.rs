//! winit application: window, pixels surface and input translation.

use std::collections::VecDeque;
use std::sync::Arc;

use kernel::PixelBuffer;
use orchestrator::runner::{
    caption_text, Caption, FrameOutcome, InputEvent, PresentError, Presenter,
};
use orchestrator::{FrameRunner, SystemClock};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Window plus the pixel surface drawn into it.
struct Surface {
    window: Arc<Window>,
    pixels: Pixels<'static>,
}

/// Presents finished frames through `pixels`.
struct PixelsPresenter<'a>(&'a mut Pixels<'static>);

impl Presenter for PixelsPresenter<'_> {
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), PresentError> {
        frame.write_rgba(self.0.frame_mut());
        self.0.render().map_err(|e| PresentError(e.to_string()))
    }
}

/// Shows backend and FPS in the window title.
struct WindowCaption<'a>(&'a Window);

impl Caption for WindowCaption<'_> {
    fn set_caption(&mut self, backend_name: &str, fps: f32) {
        self.0.set_title(&caption_text(backend_name, fps));
    }
}

/// Logical input for a key transition, if any.
fn input_for_key(key: KeyCode, state: ElementState) -> Option<InputEvent> {
    match (key, state) {
        (KeyCode::Space, ElementState::Released) => Some(InputEvent::ToggleBackend),
        _ => None,
    }
}

pub struct App {
    runner: FrameRunner<SystemClock>,
    width: u32,
    height: u32,
    input: VecDeque<InputEvent>,
    surface: Option<Surface>,
    startup_error: Option<String>,
}

impl App {
    pub fn new(runner: FrameRunner<SystemClock>, width: u32, height: u32) -> Self {
        Self {
            runner,
            width,
            height,
            input: VecDeque::new(),
            surface: None,
            startup_error: None,
        }
    }

    /// Startup failure recorded while the event loop was running, if any.
    pub fn finish(self) -> Result<(), String> {
        match self.startup_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_surface(&self, event_loop: &ActiveEventLoop) -> Result<Surface, String> {
        let attrs = Window::default_attributes()
            .with_title(caption_text(self.runner.backend().name(), 0.0))
            .with_inner_size(PhysicalSize::new(self.width, self.height))
            .with_resizable(false);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| format!("Failed to create window: {e}"))?,
        );

        let size = window.inner_size();
        let texture = SurfaceTexture::new(size.width, size.height, Arc::clone(&window));
        let pixels = Pixels::new(self.width, self.height, texture)
            .map_err(|e| format!("Failed to create pixel surface: {e}"))?;

        tracing::info!(
            "Window: {}x{} physical, {}x{} buffer",
            size.width,
            size.height,
            self.width,
            self.height
        );
        Ok(Surface { window, pixels })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }
        match self.create_surface(event_loop) {
            Ok(surface) => {
                self.runner
                    .refresh_caption(&mut WindowCaption(&surface.window));
                surface.window.request_redraw();
                self.surface = Some(surface);
            }
            Err(e) => {
                self.startup_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.input.push_back(InputEvent::Quit);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(input) = input_for_key(key_code, state) {
                    self.input.push_back(input);
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(surface) = self.surface.as_mut() else {
                    return;
                };
                let mut presenter = PixelsPresenter(&mut surface.pixels);
                let mut caption = WindowCaption(&surface.window);
                let outcome = self
                    .runner
                    .run_frame(&mut self.input, &mut presenter, &mut caption);
                if outcome == FrameOutcome::Quit {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref surface) = self.surface {
            surface.window.request_redraw();
        }
    }
}
