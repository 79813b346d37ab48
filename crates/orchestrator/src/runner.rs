//! Frame runner with an explicit per-frame state machine
//!
//! This module provides the `FrameRunner`, which owns the charge state, the
//! backend selector and the pixel buffer, and advances them one frame at a
//! time:
//!
//! ```text
//! PollInput -> StepPhysics -> Render -> Present -> UpdateTiming
//! ```
//!
//! Input, presentation and the window caption are reached through the
//! `InputSource`, `Presenter` and `Caption` traits so the loop body can run
//! against test doubles.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use kernel::{
    step, Backend, ChargeArrays, CpuEvaluator, DensityEvaluator, Domain, PixelBuffer,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::config::ViewerConfig;
use crate::timing::{Clock, FpsCounter, FrameClock};

/// Phase of the per-frame cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Drain pending input events
    PollInput,
    /// Advance the charges by the frame's `dt`
    StepPhysics,
    /// Evaluate the density field on the selected backend
    Render,
    /// Hand the pixel buffer to the presentation surface
    Present,
    /// Count the frame and roll the FPS window
    UpdateTiming,
}

impl FramePhase {
    /// Phases in execution order
    pub const ORDER: [FramePhase; 5] = [
        FramePhase::PollInput,
        FramePhase::StepPhysics,
        FramePhase::Render,
        FramePhase::Present,
        FramePhase::UpdateTiming,
    ];

    /// Phase that follows this one; `UpdateTiming` wraps to `PollInput`
    pub fn next(self) -> Self {
        match self {
            FramePhase::PollInput => FramePhase::StepPhysics,
            FramePhase::StepPhysics => FramePhase::Render,
            FramePhase::Render => FramePhase::Present,
            FramePhase::Present => FramePhase::UpdateTiming,
            FramePhase::UpdateTiming => FramePhase::PollInput,
        }
    }
}

/// Logical input events consumed by the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Switch between the GPU and CPU backends
    ToggleBackend,
    /// Leave the loop
    Quit,
}

/// Result of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Keep going
    Continue,
    /// A quit event was seen; the loop should end
    Quit,
}

/// Presentation failure; logged and the loop continues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentError(pub String);

impl std::fmt::Display for PresentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to present frame: {}", self.0)
    }
}

impl std::error::Error for PresentError {}

/// Non-blocking source of input events
pub trait InputSource {
    /// Drain every pending event
    fn poll_events(&mut self) -> Vec<InputEvent>;
}

impl InputSource for VecDeque<InputEvent> {
    fn poll_events(&mut self) -> Vec<InputEvent> {
        self.drain(..).collect()
    }
}

/// Presentation surface the finished frame is handed to
pub trait Presenter {
    /// Show `pixels`
    fn present(&mut self, pixels: &PixelBuffer) -> Result<(), PresentError>;
}

/// Visible title showing the backend and the frame rate
pub trait Caption {
    /// Update the title; never fails
    fn set_caption(&mut self, backend_name: &str, fps: f32);
}

/// Caption text for `backend_name` at `fps`
pub fn caption_text(backend_name: &str, fps: f32) -> String {
    format!("Metaball / {backend_name} / {fps:.2}FPS")
}

/// Seed derived from the time of day, for runs without a configured seed
pub fn time_of_day_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Drives the renderer one frame at a time
pub struct FrameRunner<K: Clock> {
    charges: ChargeArrays,
    domain: Domain,
    pixels: PixelBuffer,
    cpu: CpuEvaluator,
    gpu: Option<Box<dyn DensityEvaluator>>,
    /// Written only in PollInput, read once per frame in Render
    backend: Backend,
    clock: K,
    frame_clock: FrameClock,
    fps: FpsCounter,
    phase: FramePhase,
    frame_count: u64,
    warned_missing_gpu: bool,
}

impl<K: Clock> FrameRunner<K> {
    /// Create a runner over an explicit charge layout
    ///
    /// # Arguments
    /// * `charges` - Initial charge state; its count is fixed for the run
    /// * `width`, `height` - Field size in pixels (also the bounce domain)
    /// * `backend` - Initially selected backend
    /// * `gpu` - GPU evaluator, or `None` to run CPU-only
    /// * `clock` - Time source for `dt` and the FPS window
    /// * `fps_window` - Length of the rolling FPS window
    pub fn new(
        charges: ChargeArrays,
        width: u32,
        height: u32,
        backend: Backend,
        gpu: Option<Box<dyn DensityEvaluator>>,
        clock: K,
        fps_window: Duration,
    ) -> Self {
        let fps = FpsCounter::new(clock.now(), fps_window);
        Self {
            charges,
            domain: Domain::new(width as f32, height as f32),
            pixels: PixelBuffer::new(width, height),
            cpu: CpuEvaluator::new(),
            gpu,
            backend,
            clock,
            frame_clock: FrameClock::new(),
            fps,
            phase: FramePhase::UpdateTiming,
            frame_count: 0,
            warned_missing_gpu: false,
        }
    }

    /// Create a runner from a validated configuration, seeding the charges
    /// from `config.seed` or the time of day
    pub fn from_config(
        config: &ViewerConfig,
        gpu: Option<Box<dyn DensityEvaluator>>,
        clock: K,
    ) -> Self {
        let seed = config.seed.unwrap_or_else(time_of_day_seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let charges = ChargeArrays::seeded(
            config.n_charges,
            config.width as f32,
            config.height as f32,
            config.speed,
            &mut rng,
        );
        tracing::info!(
            "Seeded {} charges at {} px/s (seed {})",
            charges.len(),
            config.speed,
            seed
        );

        Self::new(
            charges,
            config.width,
            config.height,
            config.initial_backend,
            gpu,
            clock,
            config.fps_window(),
        )
    }

    /// Run one full cycle
    ///
    /// A `Quit` event ends the frame during PollInput, before anything is
    /// stepped or drawn.
    pub fn run_frame(
        &mut self,
        input: &mut dyn InputSource,
        presenter: &mut dyn Presenter,
        caption: &mut dyn Caption,
    ) -> FrameOutcome {
        // --- PollInput ---
        self.phase = FramePhase::PollInput;
        let dt = self.frame_clock.begin_frame(self.clock.now());
        for event in input.poll_events() {
            match event {
                InputEvent::ToggleBackend => {
                    self.backend = self.backend.toggled();
                    tracing::info!("Switched to {} backend", self.backend.name());
                    self.refresh_caption(caption);
                }
                InputEvent::Quit => {
                    tracing::info!("Quit requested after {} frames", self.frame_count);
                    return FrameOutcome::Quit;
                }
            }
        }

        // --- StepPhysics ---
        self.phase = FramePhase::StepPhysics;
        step(&mut self.charges, self.domain, dt);

        // --- Render ---
        self.phase = FramePhase::Render;
        self.render();

        // --- Present ---
        self.phase = FramePhase::Present;
        if let Err(e) = presenter.present(&self.pixels) {
            tracing::warn!("{e}");
        }

        // --- UpdateTiming ---
        self.phase = FramePhase::UpdateTiming;
        self.frame_count += 1;
        if let Some(fps) = self.fps.record_frame(self.clock.now()) {
            tracing::debug!("{:.2} FPS on {}", fps, self.backend.name());
            self.refresh_caption(caption);
        }

        FrameOutcome::Continue
    }

    /// Run frames until a `Quit` event
    pub fn run(
        &mut self,
        input: &mut dyn InputSource,
        presenter: &mut dyn Presenter,
        caption: &mut dyn Caption,
    ) {
        while self.run_frame(input, presenter, caption) == FrameOutcome::Continue {}
    }

    /// Push the current backend name and FPS to the caption
    pub fn refresh_caption(&self, caption: &mut dyn Caption) {
        caption.set_caption(self.backend.name(), self.fps.fps());
    }

    fn render(&mut self) {
        let result = match (self.backend, self.gpu.as_mut()) {
            (Backend::Gpu, Some(gpu)) => gpu.render(&self.charges, &mut self.pixels),
            (Backend::Gpu, None) => {
                if !self.warned_missing_gpu {
                    tracing::warn!("GPU backend selected but no GPU evaluator; rendering on CPU");
                    self.warned_missing_gpu = true;
                }
                self.cpu.render(&self.charges, &mut self.pixels)
            }
            (Backend::Cpu, _) => self.cpu.render(&self.charges, &mut self.pixels),
        };
        if let Err(e) = result {
            tracing::warn!("{} render failed: {e}", self.backend.name());
        }
    }

    /// Currently selected backend
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Last phase executed
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// FPS of the last completed window
    pub fn fps(&self) -> f32 {
        self.fps.fps()
    }

    /// Frames completed so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Current charge state
    pub fn charges(&self) -> &ChargeArrays {
        &self.charges
    }

    /// Most recently rendered frame
    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }
}
