//! Frame timing: per-frame `dt` and the rolling FPS window.

use std::time::{Duration, Instant};

/// Source of the current time.
///
/// The runner asks its clock for `now()` at the start of each frame and
/// again when the frame's timing is recorded.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Wall-clock delta between consecutive frame starts.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last_start: Option<Instant>,
}

impl FrameClock {
    /// Create a clock that has not seen a frame yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a frame and return the seconds since the previous
    /// frame start. The first call returns 0.
    pub fn begin_frame(&mut self, now: Instant) -> f32 {
        let dt = match self.last_start {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f32(),
            None => 0.0,
        };
        self.last_start = Some(now);
        dt
    }
}

/// Frames per second over a rolling window.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: Duration,
    window_start: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    /// Start counting at `start` with a window of `window`.
    pub fn new(start: Instant, window: Duration) -> Self {
        Self {
            window,
            window_start: start,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Count one finished frame.
    ///
    /// Once at least the window has elapsed since the window start, returns
    /// `frames / elapsed` and restarts the window at `now`.
    pub fn record_frame(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }
        self.fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = now;
        Some(self.fps)
    }

    /// FPS of the last completed window; 0 before the first rollover.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Frames counted in the current window.
    pub fn frames_in_window(&self) -> u32 {
        self.frames
    }
}
