//! Metaball Density-Field Kernel
//!
//! This crate provides the compute core of the metaball renderer: a fixed
//! population of moving point charges and the per-pixel density field they
//! produce. It is designed to be separable from any windowing or input layer.
//!
//! # Modules
//! - [`charge`] -- Fixed-capacity interleaved charge storage and seeding.
//! - [`stepper`] -- Per-frame motion with elastic reflection at the domain walls.
//! - [`pixel`] -- Row-major RGB pixel buffer handed to the presentation layer.
//! - [`density`] -- Inverse-square density, color mapping, and the CPU backend.
//! - `gpu` (feature `gpu`) -- wgpu compute backend with the same semantics.

#![warn(missing_docs)]

pub mod charge;
pub mod density;
pub mod pixel;
pub mod stepper;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use charge::{CapacityError, ChargeArrays};
pub use density::{density_at, shade, CpuEvaluator};
pub use pixel::PixelBuffer;
pub use stepper::{step, Domain};

#[cfg(feature = "gpu")]
pub use gpu::{GpuEvaluator, GpuInitError};

/// File name the device program is loaded from at startup.
pub const KERNEL_SOURCE_NAME: &str = "metaball.wgsl";

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// Compute strategy used to evaluate the density field for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Backend {
    /// External compute device via wgpu.
    Gpu,
    /// Parallel per-row loop on the host.
    Cpu,
}

impl Backend {
    /// The other backend.
    pub fn toggled(self) -> Self {
        match self {
            Backend::Gpu => Backend::Cpu,
            Backend::Cpu => Backend::Gpu,
        }
    }

    /// Human-readable name shown in the window caption.
    pub fn name(self) -> &'static str {
        match self {
            Backend::Gpu => "wgpu(GPU)",
            Backend::Cpu => "CPU",
        }
    }
}

// ---------------------------------------------------------------------------
// DensityEvaluator trait
// ---------------------------------------------------------------------------

/// Non-fatal failure while producing a frame.
///
/// The caller is expected to log it and present whatever the pixel buffer
/// holds; a degraded frame is preferred over stopping the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Charge positions could not be handed to the device.
    Upload(String),
    /// The per-pixel program failed to launch or run.
    Dispatch(String),
    /// The produced pixels could not be copied back to host memory.
    Download(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Upload(msg) => write!(f, "failed to upload charge positions: {msg}"),
            RenderError::Dispatch(msg) => write!(f, "failed to execute kernel: {msg}"),
            RenderError::Download(msg) => write!(f, "failed to read back pixel buffer: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Trait that every density-field backend (CPU, GPU) implements.
///
/// A `DensityEvaluator` reads the current charge positions and writes one
/// color triple per pixel into the output buffer. Both backends use the same
/// formula and thresholding (see [`density::shade`]), so their outputs agree
/// up to floating-point rounding.
pub trait DensityEvaluator {
    /// Which backend this evaluator implements.
    fn backend(&self) -> Backend;

    /// Evaluate the density field for `charges` into `out`.
    ///
    /// `charges` is only read; `out` is exclusively borrowed for the call.
    fn render(&mut self, charges: &ChargeArrays, out: &mut PixelBuffer) -> Result<(), RenderError>;
}
