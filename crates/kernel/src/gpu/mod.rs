//! GPU (Metal/Vulkan/DX12 via wgpu) implementation of the density evaluator.
//!
//! `GpuEvaluator` implements `DensityEvaluator` with a single compute shader.
//! The device program itself lives in `shaders/metaball.wgsl`; this module
//! only does device bootstrap and data marshalling.
//!
//! # Per-frame sequence
//! 1. `upload` -- queue a write of the charge positions (non-blocking).
//! 2. `dispatch` -- one compute pass over `width * height` invocations,
//!    `@workgroup_size(32)`.
//! 3. `download` -- copy the pixel words to a staging buffer, block until
//!    mapped, unpack into the RGB pixel buffer.
//!
//! The queue is in-order, so the upload is visible to the dispatch and the
//! dispatch has finished before the copy in `download` runs.
//!
//! # Bind group layout
//! - Group 0: ShadeParams (uniform) + charge positions (read) + pixels (read_write)

pub mod buffers;

use std::path::Path;

use buffers::{GpuBuffers, GpuShadeParams};
use crate::charge::ChargeArrays;
use crate::pixel::PixelBuffer;
use crate::{Backend, DensityEvaluator, RenderError};

pub use crate::KERNEL_SOURCE_NAME;
/// Largest accepted device program, in bytes.
pub const KERNEL_SOURCE_BUF_SIZE: u64 = 0x10_0000;
/// Entry point of the density kernel.
pub const KERNEL_NAME: &str = "metaball";
/// Invocations per workgroup; must match `@workgroup_size` in the shader.
pub const LOCAL_WORK_SIZE: u32 = 32;

/// The device program shipped with this crate, for tests and benches.
pub const BUNDLED_SOURCE: &str = include_str!("../../shaders/metaball.wgsl");

/// Error returned when GPU initialization fails.
#[derive(Debug)]
pub struct GpuInitError(pub String);

impl std::fmt::Display for GpuInitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GPU initialization failed: {}", self.0)
    }
}

impl std::error::Error for GpuInitError {}

/// Check whether a GPU adapter is available.
pub fn gpu_available() -> bool {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }));
    adapter.is_some()
}

/// Read the device program from `path`.
///
/// A missing file, or one larger than [`KERNEL_SOURCE_BUF_SIZE`], is an error.
pub fn load_kernel_source(path: &Path) -> Result<String, GpuInitError> {
    let meta = std::fs::metadata(path).map_err(|e| {
        GpuInitError(format!("failed to load kernel source ({}): {e}", path.display()))
    })?;
    if meta.len() > KERNEL_SOURCE_BUF_SIZE {
        return Err(GpuInitError(format!(
            "kernel source ({}) is {} bytes, limit is {}",
            path.display(),
            meta.len(),
            KERNEL_SOURCE_BUF_SIZE
        )));
    }
    std::fs::read_to_string(path).map_err(|e| {
        GpuInitError(format!("failed to load kernel source ({}): {e}", path.display()))
    })
}

/// GPU-accelerated density evaluator using a wgpu compute shader.
pub struct GpuEvaluator {
    // wgpu resources
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,

    // GPU buffers
    bufs: GpuBuffers,

    width: u32,
    height: u32,
    // Workgroup grid; y > 1 only when the pixel count exceeds the
    // per-dimension dispatch limit.
    groups: (u32, u32),
}

impl GpuEvaluator {
    /// Bootstrap the device and build the density program from `source`.
    ///
    /// The evaluator is sized for a `width x height` field over `n_charges`
    /// charges; both are fixed for its lifetime.
    pub fn new(
        source: &str,
        width: u32,
        height: u32,
        n_charges: usize,
    ) -> Result<Self, GpuInitError> {
        // --- Device initialization ---
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| GpuInitError("No suitable GPU adapter found".into()))?;

        tracing::info!("GPU adapter: {:?}", adapter.get_info().name);

        // The pixel buffer is one word per pixel; ask for the adapter's actual
        // storage and dispatch limits so large windows are not rejected by
        // the conservative defaults.
        let adapter_limits = adapter.limits();
        let mut required_limits = wgpu::Limits::default();
        required_limits.max_storage_buffer_binding_size =
            adapter_limits.max_storage_buffer_binding_size;
        required_limits.max_buffer_size = adapter_limits.max_buffer_size;
        required_limits.max_compute_workgroups_per_dimension =
            adapter_limits.max_compute_workgroups_per_dimension;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("metaball_device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| GpuInitError(format!("Failed to create device: {e}")))?;

        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            tracing::warn!("caught an error from the compute device: {err}");
        }));

        let n_charges = u32::try_from(n_charges)
            .map_err(|_| GpuInitError(format!("too many charges: {n_charges}")))?;
        let n_pixels = width
            .checked_mul(height)
            .ok_or_else(|| GpuInitError(format!("field {width}x{height} is too large")))?;

        let limits = device.limits();
        let pixel_bytes = GpuBuffers::pixel_bytes(n_pixels);
        if pixel_bytes > limits.max_storage_buffer_binding_size as u64 {
            return Err(GpuInitError(format!(
                "pixel buffer of {pixel_bytes} bytes exceeds device limit {}",
                limits.max_storage_buffer_binding_size
            )));
        }
        let groups = dispatch_grid(n_pixels, limits.max_compute_workgroups_per_dimension)
            .ok_or_else(|| GpuInitError(format!("field {width}x{height} is too large to dispatch")))?;

        // --- Build the program ---
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(KERNEL_NAME),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let build_log = pollster::block_on(shader.get_compilation_info());
        for msg in &build_log.messages {
            tracing::info!("kernel build log: {:?}: {}", msg.message_type, msg.message);
        }

        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("metaball_bgl"),
            entries: &[
                bgl_uniform(0),    // params
                bgl_storage_ro(1), // charge positions
                bgl_storage_rw(2), // pixels
            ],
        });
        let pl_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("metaball_pl"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("metaball"),
            layout: Some(&pl_layout),
            module: &shader,
            entry_point: Some(KERNEL_NAME),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuInitError(format!("failed to build kernel program: {err}")));
        }

        // --- Create buffers ---
        let params = GpuShadeParams::new(width, height, n_charges);
        let bufs = GpuBuffers::new(&device, &params);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("metaball_bg"),
            layout: &bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: bufs.params_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: bufs.charges.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: bufs.pixels.as_entire_binding() },
            ],
        });

        tracing::info!(
            "GPU evaluator ready: {}x{} pixels, {} charges, {}x{} workgroups of {}",
            width,
            height,
            n_charges,
            groups.0,
            groups.1,
            LOCAL_WORK_SIZE
        );

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group,
            bufs,
            width,
            height,
            groups,
        })
    }

    /// Queue the current charge positions for the next dispatch.
    ///
    /// Returns without waiting; the in-order queue guarantees the write lands
    /// before the following `dispatch`.
    pub fn upload(&mut self, charges: &ChargeArrays) -> Result<(), RenderError> {
        if charges.len() != self.bufs.n_charges as usize {
            return Err(RenderError::Upload(format!(
                "expected {} charges, got {}",
                self.bufs.n_charges,
                charges.len()
            )));
        }
        self.bufs.upload_positions(&self.queue, charges.positions());
        Ok(())
    }

    /// Run the density kernel over every pixel.
    ///
    /// Validation failures are returned as a value; the device keeps whatever
    /// the pixel buffer held before.
    pub fn dispatch(&mut self) -> Result<(), RenderError> {
        if self.bufs.n_pixels == 0 {
            return Ok(());
        }
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("metaball_dispatch"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("metaball"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(self.groups.0, self.groups.1, 1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(RenderError::Dispatch(err.to_string())),
            None => Ok(()),
        }
    }

    /// Copy the produced pixels into `out`, blocking until the copy completes.
    pub fn download(&mut self, out: &mut PixelBuffer) -> Result<(), RenderError> {
        if out.width() != self.width || out.height() != self.height {
            return Err(RenderError::Download(format!(
                "buffer is {}x{}, evaluator is {}x{}",
                out.width(),
                out.height(),
                self.width,
                self.height
            )));
        }
        self.bufs
            .readback_pixels(&self.device, &self.queue, out)
            .map_err(RenderError::Download)
    }

    /// Workgroup grid used by `dispatch`.
    pub fn dispatch_groups(&self) -> (u32, u32) {
        self.groups
    }
}

impl DensityEvaluator for GpuEvaluator {
    fn backend(&self) -> Backend {
        Backend::Gpu
    }

    fn render(&mut self, charges: &ChargeArrays, out: &mut PixelBuffer) -> Result<(), RenderError> {
        self.upload(charges)?;
        let dispatched = self.dispatch();
        // Read back even after a failed dispatch: the frame shows stale
        // contents rather than skipping presentation.
        self.download(out)?;
        dispatched
    }
}

/// Workgroup grid for `n_pixels` invocations of `LOCAL_WORK_SIZE` each.
///
/// Groups go along x up to `max_per_dim`, then fold into y. Returns `None`
/// if even the folded grid would exceed the limit.
fn dispatch_grid(n_pixels: u32, max_per_dim: u32) -> Option<(u32, u32)> {
    let groups = n_pixels.div_ceil(LOCAL_WORK_SIZE);
    if groups <= max_per_dim {
        return Some((groups.max(1), 1));
    }
    let rows = groups.div_ceil(max_per_dim);
    (rows <= max_per_dim).then_some((max_per_dim, rows))
}

// ---- Bind group layout entry helpers ----

fn bgl_uniform(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bgl_storage_ro(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bgl_storage_rw(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
