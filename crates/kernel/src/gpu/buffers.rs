//! GPU buffer management for the density kernel.
//!
//! Creates and manages the uniform, charge, and pixel buffers. Handles
//! CPU->GPU upload of charge positions and GPU->CPU readback of the pixel
//! buffer.

use wgpu::util::DeviceExt;

use crate::density::{BASE_COLOR, FACTOR, INNER_COLOR, THRESHOLD};
use crate::pixel::PixelBuffer;

/// Shading parameters uniform buffer layout.
/// Must match the ShadeParams struct in `shaders/metaball.wgsl` exactly.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuShadeParams {
    pub width: u32,
    pub height: u32,
    pub n_charges: u32,
    pub n_pixels: u32,
    pub threshold: f32,
    pub factor: f32,
    pub _pad0: u32,
    pub _pad1: u32,
    pub base_color: [f32; 4],
    pub inner_color: [u32; 4],
}

impl GpuShadeParams {
    /// Parameters for a `width x height` field over `n_charges` charges,
    /// using the same constants as the CPU backend.
    pub fn new(width: u32, height: u32, n_charges: u32) -> Self {
        Self {
            width,
            height,
            n_charges,
            n_pixels: width * height,
            threshold: THRESHOLD,
            factor: FACTOR,
            _pad0: 0,
            _pad1: 0,
            base_color: [
                BASE_COLOR[0] as f32,
                BASE_COLOR[1] as f32,
                BASE_COLOR[2] as f32,
                0.0,
            ],
            inner_color: [
                INNER_COLOR[0] as u32,
                INNER_COLOR[1] as u32,
                INNER_COLOR[2] as u32,
                255,
            ],
        }
    }
}

/// All GPU buffers needed for one density evaluation.
pub struct GpuBuffers {
    /// Uniform shading parameters (written once).
    pub params_buffer: wgpu::Buffer,
    /// Interleaved charge positions, rewritten every frame.
    pub charges: wgpu::Buffer,
    /// One packed RGBA8 word per pixel, written by the kernel.
    pub pixels: wgpu::Buffer,
    /// MAP_READ copy target for `pixels`.
    pub staging_pixels: wgpu::Buffer,

    /// Number of charges the charge buffer holds.
    pub n_charges: u32,
    /// Number of pixels the pixel buffer holds.
    pub n_pixels: u32,
}

/// Minimum buffer size (wgpu requires non-zero buffers).
const MIN_BUF_SIZE: u64 = 4;

impl GpuBuffers {
    /// Create all buffers for the given parameters.
    pub fn new(device: &wgpu::Device, params: &GpuShadeParams) -> Self {
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shade_params"),
            contents: bytemuck::bytes_of(params),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let charge_bytes = 2 * params.n_charges as u64 * std::mem::size_of::<f32>() as u64;
        let charges = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("charge_positions"),
            size: charge_bytes.max(MIN_BUF_SIZE),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let pixel_bytes = Self::pixel_bytes(params.n_pixels);
        let pixels = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pixels"),
            size: pixel_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging_pixels = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging_pixels"),
            size: pixel_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            params_buffer,
            charges,
            pixels,
            staging_pixels,
            n_charges: params.n_charges,
            n_pixels: params.n_pixels,
        }
    }

    /// Size in bytes of the packed pixel buffer.
    pub fn pixel_bytes(n_pixels: u32) -> u64 {
        (n_pixels as u64 * std::mem::size_of::<u32>() as u64).max(MIN_BUF_SIZE)
    }

    /// Queue a write of the charge positions. Does not wait: the queue orders
    /// the write before any later submission.
    pub fn upload_positions(&self, queue: &wgpu::Queue, positions: &[f32]) {
        if positions.is_empty() {
            return;
        }
        queue.write_buffer(&self.charges, 0, bytemuck::cast_slice(positions));
    }

    /// Copy the pixel buffer to host memory and unpack it into `out`.
    ///
    /// Blocks until the copy has completed and the staging buffer is mapped.
    pub fn readback_pixels(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        out: &mut PixelBuffer,
    ) -> Result<(), String> {
        let n = self.n_pixels as usize;
        if n == 0 {
            return Ok(());
        }
        let byte_len = n as u64 * std::mem::size_of::<u32>() as u64;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback"),
        });
        encoder.copy_buffer_to_buffer(&self.pixels, 0, &self.staging_pixels, 0, byte_len);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = self.staging_pixels.slice(..byte_len);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| format!("map callback dropped: {e}"))?
            .map_err(|e| format!("map failed: {e}"))?;

        {
            let data = slice.get_mapped_range();
            unpack_rgba(&data, out);
        }
        self.staging_pixels.unmap();
        Ok(())
    }
}

/// Unpack little-endian RGBA8 words into RGB triples.
fn unpack_rgba(packed: &[u8], out: &mut PixelBuffer) {
    for (dst, src) in out
        .as_bytes_mut()
        .chunks_exact_mut(PixelBuffer::CHANNELS)
        .zip(packed.chunks_exact(4))
    {
        dst.copy_from_slice(&src[..3]);
    }
}
