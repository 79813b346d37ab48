//! Row-major RGB pixel buffer.

/// `width * height * 3` bytes, row-major, channel order R, G, B.
///
/// The active evaluator owns the buffer mutably for the duration of a render
/// call; between calls it is lent read-only to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Bytes per pixel.
    pub const CHANNELS: usize = 3;

    /// Create a black buffer of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * Self::CHANNELS],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw RGB bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Raw RGB bytes, mutable.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Number of bytes in one row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * Self::CHANNELS
    }

    /// Color at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Expand into an RGBA8 frame (alpha = 255), as expected by the
    /// presentation surface. Extra bytes in `frame` are left untouched.
    pub fn write_rgba(&self, frame: &mut [u8]) {
        for (dst, src) in frame
            .chunks_exact_mut(4)
            .zip(self.data.chunks_exact(Self::CHANNELS))
        {
            dst[..3].copy_from_slice(src);
            dst[3] = 0xff;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_black_and_sized() {
        let buf = PixelBuffer::new(4, 3);
        assert_eq!(buf.as_bytes().len(), 36);
        assert_eq!(buf.pixel_count(), 12);
        assert_eq!(buf.row_bytes(), 12);
        assert_eq!(buf.pixel(3, 2), Some([0, 0, 0]));
        assert_eq!(buf.pixel(4, 0), None);
        assert_eq!(buf.pixel(0, 3), None);
    }

    #[test]
    fn pixel_indexing_is_row_major() {
        let mut buf = PixelBuffer::new(2, 2);
        // pixel (1, 1) is the fourth triple
        buf.as_bytes_mut()[9..12].copy_from_slice(&[1, 2, 3]);
        assert_eq!(buf.pixel(1, 1), Some([1, 2, 3]));
        assert_eq!(buf.pixel(0, 1), Some([0, 0, 0]));
    }

    #[test]
    fn rgba_expansion_sets_opaque_alpha() {
        let mut buf = PixelBuffer::new(2, 1);
        buf.as_bytes_mut().copy_from_slice(&[10, 20, 30, 40, 50, 60]);
        let mut frame = vec![0u8; 8];
        buf.write_rgba(&mut frame);
        assert_eq!(frame, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }
}
