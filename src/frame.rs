// SPDX-License-Identifier: MPL-2.0
//! Pixel buffer and frame types shared by the reader, compositor, and sink.
//!
//! These are pure data types without any decoder or presentation
//! dependencies. Pixel data is shared via `Arc` so a frame can be handed
//! to a sink without copying.

use std::sync::Arc;

/// Packed pixel data, 4 bytes per pixel.
///
/// The channel order is contextual: [`WorkingImage`] buffers are BGRA as
/// produced by the track reader, [`CompositedFrame`] buffers are RGBA with
/// straight (non-premultiplied) alpha.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    /// Width in pixels.
    width: u32,
    /// Height in pixels.
    height: u32,
    /// Packed pixel data (4 bytes per pixel).
    bytes: Arc<Vec<u8>>,
}

impl PixelBuffer {
    /// Creates a pixel buffer from dimensions and packed pixel data.
    ///
    /// # Panics
    ///
    /// Panics if the data length doesn't match `width * height * 4`.
    #[must_use]
    pub fn new(width: u32, height: u32, bytes: Arc<Vec<u8>>) -> Self {
        let expected_len = (width as usize) * (height as usize) * 4;
        assert_eq!(
            bytes.len(),
            expected_len,
            "pixel data length mismatch: expected {expected_len}, got {}",
            bytes.len()
        );

        Self {
            width,
            height,
            bytes,
        }
    }

    /// Creates a pixel buffer from dimensions and owned pixel data.
    ///
    /// # Panics
    ///
    /// Panics if the data length doesn't match `width * height * 4`.
    #[must_use]
    pub fn from_vec(width: u32, height: u32, bytes: Vec<u8>) -> Self {
        Self::new(width, height, Arc::new(bytes))
    }

    /// Returns the width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the width and height as a pair.
    #[must_use]
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the packed pixel data.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the shared reference to the pixel data.
    #[must_use]
    pub fn bytes_arc(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.bytes)
    }

    /// Returns the total number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl PartialEq for PixelBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.bytes == other.bytes
    }
}

impl Eq for PixelBuffer {}

/// A single timestamped BGRA frame pulled from a track reader.
///
/// Ephemeral: owned by the pump iteration that pulled it and never
/// retained beyond compositing.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSample {
    buffer: PixelBuffer,
    pts_secs: f64,
}

impl DecodedSample {
    /// Creates a sample from a BGRA pixel buffer and its presentation
    /// timestamp in seconds.
    #[must_use]
    pub fn new(buffer: PixelBuffer, pts_secs: f64) -> Self {
        Self { buffer, pts_secs }
    }

    /// Returns the presentation timestamp in seconds.
    #[must_use]
    pub fn pts_secs(&self) -> f64 {
        self.pts_secs
    }

    /// Returns the BGRA pixel buffer.
    #[must_use]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }
}

/// The compositor's working representation of one decoded frame (BGRA).
///
/// Two working images pulled in the same pump iteration, one from the
/// main track and one from the alpha track, form the inputs to one
/// compositing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingImage {
    buffer: PixelBuffer,
}

impl WorkingImage {
    /// Converts a decoded sample into a working image.
    ///
    /// Returns `None` only when the sample carries no addressable pixels,
    /// which should not occur for a successfully pulled sample.
    #[must_use]
    pub fn from_sample(sample: DecodedSample) -> Option<Self> {
        if sample.buffer.pixel_count() == 0 {
            return None;
        }
        Some(Self {
            buffer: sample.buffer,
        })
    }

    /// Returns the width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Returns the height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Returns the width and height as a pair.
    #[must_use]
    pub fn extent(&self) -> (u32, u32) {
        self.buffer.extent()
    }

    /// Returns the BGRA pixel data.
    #[must_use]
    pub fn bgra_bytes(&self) -> &[u8] {
        self.buffer.bytes()
    }
}

/// The RGBA result of one mask blend, with the mask's luminance as the
/// alpha channel. Handed to the sink synchronously and then discarded by
/// the pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositedFrame {
    buffer: PixelBuffer,
}

impl CompositedFrame {
    /// Creates a composited frame from an RGBA pixel buffer.
    #[must_use]
    pub fn new(buffer: PixelBuffer) -> Self {
        Self { buffer }
    }

    /// Returns the width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Returns the height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Returns the RGBA pixel data (straight alpha).
    #[must_use]
    pub fn rgba_bytes(&self) -> &[u8] {
        self.buffer.bytes()
    }

    /// Returns the shared reference to the RGBA pixel data.
    #[must_use]
    pub fn rgba_bytes_arc(&self) -> Arc<Vec<u8>> {
        self.buffer.bytes_arc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_buffer_reports_dimensions() {
        let buffer = PixelBuffer::from_vec(4, 2, vec![0u8; 4 * 2 * 4]);
        assert_eq!(buffer.width(), 4);
        assert_eq!(buffer.height(), 2);
        assert_eq!(buffer.extent(), (4, 2));
        assert_eq!(buffer.pixel_count(), 8);
    }

    #[test]
    #[should_panic(expected = "pixel data length mismatch")]
    fn pixel_buffer_rejects_wrong_length() {
        let _ = PixelBuffer::from_vec(2, 2, vec![0u8; 3]);
    }

    #[test]
    fn working_image_adapts_a_sample() {
        let sample = DecodedSample::new(PixelBuffer::from_vec(2, 2, vec![7u8; 16]), 0.5);
        assert_eq!(sample.pts_secs(), 0.5);

        let image = WorkingImage::from_sample(sample).expect("non-empty sample converts");
        assert_eq!(image.extent(), (2, 2));
        assert_eq!(image.bgra_bytes(), &[7u8; 16]);
    }

    #[test]
    fn working_image_rejects_empty_sample() {
        let sample = DecodedSample::new(PixelBuffer::from_vec(0, 0, Vec::new()), 0.0);
        assert!(WorkingImage::from_sample(sample).is_none());
    }

    #[test]
    fn composited_frame_shares_pixel_data() {
        let frame = CompositedFrame::new(PixelBuffer::from_vec(1, 1, vec![1, 2, 3, 4]));
        let shared = frame.rgba_bytes_arc();
        assert_eq!(shared.as_slice(), frame.rgba_bytes());
    }
}
