//! In-memory raster frames.
//!
//! - `Frame`: one captured image. Owned, moved through the pipeline, never cloned.
//! - `PixelFormat`: channel layout of the pixel buffer.
//!
//! A frame lives for exactly one loop iteration: the source produces it, the
//! driver may resize it, and the publisher consumes it. There is no `Clone`
//! impl, so a frame cannot be held by two consumers at once.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Pixel, Rgb};

use crate::error::{CaptureError, Result};

/// Resampling filter used when the device did not honor the requested size.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Pixel layout of a frame buffer. Rows are packed, no padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit R, G, B.
    Rgb24,
    /// 8-bit luma.
    Gray8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb24 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// A single captured image.
///
/// Frames are moved, never duplicated:
///
/// ```compile_fail
/// let frame = video_capture::Frame::rgb(vec![0; 3], 1, 1);
/// let copy = frame.clone();
/// ```
pub struct Frame {
    /// Row-major pixel data.
    data: Vec<u8>,

    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl Frame {
    /// Wrap a pixel buffer. The buffer length is not checked here; a corrupt
    /// buffer is reported when the frame is resized or encoded.
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
        }
    }

    pub fn rgb(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self::new(data, width, height, PixelFormat::Rgb24)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Buffer length implied by the dimensions and format.
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(self.format.channels()))
    }

    /// Check that the buffer is a complete image of the declared size.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::Encode(format!(
                "frame has empty dimensions {}x{}",
                self.width, self.height
            )));
        }
        let expected = self.expected_len().ok_or_else(|| {
            CaptureError::Encode(format!(
                "frame dimensions overflow: {}x{}",
                self.width, self.height
            ))
        })?;
        if self.data.len() != expected {
            return Err(CaptureError::Encode(format!(
                "pixel buffer length mismatch for {}x{} {:?}: expected {}, got {}",
                self.width,
                self.height,
                self.format,
                expected,
                self.data.len()
            )));
        }
        Ok(())
    }

    pub fn has_size(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Return a frame of exactly `width` x `height`.
    ///
    /// Frames that already match are passed through untouched; anything else
    /// is resampled.
    pub fn fit_to(self, width: u32, height: u32) -> Result<Frame> {
        if self.has_size(width, height) {
            return Ok(self);
        }
        if width == 0 || height == 0 {
            return Err(CaptureError::Encode(format!(
                "cannot resize to {}x{}",
                width, height
            )));
        }
        self.validate()?;

        let data = match self.format {
            PixelFormat::Rgb24 => {
                resample::<Rgb<u8>>(self.data, self.width, self.height, width, height)?
            }
            PixelFormat::Gray8 => {
                resample::<Luma<u8>>(self.data, self.width, self.height, width, height)?
            }
        };
        Ok(Frame::new(data, width, height, self.format))
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Pixel bytes are never printed.
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn resample<P>(
    data: Vec<u8>,
    width: u32,
    height: u32,
    to_width: u32,
    to_height: u32,
) -> Result<Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let src: ImageBuffer<P, Vec<u8>> = ImageBuffer::from_raw(width, height, data)
        .ok_or_else(|| CaptureError::Encode("pixel buffer too small for frame size".into()))?;
    Ok(imageops::resize(&src, to_width, to_height, RESIZE_FILTER).into_raw())
}
