//! JPEG encoding of frames for the wire.
//!
//! Every published message is one self-contained JPEG byte stream. Quality is
//! fixed; subscribers decode each message as a complete image.

use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Luma, Rgb};

use crate::error::{CaptureError, Result};
use crate::frame::{Frame, PixelFormat};

/// JPEG quality factor for published frames.
pub const JPEG_QUALITY: u8 = 85;

/// Encode a frame as a baseline JPEG at `JPEG_QUALITY`.
///
/// The frame buffer is validated first, so a corrupt frame never produces a
/// partial message.
pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>> {
    frame.validate()?;

    let mut out = Vec::with_capacity(frame.byte_len() / 8);
    let encoded = {
        let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        match frame.format {
            PixelFormat::Rgb24 => {
                let img: ImageBuffer<Rgb<u8>, &[u8]> =
                    ImageBuffer::from_raw(frame.width, frame.height, frame.pixels())
                        .ok_or_else(|| CaptureError::Encode("rgb buffer too small".into()))?;
                encoder.encode_image(&img)
            }
            PixelFormat::Gray8 => {
                let img: ImageBuffer<Luma<u8>, &[u8]> =
                    ImageBuffer::from_raw(frame.width, frame.height, frame.pixels())
                        .ok_or_else(|| CaptureError::Encode("gray buffer too small".into()))?;
                encoder.encode_image(&img)
            }
        }
    };
    encoded.map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_complete_jpeg_stream() -> Result<()> {
        let frame = Frame::rgb(vec![128u8; 16 * 8 * 3], 16, 8);
        let jpeg = encode_jpeg(&frame)?;

        assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "missing SOI marker");
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9], "missing EOI marker");

        let decoded = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg)
            .expect("decode published jpeg");
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
        Ok(())
    }

    #[test]
    fn encodes_gray_frames() -> Result<()> {
        let frame = Frame::new(vec![40u8; 8 * 8], 8, 8, PixelFormat::Gray8);
        let jpeg = encode_jpeg(&frame)?;
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        Ok(())
    }

    #[test]
    fn corrupt_buffer_is_an_encode_error() {
        let frame = Frame::rgb(vec![1u8; 7], 16, 8);
        assert!(matches!(encode_jpeg(&frame), Err(CaptureError::Encode(_))));
    }

    #[test]
    fn empty_frame_is_an_encode_error() {
        let frame = Frame::rgb(Vec::new(), 0, 0);
        assert!(matches!(encode_jpeg(&frame), Err(CaptureError::Encode(_))));
    }
}
