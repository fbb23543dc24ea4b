use anyhow::{anyhow, Context, Result};

/// Pixel layouts a camera may hand us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DevicePixelFormat {
    Rgb24,
    Yuyv,
    Mjpeg,
}

impl DevicePixelFormat {
    pub(crate) fn fourcc(self) -> [u8; 4] {
        match self {
            DevicePixelFormat::Rgb24 => *b"RGB3",
            DevicePixelFormat::Yuyv => *b"YUYV",
            DevicePixelFormat::Mjpeg => *b"MJPG",
        }
    }
}

/// Convert a device buffer to packed RGB24.
///
/// `stride` is the driver's bytes per line for uncompressed formats; rows may
/// be padded past `width`. Zero means tightly packed rows.
///
/// Returns the RGB bytes together with the image dimensions, which for MJPEG
/// come from the bitstream rather than the negotiated format.
pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    format: DevicePixelFormat,
) -> Result<(Vec<u8>, u32, u32)> {
    match format {
        DevicePixelFormat::Rgb24 => {
            let mut rgb = Vec::with_capacity(plane_len(width, height, 3)?);
            for row in plane_rows(pixels, width, height, stride, 3, "RGB")? {
                rgb.extend_from_slice(row);
            }
            Ok((rgb, width, height))
        }
        DevicePixelFormat::Yuyv => Ok((
            yuyv_to_rgb(pixels, width, height, stride)?,
            width,
            height,
        )),
        DevicePixelFormat::Mjpeg => {
            let image = image::load_from_memory_with_format(pixels, image::ImageFormat::Jpeg)
                .context("decode mjpeg frame")?;
            let rgb = image.into_rgb8();
            let (w, h) = rgb.dimensions();
            Ok((rgb.into_raw(), w, h))
        }
    }
}

fn plane_len(width: u32, height: u32, bytes_per_pixel: usize) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(bytes_per_pixel))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

/// Visible part of each row of a plane whose rows start `stride` bytes apart.
fn plane_rows<'a>(
    pixels: &'a [u8],
    width: u32,
    height: u32,
    stride: u32,
    bytes_per_pixel: usize,
    label: &str,
) -> Result<impl Iterator<Item = &'a [u8]> + 'a> {
    if width == 0 || height == 0 {
        return Err(anyhow!("{} frame has empty dimensions {}x{}", label, width, height));
    }
    let row_len = plane_len(width, 1, bytes_per_pixel)?;
    if stride != 0 && (stride as usize) < row_len {
        return Err(anyhow!(
            "{} stride {} is shorter than a {} byte row",
            label,
            stride,
            row_len
        ));
    }
    let stride = (stride as usize).max(row_len);
    // The last row need not carry padding.
    let expected = stride
        .checked_mul(height as usize - 1)
        .and_then(|v| v.checked_add(row_len))
        .ok_or_else(|| anyhow!("{} frame dimensions overflow", label))?;
    if pixels.len() < expected {
        return Err(anyhow!(
            "{} frame length mismatch: expected {}, got {}",
            label,
            expected,
            pixels.len()
        ));
    }

    Ok(pixels[..expected]
        .chunks(stride)
        .map(move |row| &row[..row_len]))
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32, stride: u32) -> Result<Vec<u8>> {
    if width % 2 != 0 {
        return Err(anyhow!("YUYV frame width must be even, got {}", width));
    }

    let mut rgb = Vec::with_capacity(plane_len(width, height, 3)?);
    for row in plane_rows(pixels, width, height, stride, 2, "YUYV")? {
        // Each 4-byte macropixel carries two luma samples sharing one chroma pair.
        for chunk in row.chunks_exact(4) {
            let u = chunk[1] as f32 - 128.0;
            let v = chunk[3] as f32 - 128.0;
            for y in [chunk[0], chunk[2]] {
                let y = y as f32;
                rgb.push(clamp_to_u8(y + 1.402_f32 * v));
                rgb.push(clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v));
                rgb.push(clamp_to_u8(y + 1.772_f32 * u));
            }
        }
    }

    Ok(rgb)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
