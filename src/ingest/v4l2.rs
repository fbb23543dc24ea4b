//! V4L2 frame source.
//!
//! This module provides `V4l2Source` for capturing frames from local V4L2
//! devices (`/dev/video<index>`).
//!
//! The V4L2 source is responsible for:
//! - Opening the device node for the configured camera index
//! - Negotiating a pixel format (MJPG, then YUYV, then RGB3)
//! - Requesting the configured size and frame rate (best-effort)
//! - Converting each captured buffer to an RGB24 `Frame`
//!
//! The V4L2 source MUST NOT:
//! - Queue frames beyond the driver's mmap ring
//! - Retry failed reads

use anyhow::{anyhow, Context};
use ouroboros::self_referencing;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::FourCC;

use super::normalize::{normalize_to_rgb, DevicePixelFormat};
use super::{CaptureSettings, FrameSource, SourceStats};
use crate::error::{CaptureError, Result};
use crate::frame::Frame;

/// Number of mmap buffers handed to the driver.
const BUFFER_COUNT: u32 = 4;

/// Formats we can normalize, in order of preference.
const PREFERRED_FORMATS: [DevicePixelFormat; 3] = [
    DevicePixelFormat::Mjpeg,
    DevicePixelFormat::Yuyv,
    DevicePixelFormat::Rgb24,
];

/// V4L2 camera source.
pub struct V4l2Source {
    settings: CaptureSettings,
    state: Option<DeviceState>,
    pixel_format: DevicePixelFormat,
    /// Camera index of the open device; `configure` only changes `settings`.
    active_index: u32,
    active_width: u32,
    active_height: u32,
    /// Bytes per line reported by the driver.
    active_stride: u32,
    frame_count: u64,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this>,
}

impl V4l2Source {
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            active_index: settings.camera_index,
            active_width: settings.width,
            active_height: settings.height,
            active_stride: 0,
            settings,
            state: None,
            pixel_format: DevicePixelFormat::Mjpeg,
            frame_count: 0,
        }
    }

    /// Node of the device this source has open, or last opened.
    pub fn device_path(&self) -> String {
        device_path(self.active_index)
    }

    /// Size the device actually agreed to deliver.
    pub fn active_size(&self) -> (u32, u32) {
        (self.active_width, self.active_height)
    }
}

impl FrameSource for V4l2Source {
    fn configure(&mut self, settings: CaptureSettings) {
        self.settings = settings;
    }

    fn settings(&self) -> CaptureSettings {
        self.settings
    }

    fn open(&mut self) -> Result<()> {
        self.close();
        let path = device_path(self.settings.camera_index);

        let mut device = v4l::Device::new(self.settings.camera_index as usize)
            .map_err(|err| CaptureError::device_open(&path, err))?;
        let (pixel_format, width, height, stride) =
            negotiate_format(&mut device, &self.settings).map_err(|err| {
                CaptureError::device_open(&path, format!("{:#}", err))
            })?;

        if self.settings.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.settings.fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("V4l2Source: failed to set fps on {}: {}", path, err);
            }
        }

        if (width, height) != (self.settings.width, self.settings.height) {
            log::warn!(
                "V4l2Source: {} delivers {}x{} instead of {}x{}; frames will be resized",
                path,
                width,
                height,
                self.settings.width,
                self.settings.height
            );
        }

        let state = DeviceStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT)
            },
        }
        .try_build()
        .map_err(|err| {
            CaptureError::device_open(&path, format!("create buffer stream: {}", err))
        })?;

        self.state = Some(state);
        self.pixel_format = pixel_format;
        self.active_index = self.settings.camera_index;
        self.active_width = width;
        self.active_height = height;
        self.active_stride = stride;

        log::info!(
            "V4l2Source: opened {} ({}x{} {:?})",
            path,
            width,
            height,
            pixel_format
        );
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame> {
        let path = self.device_path();
        let (width, height, stride) = (self.active_width, self.active_height, self.active_stride);
        let format = self.pixel_format;
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| CaptureError::device_read(&path, "device is not open"))?;

        let (rgb, width, height) = state
            .with_stream_mut(|stream| -> anyhow::Result<(Vec<u8>, u32, u32)> {
                let (buf, _meta) = stream.next().context("dequeue v4l2 buffer")?;
                normalize_to_rgb(buf, width, height, stride, format)
            })
            .map_err(|err| CaptureError::device_read(&path, format!("{:#}", err)))?;

        self.frame_count += 1;
        Ok(Frame::rgb(rgb, width, height))
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::debug!("V4l2Source: closed {}", self.device_path());
        }
    }

    fn is_open(&self) -> bool {
        self.state.is_some()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.device_path(),
        }
    }
}

fn device_path(index: u32) -> String {
    format!("/dev/video{}", index)
}

/// Ask the driver for each supported format in turn and keep the first one it
/// accepts. Size is requested too, but the driver may round it.
fn negotiate_format(
    device: &mut v4l::Device,
    settings: &CaptureSettings,
) -> anyhow::Result<(DevicePixelFormat, u32, u32, u32)> {
    for candidate in PREFERRED_FORMATS {
        let fourcc = FourCC::new(&candidate.fourcc());
        let wanted = v4l::Format::new(settings.width, settings.height, fourcc);
        match device.set_format(&wanted) {
            Ok(actual) if actual.fourcc == fourcc => {
                return Ok((candidate, actual.width, actual.height, actual.stride));
            }
            Ok(actual) => {
                log::debug!(
                    "V4l2Source: requested {} but driver chose {}",
                    fourcc,
                    actual.fourcc
                );
            }
            Err(err) => {
                log::warn!("V4l2Source: failed to set format {}: {}", fourcc, err);
            }
        }
    }
    let current = device.format().context("read v4l2 format")?;
    Err(anyhow!(
        "unsupported pixel format {}; need MJPG, YUYV or RGB3",
        current.fourcc
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_camera() -> CaptureSettings {
        CaptureSettings {
            camera_index: 250,
            ..CaptureSettings::default()
        }
    }

    #[test]
    fn missing_device_is_an_open_error() {
        let mut source = V4l2Source::new(missing_camera());
        match source.open() {
            Err(CaptureError::DeviceOpen { device, .. }) => assert_eq!(device, "/dev/video250"),
            other => panic!("expected DeviceOpen, got {:?}", other),
        }
        assert!(!source.is_open());
    }

    #[test]
    fn read_before_open_is_a_read_error() {
        let mut source = V4l2Source::new(missing_camera());
        assert!(matches!(
            source.read_frame(),
            Err(CaptureError::DeviceRead { .. })
        ));
    }

    #[test]
    fn stats_name_the_opened_device_until_reopen() {
        let mut source = V4l2Source::new(missing_camera());
        source.configure(CaptureSettings {
            camera_index: 251,
            ..missing_camera()
        });
        assert_eq!(source.stats().device, "/dev/video250");

        match source.open() {
            Err(CaptureError::DeviceOpen { device, .. }) => assert_eq!(device, "/dev/video251"),
            other => panic!("expected DeviceOpen, got {:?}", other),
        }
        assert_eq!(source.stats().device, "/dev/video250");
    }

    #[test]
    fn close_is_idempotent() {
        let mut source = V4l2Source::new(missing_camera());
        source.close();
        source.close();
        assert_eq!(source.stats().frames_captured, 0);
    }
}
