//! Synthetic frame source.
//!
//! Produces a moving gradient at the configured size. Used when no camera is
//! attached (`--synthetic`) and by tests that need a deterministic source.

use crate::error::{CaptureError, Result};
use crate::frame::Frame;

use super::{CaptureSettings, FrameSource, SourceStats};

pub struct SyntheticSource {
    settings: CaptureSettings,
    /// Settings captured at `open`; later `configure` calls wait for a reopen.
    active: CaptureSettings,
    open: bool,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            settings,
            active: settings,
            open: false,
            frame_count: 0,
        }
    }

    fn device_name(&self) -> String {
        format!("synthetic://{}", self.active.camera_index)
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let width = self.active.width as usize;
        let height = self.active.height as usize;
        let shift = self.frame_count as usize;

        let mut pixels = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                pixels.push(((x + shift) % 256) as u8);
                pixels.push(((y + shift) % 256) as u8);
                pixels.push(((x + y) % 256) as u8);
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn configure(&mut self, settings: CaptureSettings) {
        self.settings = settings;
    }

    fn settings(&self) -> CaptureSettings {
        self.settings
    }

    /// Synthetic sources are always available.
    fn open(&mut self) -> Result<()> {
        self.active = self.settings;
        self.open = true;
        log::info!(
            "SyntheticSource: opened {} ({}x{} @ {} fps)",
            self.device_name(),
            self.settings.width,
            self.settings.height,
            self.settings.fps
        );
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame> {
        if !self.open {
            return Err(CaptureError::device_read(
                self.device_name(),
                "source is not open",
            ));
        }
        self.frame_count += 1;
        Ok(Frame::rgb(
            self.generate_pixels(),
            self.active.width,
            self.active.height,
        ))
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.device_name(),
        }
    }
}
