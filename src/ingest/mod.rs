//! Frame sources.
//!
//! This module provides the sources the capture loop can read from:
//! - USB/V4L2 camera devices (feature: ingest-v4l2)
//! - Synthetic test pattern (always available)
//!
//! All sources produce RGB24 `Frame` instances. A source is responsible for:
//! - Opening and releasing its device
//! - Requesting the configured resolution and frame rate (best-effort)
//! - Normalizing device pixel formats to RGB24 at capture time
//!
//! A source MUST NOT buffer frames: one `read_frame` call is one device read.

#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

use crate::error::Result;
use crate::frame::Frame;

/// Requested capture settings. Applied on the next `open`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureSettings {
    pub camera_index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Capture statistics for health logging.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub device: String,
}

/// A camera-like producer of frames.
pub trait FrameSource {
    /// Replace the requested settings. Takes effect on the next `open`.
    fn configure(&mut self, settings: CaptureSettings);

    fn settings(&self) -> CaptureSettings;

    /// Open the device and request the configured size and rate.
    fn open(&mut self) -> Result<()>;

    /// Block until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame>;

    /// Release the device. Safe to call more than once.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    fn stats(&self) -> SourceStats;
}
