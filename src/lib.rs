//! Video capture component.
//!
//! Opens a local camera, reads frames at a target rate, JPEG-encodes each one
//! and publishes it over a ZeroMQ PUB socket for any number of subscribers.
//!
//! # Pipeline
//!
//! The loop is single-threaded:
//!
//! 1. **Capture**: a `FrameSource` performs one blocking device read.
//! 2. **Resize**: only when the device ignored the requested resolution.
//! 3. **Publish**: `FramePublisher` encodes at a fixed JPEG quality and sends
//!    one message per frame. Fire-and-forget; no acknowledgment, no queue.
//! 4. **Pace**: sleep out the rest of the `1/fps` budget.
//!
//! Every failure except configuration loading is fatal. There is no retry.
//!
//! # Module Structure
//!
//! - `frame`: In-memory images (`Frame`, `PixelFormat`)
//! - `ingest`: Frame sources (V4L2 cameras, synthetic test pattern)
//! - `codec`: JPEG encoding for the wire
//! - `transport`: Publish endpoint, socket abstraction, ZeroMQ socket
//! - `pipeline`: Driver state machine and pacing
//! - `config`: Configuration file and environment loading
//! - `shutdown`: Signal-driven stop flag

pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod shutdown;
pub mod transport;

pub use codec::{encode_jpeg, JPEG_QUALITY};
pub use config::{CaptureConfig, DEFAULT_CONFIG_PATH};
pub use error::{CaptureError, Result};
pub use frame::{Frame, PixelFormat};
pub use ingest::{CaptureSettings, FrameSource, SourceStats, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use ingest::V4l2Source;
pub use pipeline::{pace_delay, CaptureDriver, Clock, DriverState, RunSummary, SystemClock};
pub use shutdown::ShutdownFlag;
pub use transport::{
    FramePublisher, PublishEndpoint, PublishSocket, PublishStats, ZmqPublishSocket,
};
