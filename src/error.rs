use thiserror::Error;

/// Errors surfaced by the capture pipeline.
///
/// Only `Config` is recoverable (the caller falls back to defaults). Every
/// other variant stops the capture loop.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to open camera {device}: {reason}")]
    DeviceOpen { device: String, reason: String },

    #[error("failed to read frame from {device}: {reason}")]
    DeviceRead { device: String, reason: String },

    #[error("failed to encode frame: {0}")]
    Encode(String),

    #[error("failed to bind publish socket to {endpoint}: {reason}")]
    Bind { endpoint: String, reason: String },

    #[error("failed to send frame: {0}")]
    Send(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl CaptureError {
    pub(crate) fn device_open(device: impl Into<String>, reason: impl ToString) -> Self {
        Self::DeviceOpen {
            device: device.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn device_read(device: impl Into<String>, reason: impl ToString) -> Self {
        Self::DeviceRead {
            device: device.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn bind(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Bind {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
