use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{CaptureError, Result};
use crate::ingest::CaptureSettings;
use crate::transport::PublishEndpoint;

pub const DEFAULT_CONFIG_PATH: &str = "../config/camera_config.json";
const DEFAULT_CAMERA_INDEX: u32 = 0;
const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_FRAME_HEIGHT: u32 = 480;
const DEFAULT_FPS: u32 = 30;
const DEFAULT_PUBLISH_PORT: u16 = 5555;

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    camera_index: Option<u32>,
    frame_width: Option<u32>,
    frame_height: Option<u32>,
    fps: Option<u32>,
    #[serde(alias = "publish_port")]
    zmq_port: Option<u16>,
}

/// Runtime settings for the capture daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub camera_index: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub fps: u32,
    pub publish_port: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: DEFAULT_CAMERA_INDEX,
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            fps: DEFAULT_FPS,
            publish_port: DEFAULT_PUBLISH_PORT,
        }
    }
}

impl CaptureConfig {
    /// Load and validate a configuration file. Keys missing from the file keep
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let file_cfg = read_config_file(path)
            .map_err(|err| CaptureError::Config(format!("{:#}", err)))?;
        let cfg = Self::from_file(file_cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a configuration file, falling back to the built-in defaults if it
    /// is missing, malformed or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cfg) => {
                log::info!("configuration loaded from {}", path.display());
                cfg
            }
            Err(err) => {
                log::warn!("{}; using default configuration", err);
                Self::default()
            }
        }
    }

    /// Parse a JSON document into a validated configuration.
    pub fn from_json(raw: &str) -> Result<Self> {
        let file_cfg: CaptureConfigFile = serde_json::from_str(raw)
            .map_err(|err| CaptureError::Config(format!("invalid config: {}", err)))?;
        let cfg = Self::from_file(file_cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CaptureConfigFile) -> Self {
        let defaults = Self::default();
        // Width and height are only honored as a pair.
        let (frame_width, frame_height) = match (file.frame_width, file.frame_height) {
            (Some(width), Some(height)) => (width, height),
            (None, None) => (defaults.frame_width, defaults.frame_height),
            _ => {
                log::warn!(
                    "frame_width and frame_height must be set together; using {}x{}",
                    defaults.frame_width,
                    defaults.frame_height
                );
                (defaults.frame_width, defaults.frame_height)
            }
        };
        Self {
            camera_index: file.camera_index.unwrap_or(defaults.camera_index),
            frame_width,
            frame_height,
            fps: file.fps.unwrap_or(defaults.fps),
            publish_port: file.zmq_port.unwrap_or(defaults.publish_port),
        }
    }

    /// Apply `CAPTURE_CAMERA_INDEX`, `CAPTURE_FPS` and `CAPTURE_PUBLISH_PORT`.
    ///
    /// Either every override is applied or, on error, none is.
    pub fn apply_env(&mut self) -> Result<()> {
        let mut next = self.clone();
        if let Some(index) = env_value::<u32>("CAPTURE_CAMERA_INDEX")? {
            next.camera_index = index;
        }
        if let Some(fps) = env_value::<u32>("CAPTURE_FPS")? {
            next.fps = fps;
        }
        if let Some(port) = env_value::<u16>("CAPTURE_PUBLISH_PORT")? {
            next.publish_port = port;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(CaptureError::Config(format!(
                "frame size must be positive, got {}x{}",
                self.frame_width, self.frame_height
            )));
        }
        if self.fps == 0 {
            return Err(CaptureError::Config("fps must be greater than zero".into()));
        }
        if self.publish_port == 0 {
            return Err(CaptureError::Config(
                "publish port must be between 1 and 65535".into(),
            ));
        }
        Ok(())
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            camera_index: self.camera_index,
            width: self.frame_width,
            height: self.frame_height,
            fps: self.fps,
        }
    }

    pub fn publish_endpoint(&self) -> PublishEndpoint {
        PublishEndpoint::all_interfaces(self.publish_port)
    }

    /// Target time budget for one loop iteration.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.fps.max(1)))
    }
}

fn read_config_file(path: &Path) -> anyhow::Result<CaptureConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not open config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_value<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().parse().map(Some).map_err(|_| {
            CaptureError::Config(format!("{} must be an integer, got '{}'", key, value))
        }),
        _ => Ok(None),
    }
}
