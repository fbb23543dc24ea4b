//! video_capture - camera capture and publish daemon
//!
//! This daemon:
//! 1. Loads the camera configuration (defaults on any load failure)
//! 2. Opens the camera and binds a ZeroMQ PUB socket on all interfaces
//! 3. Publishes one JPEG message per captured frame at the configured rate
//! 4. Stops on SIGINT/SIGTERM or on the first capture/encode/send failure

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use video_capture::{
    CaptureConfig, CaptureDriver, CaptureSettings, FrameSource, ShutdownFlag, SyntheticSource,
    ZmqPublishSocket, DEFAULT_CONFIG_PATH,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Capture camera frames and publish them as JPEG over ZeroMQ"
)]
struct Args {
    /// Path to the camera configuration file (JSON, or TOML by extension).
    #[arg(env = "CAPTURE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Publish a synthetic test pattern instead of opening a camera.
    #[arg(long)]
    synthetic: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    log::info!("video_capture {} starting", env!("CARGO_PKG_VERSION"));

    let result = start(&args);
    if let Err(err) = &result {
        log::error!("video_capture exiting: {:#}", err);
    }
    result
}

fn start(args: &Args) -> Result<()> {
    let shutdown = ShutdownFlag::new();
    shutdown
        .install_signal_handler()
        .context("error setting signal handler")?;

    let mut config = CaptureConfig::load_or_default(&args.config);
    if let Err(err) = config.apply_env() {
        log::warn!("ignoring environment overrides: {}", err);
    }

    let settings = config.capture_settings();
    if args.synthetic {
        run(SyntheticSource::new(settings), &config, &shutdown)
    } else {
        run(camera_source(settings)?, &config, &shutdown)
    }
}

fn run<S: FrameSource>(source: S, config: &CaptureConfig, shutdown: &ShutdownFlag) -> Result<()> {
    let mut driver = CaptureDriver::new(source, ZmqPublishSocket::new(), config);
    driver
        .initialize()
        .context("failed to initialize video capture")?;

    log::info!("press Ctrl+C to stop");
    let summary = driver.run(shutdown).context("capture loop failed")?;
    log::info!(
        "video capture component stopped: {} frames in {:.1}s",
        summary.frames_published,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}

#[cfg(feature = "ingest-v4l2")]
fn camera_source(settings: CaptureSettings) -> Result<video_capture::V4l2Source> {
    Ok(video_capture::V4l2Source::new(settings))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn camera_source(_settings: CaptureSettings) -> Result<SyntheticSource> {
    Err(anyhow::anyhow!(
        "built without camera support (feature ingest-v4l2); rerun with --synthetic"
    ))
}
