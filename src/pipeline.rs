//! Capture driver.
//!
//! Wires one `FrameSource` to one `FramePublisher`:
//!
//! 1. Read a frame (blocking)
//! 2. Resize it if the device did not honor the configured size
//! 3. JPEG-encode and publish it
//! 4. Sleep for whatever is left of the frame interval
//!
//! The loop is single-threaded. The stop flag is polled once per iteration
//! and every error is fatal: the driver closes both ends and reports it.

use std::time::{Duration, Instant};

use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::ingest::{CaptureSettings, FrameSource};
use crate::shutdown::ShutdownFlag;
use crate::transport::{FramePublisher, PublishEndpoint, PublishSocket, PublishStats};

/// How often the running loop logs throughput.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Time source for pacing.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

/// Totals reported when the loop ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_published: u64,
    pub bytes_published: u64,
    pub elapsed: Duration,
}

/// Remaining sleep for an iteration that took `elapsed` out of `interval`.
///
/// Overruns are not carried into later iterations.
pub fn pace_delay(interval: Duration, elapsed: Duration) -> Option<Duration> {
    interval.checked_sub(elapsed).filter(|rest| !rest.is_zero())
}

pub struct CaptureDriver<S, P, C = SystemClock> {
    source: S,
    publisher: FramePublisher<P>,
    clock: C,
    settings: CaptureSettings,
    endpoint: PublishEndpoint,
    frame_interval: Duration,
    state: DriverState,
}

impl<S: FrameSource, P: PublishSocket> CaptureDriver<S, P, SystemClock> {
    pub fn new(source: S, socket: P, config: &CaptureConfig) -> Self {
        Self::with_clock(source, socket, config, SystemClock)
    }
}

impl<S: FrameSource, P: PublishSocket, C: Clock> CaptureDriver<S, P, C> {
    pub fn with_clock(source: S, socket: P, config: &CaptureConfig, clock: C) -> Self {
        Self {
            source,
            publisher: FramePublisher::new(socket),
            clock,
            settings: config.capture_settings(),
            endpoint: config.publish_endpoint(),
            frame_interval: config.frame_interval(),
            state: DriverState::Uninitialized,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn publisher(&self) -> &FramePublisher<P> {
        &self.publisher
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Open the camera and bind the publish socket. Both must succeed; on
    /// failure nothing is left open and the driver stays uninitialized.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != DriverState::Uninitialized {
            return Err(CaptureError::InvalidState(format!(
                "cannot initialize a driver in state {:?}",
                self.state
            )));
        }

        self.source.configure(self.settings);
        if let Err(err) = self.source.open() {
            log::error!("video capture initialization failed: {}", err);
            return Err(err);
        }
        if let Err(err) = self.publisher.bind(self.endpoint.clone()) {
            log::error!("video capture initialization failed: {}", err);
            self.source.close();
            return Err(err);
        }

        log::info!(
            "video capture initialized: camera={} resolution={}x{} fps={} endpoint={}",
            self.settings.camera_index,
            self.settings.width,
            self.settings.height,
            self.settings.fps,
            self.endpoint
        );
        self.state = DriverState::Initialized;
        Ok(())
    }

    /// Move the publisher to `tcp://*:<port>`. A bound publisher is rebound
    /// immediately; otherwise the port is used by `initialize`.
    pub fn update_publish_port(&mut self, port: u16) -> Result<()> {
        if port == 0 {
            return Err(CaptureError::Config(
                "publish port must be between 1 and 65535".into(),
            ));
        }
        let endpoint = PublishEndpoint::all_interfaces(port);
        match self.state {
            DriverState::Initialized | DriverState::Running => {
                self.publisher.rebind(endpoint.clone())?;
            }
            DriverState::Uninitialized => {}
            DriverState::Stopped => {
                return Err(CaptureError::InvalidState(
                    "cannot rebind a stopped driver".into(),
                ))
            }
        }
        self.endpoint = endpoint;
        Ok(())
    }

    /// One read, resize, publish, pace pass.
    pub fn run_iteration(&mut self) -> Result<()> {
        let started = self.clock.now();

        let frame = self.source.read_frame()?;
        let frame = frame.fit_to(self.settings.width, self.settings.height)?;
        self.publisher.publish(frame)?;

        let elapsed = self.clock.now().saturating_duration_since(started);
        if let Some(rest) = pace_delay(self.frame_interval, elapsed) {
            self.clock.sleep(rest);
        }
        Ok(())
    }

    /// Run until `shutdown` is requested or an iteration fails.
    ///
    /// Either way the driver ends up `Stopped` with the device and socket
    /// released; it cannot be restarted.
    pub fn run(&mut self, shutdown: &ShutdownFlag) -> Result<RunSummary> {
        if self.state != DriverState::Initialized {
            return Err(CaptureError::InvalidState(format!(
                "cannot run a driver in state {:?}",
                self.state
            )));
        }
        self.state = DriverState::Running;
        log::info!("starting video capture");

        let started = self.clock.now();
        let mut last_health_log = started;
        let mut last_health_stats = PublishStats::default();

        let outcome = loop {
            if shutdown.is_requested() {
                log::info!("shutdown requested, stopping video capture");
                break Ok(());
            }
            if let Err(err) = self.run_iteration() {
                break Err(err);
            }

            let now = self.clock.now();
            let since_last = now.saturating_duration_since(last_health_log);
            if since_last >= HEALTH_LOG_INTERVAL {
                let stats = self.publisher.stats();
                let frames = stats.messages_sent - last_health_stats.messages_sent;
                let source_stats = self.source.stats();
                log::info!(
                    "capture health: device={} captured={} published={} bytes={} rate={:.1} fps",
                    source_stats.device,
                    source_stats.frames_captured,
                    stats.messages_sent,
                    stats.bytes_sent,
                    frames as f64 / since_last.as_secs_f64()
                );
                last_health_log = now;
                last_health_stats = stats;
            }
        };

        self.stop();
        let stats = self.publisher.stats();
        let summary = RunSummary {
            frames_published: stats.messages_sent,
            bytes_published: stats.bytes_sent,
            elapsed: self.clock.now().saturating_duration_since(started),
        };
        match &outcome {
            Ok(()) => log::info!(
                "video capture stopped after {} frames ({} bytes)",
                summary.frames_published,
                summary.bytes_published
            ),
            Err(err) => log::error!(
                "capture loop failed after {} frames: {}",
                summary.frames_published,
                err
            ),
        }
        outcome.map(|()| summary)
    }

    fn stop(&mut self) {
        self.source.close();
        self.publisher.close();
        self.state = DriverState::Stopped;
    }
}
