//! Camera service — the hexagonal core.
//!
//! [`CameraService`] owns the calibration constants, the conversion
//! settings and the failure policy. It exposes a hardware-agnostic API;
//! sensor access flows through [`ThermalSource`] and events through
//! [`EventSink`], both injected at call sites.
//!
//! ```text
//!  ThermalSource ──▶ ┌────────────────────────────┐ ──▶ EventSink
//!                    │        CameraService        │
//!                    │ calibration · failure policy│ ──▶ Distributor::publish
//!                    └────────────────────────────┘
//! ```

use log::{error, info, warn};

use crate::config::SystemConfig;
use crate::error::{AcquisitionError, ConfigError};
use crate::scheduler::Scheduler;
use crate::sensor::calibration::CalibrationParameters;
use crate::sensor::conversion::ConversionSettings;
use crate::stream::Distributor;

use super::commands::{CameraCommand, CommandInbox};
use super::events::{CameraEvent, HaltReason};
use super::ports::{EventSink, ThermalSource};

/// Lifecycle of the acquisition pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Bootstrap has not completed.
    Uncalibrated,
    /// Acquiring on every acquisition tick.
    Running,
    /// Acquisition stopped for good; distribution keeps serving the last frame.
    Halted(HaltReason),
}

// ───────────────────────────────────────────────────────────────
// CameraService
// ───────────────────────────────────────────────────────────────

pub struct CameraService {
    config: SystemConfig,
    settings: ConversionSettings,
    calibration: Option<CalibrationParameters>,
    state: ServiceState,
    consecutive_failures: u32,
    frames_acquired: u64,
    failed_attempts: u64,
}

impl CameraService {
    /// Construct the service. Call [`bootstrap`](Self::bootstrap) next.
    pub fn new(config: SystemConfig) -> Self {
        let settings = settings_for(&config);
        Self {
            config,
            settings,
            calibration: None,
            state: ServiceState::Uncalibrated,
            consecutive_failures: 0,
            frames_acquired: 0,
            failed_attempts: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run the one-shot calibration bootstrap.
    ///
    /// On success the service is `Running`. On a fatal error it is `Halted`
    /// and no acquisition will ever be attempted. Once the service has left
    /// `Uncalibrated` this is a no-op: a running service returns `Ok` and a
    /// halted one returns its halt reason.
    pub fn bootstrap(
        &mut self,
        source: &mut impl ThermalSource,
        sink: &mut impl EventSink,
    ) -> Result<(), HaltReason> {
        match self.state {
            ServiceState::Running => return Ok(()),
            ServiceState::Halted(reason) => return Err(reason),
            ServiceState::Uncalibrated => {}
        }

        match source.bootstrap() {
            Ok(params) => {
                let calibrated_from = params.source;
                self.calibration = Some(params);
                self.state = ServiceState::Running;
                info!("CameraService running ({:?} calibration)", calibrated_from);
                sink.emit(&CameraEvent::Calibrated {
                    source: calibrated_from,
                });
                Ok(())
            }
            Err(e) => {
                error!("CameraService halted: {}", e);
                let reason = HaltReason::Calibration(e);
                self.state = ServiceState::Halted(reason);
                sink.emit(&CameraEvent::Halted(reason));
                Err(reason)
            }
        }
    }

    // ── Per-tick acquisition ──────────────────────────────────

    /// One acquisition attempt. A successful frame is published and its
    /// sequence number returned; a failed attempt leaves the current frame
    /// untouched.
    pub fn acquire(
        &mut self,
        source: &mut impl ThermalSource,
        distributor: &Distributor,
        sink: &mut impl EventSink,
    ) -> Result<u64, AcquisitionError> {
        let params = match (self.state, self.calibration.as_ref()) {
            (ServiceState::Running, Some(params)) => params,
            (ServiceState::Halted(_), _) => return Err(AcquisitionError::Halted),
            _ => return Err(AcquisitionError::NotCalibrated),
        };

        match source.acquire(params, &self.settings) {
            Ok(frame) => {
                if self.consecutive_failures > 0 {
                    info!(
                        "Acquisition recovered after {} failed attempts",
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;
                self.frames_acquired += 1;
                let (min, max) = frame.min_max();
                let sequence = distributor.publish(frame);
                sink.emit(&CameraEvent::FrameAcquired { sequence, min, max });
                Ok(sequence)
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.failed_attempts += 1;
                sink.emit(&CameraEvent::AcquisitionFailed {
                    error: e,
                    consecutive: self.consecutive_failures,
                });
                if let Some(limit) = self.config.max_consecutive_failures {
                    if self.consecutive_failures >= limit {
                        warn!("Acquisition halted after {} consecutive failures", limit);
                        let reason = HaltReason::TooManyFailures(self.consecutive_failures);
                        self.state = ServiceState::Halted(reason);
                        sink.emit(&CameraEvent::Halted(reason));
                    }
                }
                Err(e)
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply an inbound command. Invalid configuration is rejected whole
    /// and nothing changes.
    pub fn handle_command(
        &mut self,
        cmd: CameraCommand,
        scheduler: &mut Scheduler,
        distributor: &Distributor,
        sink: &mut impl EventSink,
    ) -> Result<(), ConfigError> {
        let new_config = match cmd {
            CameraCommand::UpdateConfig(config) => config,
            CameraCommand::SetEmissivity(emissivity) => SystemConfig {
                emissivity,
                ..self.config.clone()
            },
        };
        new_config.validate()?;

        scheduler.apply_config(&new_config);
        distributor.set_capacity(usize::from(new_config.max_subscribers));
        distributor.set_idle_timeout(u64::from(new_config.idle_timeout_ms));
        self.settings = settings_for(&new_config);
        self.config = new_config;

        info!("Configuration updated at runtime");
        sink.emit(&CameraEvent::ConfigUpdated);
        Ok(())
    }

    /// Apply every pending command in arrival order. Rejected commands are
    /// logged and skipped. Returns how many were applied.
    pub fn drain_commands(
        &mut self,
        inbox: &CommandInbox,
        scheduler: &mut Scheduler,
        distributor: &Distributor,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut applied = 0;
        while let Some(cmd) = inbox.take() {
            match self.handle_command(cmd, scheduler, distributor, sink) {
                Ok(()) => applied += 1,
                Err(e) => warn!("Command rejected: {}", e),
            }
        }
        applied
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ServiceState::Running
    }

    pub fn calibration(&self) -> Option<&CalibrationParameters> {
        self.calibration.as_ref()
    }

    pub fn settings(&self) -> ConversionSettings {
        self.settings
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> SystemConfig {
        self.config.clone()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn frames_acquired(&self) -> u64 {
        self.frames_acquired
    }

    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts
    }
}

fn settings_for(config: &SystemConfig) -> ConversionSettings {
    ConversionSettings {
        emissivity: config.emissivity,
        ta_shift: config.ta_shift_c,
    }
}
