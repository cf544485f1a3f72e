//! MLX90640 sensor subsystem — bus access, calibration, conversion and the
//! two interchangeable acquisition strategies.
//!
//! ```text
//!   BusPort ──▶ Mlx90640 ──▶ RawSubpageSample ×2 ──▶ conversion ──▶ ThermalFrame
//!                  ▲
//!       LibraryDriver | RawDriver   (selected by SystemConfig::driver)
//! ```

pub mod bus;
pub mod calibration;
pub mod conversion;
pub mod driver;
pub mod library;
pub mod raw;
pub mod registers;

#[cfg(not(target_os = "espidf"))]
pub mod sim;

use embedded_hal::delay::DelayNs;

use crate::app::ports::ThermalSource;
use crate::config::{DriverKind, SystemConfig};
use crate::error::{AcquisitionError, CalibrationError};
use crate::frame::ThermalFrame;
use bus::BusPort;
use calibration::CalibrationParameters;
use conversion::ConversionSettings;
use driver::{Mlx90640, PollPolicy};
use library::{LibraryDriver, ReadoutSetup};
use raw::RawDriver;

/// The acquisition strategy chosen at boot.
pub enum SensorSource<B, D> {
    Library(LibraryDriver<B, D>),
    Raw(RawDriver<B, D>),
}

impl<B: BusPort, D: DelayNs> SensorSource<B, D> {
    pub fn from_config(bus: B, delay: D, config: &SystemConfig) -> Self {
        let poll = PollPolicy {
            limit: config.ready_poll_limit,
            interval_ms: config.ready_poll_interval_ms,
        };
        let mlx = Mlx90640::new(bus, delay, poll);
        match config.driver {
            DriverKind::Library => Self::Library(LibraryDriver::new(
                mlx,
                ReadoutSetup {
                    pattern: config.readout_pattern,
                    resolution: config.adc_resolution,
                    refresh_rate: config.refresh_rate,
                },
            )),
            DriverKind::Raw => Self::Raw(RawDriver::new(mlx, config.i2c_clock_hz, config.refresh_rate)),
        }
    }

    pub fn kind(&self) -> DriverKind {
        match self {
            Self::Library(_) => DriverKind::Library,
            Self::Raw(_) => DriverKind::Raw,
        }
    }
}

impl<B: BusPort, D: DelayNs> ThermalSource for SensorSource<B, D> {
    fn bootstrap(&mut self) -> Result<CalibrationParameters, CalibrationError> {
        match self {
            Self::Library(d) => d.bootstrap(),
            Self::Raw(d) => d.bootstrap(),
        }
    }

    fn acquire(
        &mut self,
        params: &CalibrationParameters,
        settings: &ConversionSettings,
    ) -> Result<ThermalFrame, AcquisitionError> {
        match self {
            Self::Library(d) => d.acquire(params, settings),
            Self::Raw(d) => d.acquire(params, settings),
        }
    }
}
