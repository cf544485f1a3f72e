//! Library-level acquisition: configures the sensor for continuous
//! interleaved readout and tolerates an unusable EEPROM.

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::app::ports::ThermalSource;
use crate::error::{AcquisitionError, CalibrationError};
use crate::frame::ThermalFrame;
use crate::sensor::bus::BusPort;
use crate::sensor::calibration::{self, CalibrationParameters};
use crate::sensor::conversion::ConversionSettings;
use crate::sensor::driver::Mlx90640;
use crate::sensor::registers::{AdcResolution, ReadoutPattern, RefreshRate};

/// Readout mode programmed at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadoutSetup {
    pub pattern: ReadoutPattern,
    pub resolution: AdcResolution,
    pub refresh_rate: RefreshRate,
}

impl Default for ReadoutSetup {
    fn default() -> Self {
        Self {
            pattern: ReadoutPattern::Interleaved,
            resolution: AdcResolution::Bits16,
            refresh_rate: RefreshRate::FourHz,
        }
    }
}

pub struct LibraryDriver<B, D> {
    mlx: Mlx90640<B, D>,
    setup: ReadoutSetup,
}

impl<B: BusPort, D: DelayNs> LibraryDriver<B, D> {
    pub fn new(mlx: Mlx90640<B, D>, setup: ReadoutSetup) -> Self {
        Self { mlx, setup }
    }

    pub fn sensor(&mut self) -> &mut Mlx90640<B, D> {
        &mut self.mlx
    }
}

impl<B: BusPort, D: DelayNs> ThermalSource for LibraryDriver<B, D> {
    fn bootstrap(&mut self) -> Result<CalibrationParameters, CalibrationError> {
        if !self.mlx.probe() {
            error!("MLX | sensor not detected");
            return Err(CalibrationError::SensorNotDetected);
        }

        let ReadoutSetup {
            pattern,
            resolution,
            refresh_rate,
        } = self.setup;
        if let Err(e) = self.mlx.configure(pattern, resolution, refresh_rate) {
            warn!("MLX | readout setup failed ({}), keeping device defaults", e);
        }

        let extracted = self
            .mlx
            .dump_eeprom()
            .and_then(|ee| calibration::extract(&ee[..]));
        match extracted {
            Ok(params) => {
                info!("MLX | calibrated from EEPROM");
                Ok(params)
            }
            Err(e) => {
                warn!("MLX | {}; continuing with preset constants", e);
                Ok(calibration::preset())
            }
        }
    }

    fn acquire(
        &mut self,
        params: &CalibrationParameters,
        settings: &ConversionSettings,
    ) -> Result<ThermalFrame, AcquisitionError> {
        self.mlx.acquire_frame(params, settings)
    }
}
