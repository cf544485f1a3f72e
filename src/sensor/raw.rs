//! Raw low-level acquisition: sets bus clock and refresh rate only, and
//! refuses to run without a valid EEPROM.

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::app::ports::ThermalSource;
use crate::error::{AcquisitionError, CalibrationError};
use crate::frame::ThermalFrame;
use crate::sensor::bus::BusPort;
use crate::sensor::calibration::{self, CalibrationParameters};
use crate::sensor::conversion::ConversionSettings;
use crate::sensor::driver::Mlx90640;
use crate::sensor::registers::RefreshRate;

pub struct RawDriver<B, D> {
    mlx: Mlx90640<B, D>,
    clock_hz: u32,
    refresh_rate: RefreshRate,
}

impl<B: BusPort, D: DelayNs> RawDriver<B, D> {
    pub fn new(mlx: Mlx90640<B, D>, clock_hz: u32, refresh_rate: RefreshRate) -> Self {
        Self {
            mlx,
            clock_hz,
            refresh_rate,
        }
    }

    pub fn sensor(&mut self) -> &mut Mlx90640<B, D> {
        &mut self.mlx
    }
}

impl<B: BusPort, D: DelayNs> ThermalSource for RawDriver<B, D> {
    fn bootstrap(&mut self) -> Result<CalibrationParameters, CalibrationError> {
        if !self.mlx.probe() {
            error!("MLX | sensor not detected");
            return Err(CalibrationError::SensorNotDetected);
        }

        let (clock_hz, rate) = (self.clock_hz, self.refresh_rate);
        let bus = self.mlx.bus();
        if let Err(e) = bus
            .set_clock_speed(clock_hz)
            .and_then(|()| bus.set_refresh_rate(rate))
        {
            warn!("MLX | bus setup failed ({})", e);
        }

        let params = calibration::extract_calibration(self.mlx.bus()).inspect_err(|e| {
            error!("MLX | calibration failed: {}", e);
        })?;
        info!("MLX | raw driver calibrated");
        Ok(params)
    }

    fn acquire(
        &mut self,
        params: &CalibrationParameters,
        settings: &ConversionSettings,
    ) -> Result<ThermalFrame, AcquisitionError> {
        self.mlx.acquire_frame(params, settings)
    }
}
