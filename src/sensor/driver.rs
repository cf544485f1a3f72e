//! Register-level MLX90640 protocol: configuration, EEPROM dump and the
//! two-subpage read.

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::error::{AcquisitionError, BusError, CalibrationError};
use crate::frame::ThermalFrame;
use crate::sensor::bus::BusPort;
use crate::sensor::calibration::{self, CalibrationParameters};
use crate::sensor::conversion::{assemble_frame, ConversionSettings, RawSubpageSample};
use crate::sensor::registers::{
    AdcResolution, ControlRegister, ReadoutPattern, RefreshRate, CONTROL_REGISTER, EEPROM_WORDS,
    FRAME_CONTROL, FRAME_SUBPAGE, FRAME_WORDS, INVALID_WORD, RAM_START, RAM_WORDS, STATUS_CLEAR,
    STATUS_NEW_DATA, STATUS_REGISTER, STATUS_SUBPAGE,
};

/// Bounds on the new-data poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub limit: u16,
    pub interval_ms: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            limit: 60,
            interval_ms: 10,
        }
    }
}

pub struct Mlx90640<B, D> {
    bus: B,
    delay: D,
    poll: PollPolicy,
}

impl<B: BusPort, D: DelayNs> Mlx90640<B, D> {
    pub fn new(bus: B, delay: D, poll: PollPolicy) -> Self {
        Self { bus, delay, poll }
    }

    pub fn bus(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn probe(&mut self) -> bool {
        self.bus.probe()
    }

    pub fn dump_eeprom(&mut self) -> Result<Box<[u16; EEPROM_WORDS]>, CalibrationError> {
        calibration::dump_eeprom(&mut self.bus)
    }

    /// Program readout pattern, ADC resolution and refresh rate.
    pub fn configure(
        &mut self,
        pattern: ReadoutPattern,
        resolution: AdcResolution,
        rate: RefreshRate,
    ) -> Result<(), BusError> {
        let current = ControlRegister(self.bus.read_word(CONTROL_REGISTER)?);
        let wanted = current.with_pattern(pattern).with_resolution(resolution);
        if wanted != current {
            self.bus.write_word(CONTROL_REGISTER, wanted.0)?;
        }
        self.bus.set_refresh_rate(rate)?;
        debug!("MLX | control {:#06x} ({:?}, {:?}, {:?})", wanted.0, pattern, resolution, rate);
        Ok(())
    }

    /// Wait for the next measured subpage and read it.
    pub fn read_subpage(&mut self) -> Result<RawSubpageSample, AcquisitionError> {
        let status = self.wait_for_data()?;
        self.bus.write_word(STATUS_REGISTER, STATUS_CLEAR)?;

        let mut words = Box::new([0u16; FRAME_WORDS]);
        self.bus.burst_read(RAM_START, &mut words[..RAM_WORDS])?;
        words[FRAME_CONTROL] = self.bus.read_word(CONTROL_REGISTER)?;
        words[FRAME_SUBPAGE] = status & STATUS_SUBPAGE;

        if words[..RAM_WORDS].contains(&INVALID_WORD) {
            return Err(AcquisitionError::InvalidData);
        }
        Ok(RawSubpageSample::new(words))
    }

    fn wait_for_data(&mut self) -> Result<u16, AcquisitionError> {
        for attempt in 0..self.poll.limit {
            let status = self.bus.read_word(STATUS_REGISTER)?;
            if status & STATUS_NEW_DATA != 0 {
                return Ok(status);
            }
            if attempt + 1 < self.poll.limit {
                self.delay.delay_ms(self.poll.interval_ms);
            }
        }
        Err(AcquisitionError::NotReady)
    }

    /// Read one subpage of each parity. The attempt is discarded if the
    /// second read repeats the first subpage.
    pub fn acquire_pair(&mut self) -> Result<[RawSubpageSample; 2], AcquisitionError> {
        let first = self.read_subpage()?;
        let second = self.read_subpage()?;
        if first.subpage() == second.subpage() {
            return Err(AcquisitionError::DuplicateSubpage(second.subpage() as u8));
        }
        Ok([first, second])
    }

    /// Read a subpage pair and convert it into a frame.
    pub fn acquire_frame(
        &mut self,
        params: &CalibrationParameters,
        settings: &ConversionSettings,
    ) -> Result<ThermalFrame, AcquisitionError> {
        let samples = self.acquire_pair()?;
        assemble_frame(&samples, params, settings)
    }
}
