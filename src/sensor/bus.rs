//! Word-addressed control bus for the MLX90640.
//!
//! The sensor exposes a 16-bit address space of 16-bit big-endian words.
//! [`BusPort`] is what the driver needs from it; [`I2cBus`] implements it
//! over any `embedded-hal` 1.0 I²C peripheral.

use embedded_hal::i2c::{ErrorKind, I2c};
use log::debug;

use crate::error::BusError;
use crate::sensor::registers::{ControlRegister, RefreshRate, CONTROL_REGISTER, STATUS_REGISTER};

/// Largest number of words fetched in one I²C transaction.
const READ_CHUNK_WORDS: usize = 64;

// ───────────────────────────────────────────────────────────────
//  Port
// ───────────────────────────────────────────────────────────────

pub trait BusPort {
    /// `true` if the device acknowledges a read of its status register.
    fn probe(&mut self) -> bool;

    /// Read `out.len()` consecutive words starting at `start`.
    fn burst_read(&mut self, start: u16, out: &mut [u16]) -> Result<(), BusError>;

    fn write_word(&mut self, address: u16, value: u16) -> Result<(), BusError>;

    fn set_clock_speed(&mut self, hz: u32) -> Result<(), BusError>;

    fn read_word(&mut self, address: u16) -> Result<u16, BusError> {
        let mut word = [0u16; 1];
        self.burst_read(address, &mut word)?;
        Ok(word[0])
    }

    /// Read-modify-write of the refresh-rate field in the control register.
    fn set_refresh_rate(&mut self, rate: RefreshRate) -> Result<(), BusError> {
        let control = ControlRegister(self.read_word(CONTROL_REGISTER)?);
        self.write_word(CONTROL_REGISTER, control.with_refresh_rate(rate).0)
    }
}

// ───────────────────────────────────────────────────────────────
//  embedded-hal adapter
// ───────────────────────────────────────────────────────────────

pub struct I2cBus<I2C> {
    i2c: I2C,
    address: u8,
    clock_hz: u32,
}

impl<I2C: I2c> I2cBus<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            clock_hz: 0,
        }
    }

    /// Last clock speed requested through [`BusPort::set_clock_speed`].
    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

fn classify<E: embedded_hal::i2c::Error>(err: &E) -> BusError {
    match err.kind() {
        ErrorKind::NoAcknowledge(_) => BusError::NoAcknowledge,
        _ => BusError::Transfer,
    }
}

impl<I2C: I2c> BusPort for I2cBus<I2C> {
    fn probe(&mut self) -> bool {
        self.read_word(STATUS_REGISTER).is_ok()
    }

    fn burst_read(&mut self, start: u16, out: &mut [u16]) -> Result<(), BusError> {
        let mut bytes = [0u8; READ_CHUNK_WORDS * 2];
        let mut address = start;
        for chunk in out.chunks_mut(READ_CHUNK_WORDS) {
            let buf = &mut bytes[..chunk.len() * 2];
            self.i2c
                .write_read(self.address, &address.to_be_bytes(), buf)
                .map_err(|e| classify(&e))?;
            for (word, pair) in chunk.iter_mut().zip(buf.chunks_exact(2)) {
                *word = u16::from_be_bytes([pair[0], pair[1]]);
            }
            address = address.wrapping_add(chunk.len() as u16);
        }
        Ok(())
    }

    fn write_word(&mut self, address: u16, value: u16) -> Result<(), BusError> {
        let [ah, al] = address.to_be_bytes();
        let [vh, vl] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[ah, al, vh, vl])
            .map_err(|e| classify(&e))
    }

    // The ESP-IDF I²C driver fixes its clock at construction; record the
    // request so callers can verify it was issued.
    fn set_clock_speed(&mut self, hz: u32) -> Result<(), BusError> {
        debug!("I2C | clock {} Hz requested", hz);
        self.clock_hz = hz;
        Ok(())
    }
}
