//! Host-side MLX90640 simulation.
//!
//! [`SimulatedCamera`] answers `embedded-hal` I²C transactions with the
//! worked-example EEPROM and RAM from the datasheet, so the whole driver
//! stack can run under `cargo test`. Clones share state: keep one handle in
//! the test and hand the other to the driver, then inject faults mid-run.

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};

use crate::sensor::registers::{
    ControlRegister, CONTROL_REGISTER, DEFAULT_ADDRESS, EEPROM_START, EEPROM_WORDS, RAM_START,
    RAM_VDD_PIX, RAM_WORDS, STATUS_CLEAR, STATUS_NEW_DATA, STATUS_REGISTER, STATUS_SUBPAGE,
};

const EEPROM_HEADER: [u16; 64] = [
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x4210, 0xffbb, 0x0202, 0xf202, 0xf2f2, 0xe2e2, 0xd1e1, 0xb1d1,
    0xf10f, 0xf00f, 0xe0ef, 0xe0ef, 0xe1e1, 0xf3f2, 0xf404, 0xe504,
    0x79a6, 0x2f44, 0xffdd, 0x2210, 0x3333, 0x2233, 0xef01, 0x9acc,
    0xeedc, 0x10ff, 0x2221, 0x3333, 0x2333, 0x0112, 0xeeff, 0xbbdd,
    0x18ef, 0x2ff1, 0x5952, 0x9d68, 0x5454, 0x0994, 0x6956, 0x5354,
    0x2363, 0xe446, 0xfbb5, 0x044b, 0xf020, 0x9797, 0x9797, 0x2889,
];

const EEPROM_PIXEL: u16 = 0x08a0;
const RAM_PIXEL: u16 = 0x0261;
/// Control register of the worked example: chess, 18-bit, 2 Hz.
pub const DATASHEET_CONTROL: u16 = 0x1901;

/// EEPROM image of the datasheet's worked example.
pub fn datasheet_eeprom() -> [u16; EEPROM_WORDS] {
    let mut ee = [EEPROM_PIXEL; EEPROM_WORDS];
    ee[..EEPROM_HEADER.len()].copy_from_slice(&EEPROM_HEADER);
    ee
}

/// RAM image of the datasheet's worked example, captured at 18-bit resolution.
pub fn datasheet_ram() -> [u16; RAM_WORDS] {
    let mut ram = [RAM_PIXEL; RAM_WORDS];
    ram[768] = 0x4bf2; // VBE
    ram[776] = 0xffca; // CP subpage 0
    ram[778] = 0x1881; // gain
    ram[800] = 0x06af; // PTAT
    ram[808] = 0xffc8; // CP subpage 1
    ram[810] = 0xccc5; // VDD
    ram
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimOp {
    Read { address: u16, words: usize },
    Write { address: u16, value: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError(pub ErrorKind);

impl embedded_hal::i2c::Error for SimError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

struct SimState {
    address: u8,
    eeprom: [u16; EEPROM_WORDS],
    ram: [u16; RAM_WORDS],
    control: u16,
    subpage: u16,
    new_data: bool,
    present: bool,
    data_ready: bool,
    sticky_subpage: bool,
    eeprom_readable: bool,
    failing_reads: u32,
    ops: Vec<SimOp>,
}

impl SimState {
    fn word(&self, address: u16) -> u16 {
        let a = usize::from(address);
        let ram = usize::from(RAM_START);
        let eeprom = usize::from(EEPROM_START);
        match address {
            STATUS_REGISTER => {
                let ready = if self.new_data { STATUS_NEW_DATA } else { 0 };
                ready | (self.subpage & STATUS_SUBPAGE)
            }
            CONTROL_REGISTER => self.control,
            _ if (ram..ram + RAM_WORDS).contains(&a) => {
                let index = a - ram;
                if index == RAM_VDD_PIX {
                    self.scaled_vdd()
                } else {
                    self.ram[index]
                }
            }
            _ if (eeprom..eeprom + EEPROM_WORDS).contains(&a) => self.eeprom[a - eeprom],
            _ => 0,
        }
    }

    /// The stored VDD word is an 18-bit reading; rescale it to the ADC
    /// resolution currently selected in the control register.
    fn scaled_vdd(&self) -> u16 {
        let raw = i32::from(self.ram[RAM_VDD_PIX] as i16);
        let resolution = i32::from(ControlRegister(self.control).resolution().code());
        let scaled = if resolution >= 2 {
            raw << (resolution - 2)
        } else {
            raw >> (2 - resolution)
        };
        scaled.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16 as u16
    }

    fn write(&mut self, address: u16, value: u16) {
        self.ops.push(SimOp::Write { address, value });
        match address {
            STATUS_REGISTER if value == STATUS_CLEAR => {
                // Acknowledging a measurement starts the next subpage.
                if !self.sticky_subpage {
                    self.subpage ^= 1;
                }
                self.new_data = self.data_ready;
            }
            CONTROL_REGISTER => self.control = value,
            _ => {}
        }
    }
}

/// Simulated sensor on an I²C bus.
#[derive(Clone)]
pub struct SimulatedCamera {
    state: Rc<RefCell<SimState>>,
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCamera {
    /// A healthy sensor at the default address holding the datasheet images.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState {
                address: DEFAULT_ADDRESS,
                eeprom: datasheet_eeprom(),
                ram: datasheet_ram(),
                control: DATASHEET_CONTROL,
                subpage: 0,
                new_data: true,
                present: true,
                data_ready: true,
                sticky_subpage: false,
                eeprom_readable: true,
                failing_reads: 0,
                ops: Vec::new(),
            })),
        }
    }

    /// Stop acknowledging the device address.
    pub fn set_present(&self, present: bool) {
        self.state.borrow_mut().present = present;
    }

    /// Fail the next `count` read transactions with a bus error.
    pub fn fail_next_reads(&self, count: u32) {
        self.state.borrow_mut().failing_reads = count;
    }

    /// Set the device-select bit so extraction rejects the image.
    pub fn corrupt_eeprom(&self) {
        self.state.borrow_mut().eeprom[10] |= 0x0040;
    }

    pub fn set_eeprom_word(&self, index: usize, value: u16) {
        self.state.borrow_mut().eeprom[index] = value;
    }

    /// Make every EEPROM read fail while other addresses still answer.
    pub fn set_eeprom_readable(&self, readable: bool) {
        self.state.borrow_mut().eeprom_readable = readable;
    }

    /// Keep reporting the same subpage after every acknowledge.
    pub fn set_sticky_subpage(&self, sticky: bool) {
        self.state.borrow_mut().sticky_subpage = sticky;
    }

    /// Control whether the new-data flag is ever raised.
    pub fn set_data_ready(&self, ready: bool) {
        let mut s = self.state.borrow_mut();
        s.data_ready = ready;
        s.new_data = ready;
    }

    pub fn set_pixel(&self, index: usize, raw: u16) {
        self.state.borrow_mut().ram[index] = raw;
    }

    pub fn ram_word(&self, index: usize) -> u16 {
        self.state.borrow().ram[index]
    }

    pub fn control(&self) -> ControlRegister {
        ControlRegister(self.state.borrow().control)
    }

    pub fn operations(&self) -> Vec<SimOp> {
        self.state.borrow().ops.clone()
    }

    pub fn clear_operations(&self) {
        self.state.borrow_mut().ops.clear();
    }
}

impl ErrorType for SimulatedCamera {
    type Error = SimError;
}

impl I2c for SimulatedCamera {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut s = self.state.borrow_mut();
        if !s.present || address != s.address {
            return Err(SimError(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)));
        }

        let mut pointer = 0u16;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    if bytes.len() < 2 {
                        return Err(SimError(ErrorKind::Other));
                    }
                    pointer = u16::from_be_bytes([bytes[0], bytes[1]]);
                    if let [_, _, hi, lo] = bytes[..] {
                        s.write(pointer, u16::from_be_bytes([hi, lo]));
                    }
                }
                Operation::Read(buf) => {
                    if s.failing_reads > 0 {
                        s.failing_reads -= 1;
                        return Err(SimError(ErrorKind::Bus));
                    }
                    let in_eeprom = (EEPROM_START..EEPROM_START + EEPROM_WORDS as u16).contains(&pointer);
                    if !s.eeprom_readable && in_eeprom {
                        return Err(SimError(ErrorKind::Bus));
                    }
                    s.ops.push(SimOp::Read {
                        address: pointer,
                        words: buf.len() / 2,
                    });
                    for (i, pair) in buf.chunks_exact_mut(2).enumerate() {
                        let word = s.word(pointer.wrapping_add(i as u16));
                        pair.copy_from_slice(&word.to_be_bytes());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately and tallies what was requested.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDelay {
    pub total_ns: u64,
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
