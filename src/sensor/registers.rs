//! MLX90640 memory map and control-register fields.

use serde::{Deserialize, Serialize};

/// Factory default 7-bit I²C address.
pub const DEFAULT_ADDRESS: u8 = 0x33;

/// Status register: new-data flag, last measured subpage.
pub const STATUS_REGISTER: u16 = 0x8000;
/// Control register 1: refresh rate, ADC resolution, readout pattern.
pub const CONTROL_REGISTER: u16 = 0x800D;

pub const STATUS_NEW_DATA: u16 = 0x0008;
pub const STATUS_SUBPAGE: u16 = 0x0001;
/// Written to the status register to acknowledge a measurement.
pub const STATUS_CLEAR: u16 = 0x0030;

pub const EEPROM_START: u16 = 0x2400;
pub const EEPROM_WORDS: usize = 832;

pub const RAM_START: u16 = 0x0400;
/// 768 pixel words followed by 64 auxiliary words.
pub const RAM_WORDS: usize = 832;
/// RAM plus the control register and subpage index appended after the read.
pub const FRAME_WORDS: usize = RAM_WORDS + 2;

// Word offsets into a frame buffer (relative to RAM_START).
pub const RAM_TA_VBE: usize = 768;
pub const RAM_CP_SUBPAGE_0: usize = 776;
pub const RAM_GAIN: usize = 778;
pub const RAM_TA_PTAT: usize = 800;
pub const RAM_CP_SUBPAGE_1: usize = 808;
pub const RAM_VDD_PIX: usize = 810;
pub const FRAME_CONTROL: usize = 832;
pub const FRAME_SUBPAGE: usize = 833;

/// Marker the sensor writes into words it could not measure.
pub const INVALID_WORD: u16 = 0x7FFF;

const REFRESH_SHIFT: u16 = 7;
const REFRESH_MASK: u16 = 0x0380;
const RESOLUTION_SHIFT: u16 = 10;
const RESOLUTION_MASK: u16 = 0x0C00;
const PATTERN_MASK: u16 = 0x1000;

/// Subpage refresh rate, control register bits 7..9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshRate {
    HalfHz,
    OneHz,
    TwoHz,
    FourHz,
    EightHz,
    SixteenHz,
    ThirtyTwoHz,
    SixtyFourHz,
}

impl RefreshRate {
    pub const fn code(self) -> u16 {
        self as u16
    }

    pub const fn from_code(code: u16) -> Self {
        match code & 0x7 {
            0 => Self::HalfHz,
            1 => Self::OneHz,
            2 => Self::TwoHz,
            3 => Self::FourHz,
            4 => Self::EightHz,
            5 => Self::SixteenHz,
            6 => Self::ThirtyTwoHz,
            _ => Self::SixtyFourHz,
        }
    }

    /// Time between two subpages, in milliseconds.
    pub const fn subpage_period_ms(self) -> u32 {
        match self {
            Self::HalfHz => 2000,
            Self::OneHz => 1000,
            Self::TwoHz => 500,
            Self::FourHz => 250,
            Self::EightHz => 125,
            Self::SixteenHz => 63,
            Self::ThirtyTwoHz => 32,
            Self::SixtyFourHz => 16,
        }
    }
}

/// ADC resolution, control register bits 10..11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdcResolution {
    Bits16,
    Bits17,
    Bits18,
    Bits19,
}

impl AdcResolution {
    pub const fn code(self) -> u16 {
        self as u16
    }

    pub const fn from_code(code: u16) -> Self {
        match code & 0x3 {
            0 => Self::Bits16,
            1 => Self::Bits17,
            2 => Self::Bits18,
            _ => Self::Bits19,
        }
    }
}

/// Which pixels make up a subpage, control register bit 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadoutPattern {
    /// Alternating rows.
    Interleaved,
    /// Checkerboard.
    Chess,
}

/// Typed view over control register 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRegister(pub u16);

impl ControlRegister {
    pub fn refresh_rate(self) -> RefreshRate {
        RefreshRate::from_code((self.0 & REFRESH_MASK) >> REFRESH_SHIFT)
    }

    pub fn resolution(self) -> AdcResolution {
        AdcResolution::from_code((self.0 & RESOLUTION_MASK) >> RESOLUTION_SHIFT)
    }

    pub fn pattern(self) -> ReadoutPattern {
        if self.0 & PATTERN_MASK == 0 {
            ReadoutPattern::Interleaved
        } else {
            ReadoutPattern::Chess
        }
    }

    #[must_use]
    pub fn with_refresh_rate(self, rate: RefreshRate) -> Self {
        Self((self.0 & !REFRESH_MASK) | (rate.code() << REFRESH_SHIFT))
    }

    #[must_use]
    pub fn with_resolution(self, resolution: AdcResolution) -> Self {
        Self((self.0 & !RESOLUTION_MASK) | (resolution.code() << RESOLUTION_SHIFT))
    }

    #[must_use]
    pub fn with_pattern(self, pattern: ReadoutPattern) -> Self {
        match pattern {
            ReadoutPattern::Interleaved => Self(self.0 & !PATTERN_MASK),
            ReadoutPattern::Chess => Self(self.0 | PATTERN_MASK),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasheet_control_register_decodes() {
        // 0x1901: chess, 18-bit, 2 Hz
        let reg = ControlRegister(0x1901);
        assert_eq!(reg.pattern(), ReadoutPattern::Chess);
        assert_eq!(reg.resolution(), AdcResolution::Bits18);
        assert_eq!(reg.refresh_rate(), RefreshRate::TwoHz);
    }

    #[test]
    fn field_writes_preserve_other_bits() {
        let reg = ControlRegister(0x1901)
            .with_pattern(ReadoutPattern::Interleaved)
            .with_resolution(AdcResolution::Bits16)
            .with_refresh_rate(RefreshRate::FourHz);
        assert_eq!(reg.0, 0x0181);
        assert_eq!(reg.pattern(), ReadoutPattern::Interleaved);
        assert_eq!(reg.resolution(), AdcResolution::Bits16);
        assert_eq!(reg.refresh_rate(), RefreshRate::FourHz);
    }

    #[test]
    fn refresh_codes_round_trip() {
        for code in 0..8 {
            assert_eq!(RefreshRate::from_code(code).code(), code);
        }
    }
}
