//! Fuzz target: `calibration::extract`
//!
//! Interprets the input as little-endian EEPROM words. Extraction may
//! reject the image but must never panic.
//!
//! cargo fuzz run fuzz_calibration_extract

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermocam::sensor::calibration;

fuzz_target!(|data: &[u8]| {
    let words: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    if let Ok(params) = calibration::extract(&words) {
        assert_eq!(params.source, calibration::CalibrationSource::Eeprom);
    }
});
