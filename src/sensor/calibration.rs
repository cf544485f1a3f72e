//! Calibration store.
//!
//! Every MLX90640 ships with per-device correction constants in its EEPROM.
//! They are dumped once at boot and unpacked into [`CalibrationParameters`],
//! which then stays immutable for the life of the process.
//!
//! ```text
//!   probe ──▶ dump 0x2400..0x2740 ──▶ validate ──▶ extract
//!   (ack?)        (832 words)          (deviating pixels, select bit)
//! ```
//!
//! Extraction works on `i32` throughout so that malformed dumps produce a
//! [`CalibrationError`] instead of an overflow.

use heapless::Vec as HVec;
use log::{info, warn};

use crate::error::CalibrationError;
use crate::frame::{PIXELS, WIDTH};
use crate::sensor::bus::BusPort;
use crate::sensor::registers::{EEPROM_START, EEPROM_WORDS};

/// Tolerated broken or outlier pixels, per category and combined.
pub const MAX_DEVIATING_PIXELS: usize = 4;

/// Where a parameter set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationSource {
    /// Unpacked from this device's EEPROM.
    Eeprom,
    /// Nominal constants substituted after a failed dump.
    Preset,
}

/// Per-device correction constants.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationParameters {
    pub source: CalibrationSource,

    pub k_vdd: i32,
    pub vdd_25: i32,
    pub kv_ptat: f32,
    pub kt_ptat: f32,
    pub v_ptat_25: f32,
    pub alpha_ptat: f32,
    pub gain_ee: i32,
    pub tgc: f32,
    pub ks_ta: f32,
    pub resolution_ee: u8,

    /// Sensitivity slope per temperature range.
    pub ks_to: [f32; 4],
    /// Lower bound (°C) of each temperature range.
    pub ct: [i32; 4],

    pub cp_alpha: [f32; 2],
    pub cp_offset: [i32; 2],
    pub cp_kta: f32,
    pub cp_kv: f32,

    pub alpha: Box<[f32; PIXELS]>,
    pub offset: Box<[i32; PIXELS]>,
    pub kta: Box<[f32; PIXELS]>,
    pub kv: Box<[f32; PIXELS]>,

    /// Interleave/chess correction coefficients.
    pub il_chess_c: [f32; 3],
    /// Readout mode the device was calibrated in, as `0x00` or `0x80`.
    pub calibration_mode_ee: u8,

    pub broken_pixels: HVec<u16, MAX_DEVIATING_PIXELS>,
    pub outlier_pixels: HVec<u16, MAX_DEVIATING_PIXELS>,
}

impl CalibrationParameters {
    /// Every deviating pixel, broken first.
    pub fn deviating_pixels(&self) -> impl Iterator<Item = u16> + '_ {
        self.broken_pixels.iter().chain(self.outlier_pixels.iter()).copied()
    }
}

// ───────────────────────────────────────────────────────────────
//  Bootstrap
// ───────────────────────────────────────────────────────────────

/// Probe, dump and extract, in that order.
pub fn extract_calibration(bus: &mut impl BusPort) -> Result<CalibrationParameters, CalibrationError> {
    if !bus.probe() {
        return Err(CalibrationError::SensorNotDetected);
    }
    let eeprom = dump_eeprom(bus)?;
    let params = extract(&eeprom[..])?;
    info!(
        "CAL | extracted ({} broken, {} outlier pixels)",
        params.broken_pixels.len(),
        params.outlier_pixels.len()
    );
    Ok(params)
}

pub fn dump_eeprom(bus: &mut impl BusPort) -> Result<Box<[u16; EEPROM_WORDS]>, CalibrationError> {
    let mut eeprom = Box::new([0u16; EEPROM_WORDS]);
    bus.burst_read(EEPROM_START, &mut eeprom[..])
        .map_err(CalibrationError::DumpFailed)?;
    Ok(eeprom)
}

// ───────────────────────────────────────────────────────────────
//  Extraction
// ───────────────────────────────────────────────────────────────

const PIXEL_BASE: usize = 64;
const DEVICE_SELECT: u16 = 0x0040;

/// Two's-complement value of the low `bits` bits of `raw`.
fn signed(raw: u16, bits: u32) -> i32 {
    let value = i32::from(raw) & ((1 << bits) - 1);
    if value >= 1 << (bits - 1) {
        value - (1 << bits)
    } else {
        value
    }
}

fn nibble(word: u16, index: u32) -> i32 {
    signed(word >> (index * 4), 4)
}

fn pow2(exp: i32) -> f32 {
    2f32.powi(exp)
}

/// Unpack a raw EEPROM image.
pub fn extract(ee: &[u16]) -> Result<CalibrationParameters, CalibrationError> {
    if ee.len() < EEPROM_WORDS {
        return Err(CalibrationError::ParameterExtractionFailed("short EEPROM image"));
    }
    if ee[10] & DEVICE_SELECT != 0 {
        return Err(CalibrationError::ParameterExtractionFailed("device select bit set"));
    }

    // Supply voltage
    let k_vdd = signed(ee[51] >> 8, 8) * 32;
    let vdd_25 = ((i32::from(ee[51] & 0xFF) - 256) * 32) - 8192;

    // Ambient temperature
    let kv_ptat = signed(ee[50] >> 10, 6) as f32 / 4096.0;
    let kt_ptat = signed(ee[50], 10) as f32 / 8.0;
    let v_ptat_25 = f32::from(ee[49]);
    let alpha_ptat = f32::from((ee[16] & 0xF000) >> 12) / 4.0 + 8.0;

    let gain_ee = i32::from(ee[48] as i16);
    let tgc = signed(ee[60], 8) as f32 / 32.0;
    let ks_ta = signed(ee[60] >> 8, 8) as f32 / 8192.0;
    let resolution_ee = ((ee[56] & 0x3000) >> 12) as u8;

    if k_vdd == 0 {
        return Err(CalibrationError::ParameterExtractionFailed("zero Kvdd"));
    }
    if kt_ptat == 0.0 {
        return Err(CalibrationError::ParameterExtractionFailed("zero KtPTAT"));
    }
    if gain_ee == 0 {
        return Err(CalibrationError::ParameterExtractionFailed("zero gain"));
    }

    let (ks_to, ct) = extract_ks_to(ee);
    let cp = extract_compensation_pixel(ee);

    let alpha = extract_alpha(ee)?;
    let offset = extract_offset(ee);
    let (kta, kv) = extract_kta_kv(ee);

    let il_chess_c = [
        signed(ee[53], 6) as f32 / 16.0,
        signed((ee[53] & 0x07C0) >> 6, 5) as f32 / 2.0,
        signed((ee[53] & 0xF800) >> 11, 5) as f32 / 8.0,
    ];
    let calibration_mode_ee = (((ee[10] & 0x0800) >> 4) as u8) ^ 0x80;

    let (broken_pixels, outlier_pixels) = extract_deviating_pixels(ee)?;

    Ok(CalibrationParameters {
        source: CalibrationSource::Eeprom,
        k_vdd,
        vdd_25,
        kv_ptat,
        kt_ptat,
        v_ptat_25,
        alpha_ptat,
        gain_ee,
        tgc,
        ks_ta,
        resolution_ee,
        ks_to,
        ct,
        cp_alpha: cp.alpha,
        cp_offset: cp.offset,
        cp_kta: cp.kta,
        cp_kv: cp.kv,
        alpha,
        offset,
        kta,
        kv,
        il_chess_c,
        calibration_mode_ee,
        broken_pixels,
        outlier_pixels,
    })
}

fn extract_ks_to(ee: &[u16]) -> ([f32; 4], [i32; 4]) {
    let step = i32::from((ee[63] & 0x3000) >> 12) * 10;
    let ct2 = i32::from((ee[63] & 0x00F0) >> 4) * step;
    let ct3 = ct2 + i32::from((ee[63] & 0x0F00) >> 8) * step;
    let scale = pow2(i32::from(ee[63] & 0x000F) + 8);
    let ks_to = [
        signed(ee[61], 8) as f32 / scale,
        signed(ee[61] >> 8, 8) as f32 / scale,
        signed(ee[62], 8) as f32 / scale,
        signed(ee[62] >> 8, 8) as f32 / scale,
    ];
    (ks_to, [-40, 0, ct2, ct3])
}

struct CompensationPixel {
    alpha: [f32; 2],
    offset: [i32; 2],
    kta: f32,
    kv: f32,
}

fn extract_compensation_pixel(ee: &[u16]) -> CompensationPixel {
    let alpha_scale = i32::from((ee[32] & 0xF000) >> 12) + 27;

    let offset0 = signed(ee[58], 10);
    let offset1 = offset0 + signed(ee[58] >> 10, 6);

    let alpha0 = signed(ee[57], 10) as f32 / pow2(alpha_scale);
    let alpha1 = (1.0 + signed(ee[57] >> 10, 6) as f32 / 128.0) * alpha0;

    let kta_scale = i32::from((ee[56] & 0x00F0) >> 4) + 8;
    let kv_scale = i32::from((ee[56] & 0x0F00) >> 8);

    CompensationPixel {
        alpha: [alpha0, alpha1],
        offset: [offset0, offset1],
        kta: signed(ee[59], 8) as f32 / pow2(kta_scale),
        kv: signed(ee[59] >> 8, 8) as f32 / pow2(kv_scale),
    }
}

/// Row and column accumulators: 24 row nibbles from 6 words, then 32 column
/// nibbles from 8 words, low nibble first.
fn accumulators(ee: &[u16], rows_at: usize, cols_at: usize) -> ([i32; 24], [i32; 32]) {
    let mut rows = [0i32; 24];
    for (i, r) in rows.iter_mut().enumerate() {
        *r = nibble(ee[rows_at + i / 4], (i % 4) as u32);
    }
    let mut cols = [0i32; 32];
    for (i, c) in cols.iter_mut().enumerate() {
        *c = nibble(ee[cols_at + i / 4], (i % 4) as u32);
    }
    (rows, cols)
}

fn extract_alpha(ee: &[u16]) -> Result<Box<[f32; PIXELS]>, CalibrationError> {
    let rem_scale = 1i32 << (ee[32] & 0x000F);
    let col_scale = 1i32 << ((ee[32] & 0x00F0) >> 4);
    let row_scale = 1i32 << ((ee[32] & 0x0F00) >> 8);
    let alpha_scale = pow2(i32::from((ee[32] & 0xF000) >> 12) + 30);
    let alpha_ref = i32::from(ee[33]);
    if alpha_ref == 0 {
        return Err(CalibrationError::ParameterExtractionFailed("zero alpha reference"));
    }
    let (acc_row, acc_col) = accumulators(ee, 34, 40);

    let mut alpha = Box::new([0f32; PIXELS]);
    for (p, a) in alpha.iter_mut().enumerate() {
        let (row, col) = (p / WIDTH, p % WIDTH);
        let own = signed((ee[PIXEL_BASE + p] & 0x03F0) >> 4, 6) * rem_scale;
        let raw = alpha_ref + acc_row[row] * row_scale + acc_col[col] * col_scale + own;
        *a = raw as f32 / alpha_scale;
    }
    Ok(alpha)
}

fn extract_offset(ee: &[u16]) -> Box<[i32; PIXELS]> {
    let rem_scale = 1i32 << (ee[16] & 0x000F);
    let col_scale = 1i32 << ((ee[16] & 0x00F0) >> 4);
    let row_scale = 1i32 << ((ee[16] & 0x0F00) >> 8);
    let offset_ref = i32::from(ee[17] as i16);
    let (occ_row, occ_col) = accumulators(ee, 18, 24);

    let mut offset = Box::new([0i32; PIXELS]);
    for (p, o) in offset.iter_mut().enumerate() {
        let (row, col) = (p / WIDTH, p % WIDTH);
        let own = signed(ee[PIXEL_BASE + p] >> 10, 6) * rem_scale;
        *o = offset_ref + occ_row[row] * row_scale + occ_col[col] * col_scale + own;
    }
    offset
}

/// Index into the odd/even row/column tables.
fn split(p: usize) -> usize {
    2 * ((p / WIDTH) % 2) + p % 2
}

fn extract_kta_kv(ee: &[u16]) -> (Box<[f32; PIXELS]>, Box<[f32; PIXELS]>) {
    let kta_rc = [
        signed(ee[54] >> 8, 8),
        signed(ee[55] >> 8, 8),
        signed(ee[54], 8),
        signed(ee[55], 8),
    ];
    let kta_scale1 = pow2(i32::from((ee[56] & 0x00F0) >> 4) + 8);
    let kta_scale2 = 1i32 << (ee[56] & 0x000F);

    let kv_t = [
        nibble(ee[52], 3),
        nibble(ee[52], 1),
        nibble(ee[52], 2),
        nibble(ee[52], 0),
    ];
    let kv_scale = pow2(i32::from((ee[56] & 0x0F00) >> 8));

    let mut kta = Box::new([0f32; PIXELS]);
    let mut kv = Box::new([0f32; PIXELS]);
    for p in 0..PIXELS {
        let s = split(p);
        let own = signed((ee[PIXEL_BASE + p] & 0x000E) >> 1, 3) * kta_scale2;
        kta[p] = (kta_rc[s] + own) as f32 / kta_scale1;
        kv[p] = kv_t[s] as f32 / kv_scale;
    }
    (kta, kv)
}

type DeviatingLists = (HVec<u16, MAX_DEVIATING_PIXELS>, HVec<u16, MAX_DEVIATING_PIXELS>);

fn extract_deviating_pixels(ee: &[u16]) -> Result<DeviatingLists, CalibrationError> {
    let mut broken = HVec::new();
    let mut outlier = HVec::new();
    for p in 0..PIXELS {
        let word = ee[PIXEL_BASE + p];
        let list = if word == 0 {
            &mut broken
        } else if word & 0x0001 != 0 {
            &mut outlier
        } else {
            continue;
        };
        list.push(p as u16).map_err(|_| {
            CalibrationError::ParameterExtractionFailed("more than four deviating pixels")
        })?;
    }
    if broken.len() + outlier.len() > MAX_DEVIATING_PIXELS {
        return Err(CalibrationError::ParameterExtractionFailed(
            "more than four deviating pixels",
        ));
    }

    let all: HVec<u16, { 2 * MAX_DEVIATING_PIXELS }> =
        broken.iter().chain(outlier.iter()).copied().collect();
    for (i, &a) in all.iter().enumerate() {
        for &b in &all[i + 1..] {
            if adjacent(a, b) {
                return Err(CalibrationError::ParameterExtractionFailed(
                    "adjacent deviating pixels",
                ));
            }
        }
    }
    Ok((broken, outlier))
}

/// Deviating pixels may not touch, including diagonally.
fn adjacent(a: u16, b: u16) -> bool {
    let d = i32::from(a) - i32::from(b);
    (-34 < d && d < -30) || (-2 < d && d < 2) || (30 < d && d < 34)
}

// ───────────────────────────────────────────────────────────────
//  Preset
// ───────────────────────────────────────────────────────────────

/// Nominal constants for a typical device, used when the EEPROM cannot be
/// read. Temperatures will be plausible but not accurate.
pub fn preset() -> CalibrationParameters {
    warn!("CAL | using preset calibration constants");
    CalibrationParameters {
        source: CalibrationSource::Preset,
        k_vdd: -3168,
        vdd_25: -13056,
        kv_ptat: 22.0 / 4096.0,
        kt_ptat: 42.25,
        v_ptat_25: 12273.0,
        alpha_ptat: 9.0,
        gain_ee: 6383,
        tgc: 0.0,
        ks_ta: -0.001_953_125,
        resolution_ee: 2,
        ks_to: [-0.000_801_086_4; 4],
        ct: [-40, 0, 160, 320],
        cp_alpha: [4.074_536e-9, 3.851_71e-9],
        cp_offset: [-75, -77],
        cp_kta: 0.004_577_637,
        cp_kv: 0.5,
        alpha: Box::new([1.262_233e-7; PIXELS]),
        offset: Box::new([-75; PIXELS]),
        kta: Box::new([0.005_126_953; PIXELS]),
        kv: Box::new([0.5; PIXELS]),
        il_chess_c: [0.0; 3],
        calibration_mode_ee: 0x80,
        broken_pixels: HVec::new(),
        outlier_pixels: HVec::new(),
    }
}
