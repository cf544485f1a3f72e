//! Raw subpage words → calibrated temperatures.
//!
//! Pure functions of (raw subpages, calibration, emissivity, reflected
//! temperature). Nothing here touches the bus.

use crate::error::AcquisitionError;
use crate::frame::{ThermalFrame, PIXELS, WIDTH, HEIGHT};
use crate::sensor::calibration::CalibrationParameters;
use crate::sensor::registers::{
    ControlRegister, FRAME_CONTROL, FRAME_SUBPAGE, FRAME_WORDS, RAM_CP_SUBPAGE_0,
    RAM_CP_SUBPAGE_1, RAM_GAIN, RAM_TA_PTAT, RAM_TA_VBE, RAM_VDD_PIX,
};

const KELVIN: f32 = 273.15;

/// One subpage as read from the sensor: 832 RAM words, then the control
/// register and subpage index.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSubpageSample {
    words: Box<[u16; FRAME_WORDS]>,
}

impl RawSubpageSample {
    pub fn new(words: Box<[u16; FRAME_WORDS]>) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[u16; FRAME_WORDS] {
        &self.words
    }

    pub fn subpage(&self) -> u16 {
        self.words[FRAME_SUBPAGE]
    }

    pub fn control(&self) -> ControlRegister {
        ControlRegister(self.words[FRAME_CONTROL])
    }

    fn signed(&self, index: usize) -> f32 {
        f32::from(self.words[index] as i16)
    }
}

/// Knobs applied at conversion time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionSettings {
    pub emissivity: f32,
    /// Reflected temperature is `Ta - ta_shift`.
    pub ta_shift: f32,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            emissivity: 0.95,
            ta_shift: 8.0,
        }
    }
}

/// Supply voltage in volts.
pub fn supply_voltage(sample: &RawSubpageSample, params: &CalibrationParameters) -> f32 {
    let resolution_ram = sample.control().resolution().code();
    let correction = 2f32.powi(i32::from(params.resolution_ee)) / 2f32.powi(i32::from(resolution_ram));
    let vdd_raw = sample.signed(RAM_VDD_PIX);
    (correction * vdd_raw - params.vdd_25 as f32) / params.k_vdd as f32 + 3.3
}

/// Die (ambient) temperature in °C.
pub fn ambient_temperature(sample: &RawSubpageSample, params: &CalibrationParameters) -> f32 {
    let vdd = supply_voltage(sample, params);
    let ptat = sample.signed(RAM_TA_PTAT);
    let vbe = sample.signed(RAM_TA_VBE);
    let ptat_art = ptat / (ptat * params.alpha_ptat + vbe) * 262_144.0;
    (ptat_art / (1.0 + params.kv_ptat * (vdd - 3.3)) - params.v_ptat_25) / params.kt_ptat + 25.0
}

/// Subpage a pixel belongs to under the sample's readout pattern, plus the
/// interleave and conversion patterns used for the chess correction.
fn patterns(p: usize) -> (i32, i32, i32) {
    let il = ((p / WIDTH) % 2) as i32;
    let chess = il ^ (p % 2) as i32;
    let p = p as i32;
    let conversion = ((p + 2) / 4 - (p + 3) / 4 + (p + 1) / 4 - p / 4) * (1 - 2 * il);
    (il, chess, conversion)
}

/// Write every pixel of `sample`'s subpage into `out`; pixels of the other
/// subpage are left untouched.
pub fn convert_subpage(
    sample: &RawSubpageSample,
    params: &CalibrationParameters,
    settings: &ConversionSettings,
    out: &mut [f32; PIXELS],
) -> Result<(), AcquisitionError> {
    let subpage = usize::from(sample.subpage() & 1);
    let vdd = supply_voltage(sample, params);
    let ta = ambient_temperature(sample, params);
    let tr = ta - settings.ta_shift;
    if !vdd.is_finite() || !ta.is_finite() {
        return Err(AcquisitionError::InvalidData);
    }

    let ta4 = (ta + KELVIN).powi(4);
    let tr4 = (tr + KELVIN).powi(4);
    let ta_tr = tr4 - (tr4 - ta4) / settings.emissivity;

    let ks_to = &params.ks_to;
    let ct = &params.ct;
    let alpha_corr_r = {
        let r2 = 1.0 + ks_to[1] * ct[2] as f32;
        [
            1.0 / (1.0 + ks_to[0] * 40.0),
            1.0,
            r2,
            r2 * (1.0 + ks_to[2] * (ct[3] - ct[2]) as f32),
        ]
    };

    let gain_raw = sample.signed(RAM_GAIN);
    if gain_raw == 0.0 {
        return Err(AcquisitionError::InvalidData);
    }
    let gain = params.gain_ee as f32 / gain_raw;

    let mode = ((sample.words[FRAME_CONTROL] & 0x1000) >> 5) as u8;
    let chess_corrected = mode != params.calibration_mode_ee;

    let ta_term = ta - 25.0;
    let vdd_term = vdd - 3.3;
    let cp_scale = (1.0 + params.cp_kta * ta_term) * (1.0 + params.cp_kv * vdd_term);
    let cp_offset1 = params.cp_offset[1] as f32 + if chess_corrected { params.il_chess_c[0] } else { 0.0 };
    let ir_cp = [
        sample.signed(RAM_CP_SUBPAGE_0) * gain - params.cp_offset[0] as f32 * cp_scale,
        sample.signed(RAM_CP_SUBPAGE_1) * gain - cp_offset1 * cp_scale,
    ];

    for (p, t) in out.iter_mut().enumerate() {
        let (il, chess, conversion) = patterns(p);
        let pattern = if mode == 0 { il } else { chess };
        if pattern as usize != subpage {
            continue;
        }

        let mut ir = sample.signed(p) * gain;
        ir -= params.offset[p] as f32 * (1.0 + params.kta[p] * ta_term) * (1.0 + params.kv[p] * vdd_term);
        if chess_corrected {
            ir += params.il_chess_c[2] * (2 * il - 1) as f32 - params.il_chess_c[1] * conversion as f32;
        }
        ir /= settings.emissivity;
        ir -= params.tgc * ir_cp[subpage];

        let alpha = (params.alpha[p] - params.tgc * params.cp_alpha[subpage]) * (1.0 + params.ks_ta * ta_term);
        let sx = ks_to[1] * (alpha.powi(3) * (ir + alpha * ta_tr)).sqrt().sqrt();
        let to = (ir / (alpha * (1.0 - ks_to[1] * KELVIN) + sx) + ta_tr).sqrt().sqrt() - KELVIN;

        let range = if to < ct[1] as f32 {
            0
        } else if to < ct[2] as f32 {
            1
        } else if to < ct[3] as f32 {
            2
        } else {
            3
        };
        let denom = alpha * alpha_corr_r[range] * (1.0 + ks_to[range] * (to - ct[range] as f32));
        *t = (ir / denom + ta_tr).sqrt().sqrt() - KELVIN;
    }
    Ok(())
}

/// Replace each deviating pixel with the mean of its valid 4-neighbours.
pub fn correct_deviating_pixels(params: &CalibrationParameters, out: &mut [f32; PIXELS]) {
    let is_deviating = |p: usize| params.deviating_pixels().any(|d| usize::from(d) == p);
    for pixel in params.deviating_pixels() {
        let p = usize::from(pixel);
        let (row, col) = (p / WIDTH, p % WIDTH);
        let mut neighbours = [None; 4];
        if col > 0 {
            neighbours[0] = Some(p - 1);
        }
        if col + 1 < WIDTH {
            neighbours[1] = Some(p + 1);
        }
        if row > 0 {
            neighbours[2] = Some(p - WIDTH);
        }
        if row + 1 < HEIGHT {
            neighbours[3] = Some(p + WIDTH);
        }
        let (sum, n) = neighbours
            .into_iter()
            .flatten()
            .filter(|&q| !is_deviating(q) && out[q].is_finite())
            .fold((0.0f32, 0u8), |(s, n), q| (s + out[q], n + 1));
        if n > 0 {
            out[p] = sum / f32::from(n);
        }
    }
}

/// Merge two complementary subpages into one calibrated frame.
///
/// `samples` must hold one subpage 0 and one subpage 1, in either order.
/// Any non-finite pixel rejects the whole frame.
pub fn assemble_frame(
    samples: &[RawSubpageSample; 2],
    params: &CalibrationParameters,
    settings: &ConversionSettings,
) -> Result<ThermalFrame, AcquisitionError> {
    if samples[0].subpage() & 1 == samples[1].subpage() & 1 {
        return Err(AcquisitionError::DuplicateSubpage((samples[1].subpage() & 1) as u8));
    }
    let mut out = Box::new([f32::NAN; PIXELS]);
    for sample in samples {
        convert_subpage(sample, params, settings, &mut out)?;
    }
    correct_deviating_pixels(params, &mut out);

    let frame = ThermalFrame::from_array(out);
    if let Some(p) = frame.first_non_finite() {
        return Err(AcquisitionError::NonFinite(p as u16));
    }
    Ok(frame)
}
