//! System configuration parameters
//!
//! All tunable parameters for the thermocam pipeline. Cadence, capacity,
//! idle timeout and emissivity can be changed at runtime through
//! [`CameraCommand::UpdateConfig`](crate::app::commands::CameraCommand).

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::render::palette::Palette;
use crate::sensor::registers::{AdcResolution, ReadoutPattern, RefreshRate, DEFAULT_ADDRESS};

/// Upper bound on simultaneous subscribers the table can hold.
pub const MAX_SUBSCRIBER_SLOTS: usize = 8;

/// Which acquisition strategy drives the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverKind {
    /// Configures the sensor and degrades to preset constants when the
    /// EEPROM dump is unusable.
    Library,
    /// Leaves readout settings alone; every calibration fault is fatal.
    Raw,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Sensor bus ---
    /// 7-bit I²C address of the MLX90640
    pub i2c_address: u8,
    /// Bus clock in Hz
    pub i2c_clock_hz: u32,

    // --- Sensor readout ---
    pub refresh_rate: RefreshRate,
    pub adc_resolution: AdcResolution,
    pub readout_pattern: ReadoutPattern,
    pub driver: DriverKind,
    /// Status polls per subpage before giving up
    pub ready_poll_limit: u16,
    /// Delay between status polls (milliseconds)
    pub ready_poll_interval_ms: u32,

    // --- Conversion ---
    /// Object emissivity (0, 1]
    pub emissivity: f32,
    /// Reflected temperature is ambient minus this shift (°C)
    pub ta_shift_c: f32,

    // --- Acquisition ---
    /// Acquisition cadence (milliseconds)
    pub acquisition_interval_ms: u32,
    /// Halt after this many failed attempts in a row; `None` retries forever
    pub max_consecutive_failures: Option<u32>,

    // --- Distribution ---
    /// Push cadence (milliseconds)
    pub push_interval_ms: u32,
    /// Housekeeping sweep cadence (milliseconds)
    pub housekeeping_interval_ms: u32,
    /// Maximum simultaneous subscribers
    pub max_subscribers: u8,
    /// Subscribers silent for longer than this are evicted (milliseconds)
    pub idle_timeout_ms: u32,

    // --- Viewer ---
    /// Pull fallback cadence when no standing connection exists (milliseconds)
    pub pull_interval_ms: u32,
    pub render_width: u16,
    pub render_height: u16,
    /// Flip horizontally so the image reads like a mirror
    pub mirror_horizontal: bool,
    pub default_palette: Palette,

    // --- Network ---
    pub ap_ssid: String<32>,
    pub ap_password: String<64>,

    // --- Timing ---
    /// Main loop sleep between scheduler ticks (milliseconds)
    pub loop_tick_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut ap_ssid = String::new();
        let _ = ap_ssid.push_str("ESP32-Thermal-Camera");
        let mut ap_password = String::new();
        let _ = ap_password.push_str("12345678");

        Self {
            // Sensor bus
            i2c_address: DEFAULT_ADDRESS,
            i2c_clock_hz: 400_000,

            // Sensor readout
            refresh_rate: RefreshRate::FourHz,
            adc_resolution: AdcResolution::Bits16,
            readout_pattern: ReadoutPattern::Interleaved,
            driver: DriverKind::Library,
            ready_poll_limit: 60,
            ready_poll_interval_ms: 10,

            // Conversion
            emissivity: 0.95,
            ta_shift_c: 8.0,

            // Acquisition
            acquisition_interval_ms: 100,
            max_consecutive_failures: None,

            // Distribution
            push_interval_ms: 100,         // 10 Hz
            housekeeping_interval_ms: 2000, // 0.5 Hz
            max_subscribers: 2,
            idle_timeout_ms: 10_000,

            // Viewer
            pull_interval_ms: 1000,
            render_width: 320,
            render_height: 240,
            mirror_horizontal: true,
            default_palette: Palette::Rainbow,

            // Network
            ap_ssid,
            ap_password,

            // Timing
            loop_tick_ms: 20,
        }
    }
}

impl SystemConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.i2c_address == 0 || self.i2c_address > 0x7F {
            return Err(ConfigError::ValidationFailed("i2c_address out of 7-bit range"));
        }
        if self.i2c_clock_hz == 0 || self.i2c_clock_hz > 1_000_000 {
            return Err(ConfigError::ValidationFailed("i2c_clock_hz must be 1..=1MHz"));
        }
        if self.ready_poll_limit == 0 {
            return Err(ConfigError::ValidationFailed("ready_poll_limit must be > 0"));
        }
        check_emissivity(self.emissivity)?;
        if !self.ta_shift_c.is_finite() {
            return Err(ConfigError::ValidationFailed("ta_shift_c must be finite"));
        }
        if self.acquisition_interval_ms == 0
            || self.push_interval_ms == 0
            || self.housekeeping_interval_ms == 0
            || self.loop_tick_ms == 0
        {
            return Err(ConfigError::ValidationFailed("intervals must be > 0"));
        }
        if self.acquisition_interval_ms > self.push_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "acquisition_interval_ms must not exceed push_interval_ms",
            ));
        }
        if self.max_consecutive_failures == Some(0) {
            return Err(ConfigError::ValidationFailed("max_consecutive_failures must be > 0"));
        }
        if self.max_subscribers == 0 || self.max_subscribers as usize > MAX_SUBSCRIBER_SLOTS {
            return Err(ConfigError::ValidationFailed("max_subscribers must be 1..=8"));
        }
        if self.idle_timeout_ms < self.push_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "idle_timeout_ms must be at least one push interval",
            ));
        }
        if self.render_width == 0 || self.render_height == 0 || self.pull_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("viewer dimensions and cadence must be > 0"));
        }
        Ok(())
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }
}

/// Emissivity must lie in (0, 1].
pub fn check_emissivity(emissivity: f32) -> Result<(), ConfigError> {
    if emissivity > 0.0 && emissivity <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed("emissivity must be in (0, 1]"))
    }
}
