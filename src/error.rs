//! Unified error types for the thermocam firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform. All variants are `Copy` so they
//! can be carried inside events and returned across the HTTP task boundary
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The I²C control bus failed.
    Bus(BusError),
    /// Calibration bootstrap failed.
    Calibration(CalibrationError),
    /// A frame acquisition attempt failed.
    Acquisition(AcquisitionError),
    /// A subscriber was refused by admission control.
    Admission(AdmissionRejected),
    /// The rendering engine rejected its input.
    Render(RenderError),
    /// The frame payload could not be encoded or decoded.
    Wire(WireError),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Calibration(e) => write!(f, "calibration: {e}"),
            Self::Acquisition(e) => write!(f, "acquisition: {e}"),
            Self::Admission(e) => write!(f, "admission: {e}"),
            Self::Render(e) => write!(f, "render: {e}"),
            Self::Wire(e) => write!(f, "wire: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The device did not acknowledge its address or a data byte.
    NoAcknowledge,
    /// Arbitration loss, bus fault or any other transfer failure.
    Transfer,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAcknowledge => write!(f, "no acknowledge"),
            Self::Transfer => write!(f, "transfer failed"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Calibration errors
// ---------------------------------------------------------------------------

/// Failures of the one-shot calibration bootstrap, in the order the steps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// The sensor did not answer the liveness probe. Always fatal.
    SensorNotDetected,
    /// The EEPROM dump transfer failed.
    DumpFailed(BusError),
    /// The dump was read but its contents are malformed.
    ParameterExtractionFailed(&'static str),
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorNotDetected => write!(f, "sensor not detected"),
            Self::DumpFailed(e) => write!(f, "EEPROM dump failed ({e})"),
            Self::ParameterExtractionFailed(why) => {
                write!(f, "parameter extraction failed: {why}")
            }
        }
    }
}

impl From<CalibrationError> for Error {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}

// ---------------------------------------------------------------------------
// Acquisition errors
// ---------------------------------------------------------------------------

/// Failures of a single acquisition attempt. All are transient unless the
/// configured failure ceiling is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionError {
    /// A subpage transfer failed on the bus.
    SubpageRead(BusError),
    /// The sensor did not flag new data within the poll budget.
    NotReady,
    /// The same subpage was delivered twice within one attempt.
    DuplicateSubpage(u8),
    /// The subpage carried the 0x7FFF invalid-data marker or an unusable
    /// auxiliary value.
    InvalidData,
    /// Conversion produced a non-finite temperature at this pixel index.
    NonFinite(u16),
    /// Acquisition was requested before calibration completed.
    NotCalibrated,
    /// Acquisition stopped after reaching the consecutive-failure ceiling.
    Halted,
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubpageRead(e) => write!(f, "subpage read failed ({e})"),
            Self::NotReady => write!(f, "no new data before poll limit"),
            Self::DuplicateSubpage(page) => write!(f, "subpage {page} delivered twice"),
            Self::InvalidData => write!(f, "invalid frame data"),
            Self::NonFinite(pixel) => write!(f, "non-finite temperature at pixel {pixel}"),
            Self::NotCalibrated => write!(f, "not calibrated"),
            Self::Halted => write!(f, "acquisition halted"),
        }
    }
}

impl From<AcquisitionError> for Error {
    fn from(e: AcquisitionError) -> Self {
        Self::Acquisition(e)
    }
}

impl From<BusError> for AcquisitionError {
    fn from(e: BusError) -> Self {
        Self::SubpageRead(e)
    }
}

// ---------------------------------------------------------------------------
// Admission control
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionRejected {
    /// The subscriber table is at capacity.
    Busy,
}

impl fmt::Display for AdmissionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "Server is busy"),
        }
    }
}

impl From<AdmissionRejected> for Error {
    fn from(e: AdmissionRejected) -> Self {
        Self::Admission(e)
    }
}

// ---------------------------------------------------------------------------
// Rendering errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// Source length does not match the declared source dimensions.
    MalformedUpsampleInput { expected: usize, actual: usize },
    /// A source or target dimension is zero.
    ZeroDimension,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedUpsampleInput { expected, actual } => {
                write!(f, "expected {expected} samples, got {actual}")
            }
            Self::ZeroDimension => write!(f, "zero-sized grid"),
        }
    }
}

impl From<RenderError> for Error {
    fn from(e: RenderError) -> Self {
        Self::Render(e)
    }
}

// ---------------------------------------------------------------------------
// Wire format errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    Encode,
    /// The payload is not `{"temperatures":[...]}`.
    Decode,
    /// The payload parsed but carries the wrong number of samples.
    WrongLength { expected: usize, actual: usize },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "encode failed"),
            Self::Decode => write!(f, "malformed payload"),
            Self::WrongLength { expected, actual } => {
                write!(f, "expected {expected} temperatures, got {actual}")
            }
        }
    }
}

impl From<WireError> for Error {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// A config document could not be parsed.
    Malformed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Malformed => write!(f, "malformed config"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
