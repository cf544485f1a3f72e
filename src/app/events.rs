//! Outbound camera events.
//!
//! The [`CameraService`](super::service::CameraService) and the pipeline
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them.

use core::fmt;

use crate::diagnostics::RuntimeMetrics;
use crate::error::{AcquisitionError, CalibrationError};
use crate::sensor::calibration::CalibrationSource;
use crate::stream::{EvictionReason, SubscriberId};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraEvent {
    /// Calibration bootstrap finished; acquisition may start.
    Calibrated { source: CalibrationSource },

    /// Acquisition stopped for good.
    Halted(HaltReason),

    /// A new frame became current.
    FrameAcquired { sequence: u64, min: f32, max: f32 },

    /// One acquisition attempt was discarded.
    AcquisitionFailed {
        error: AcquisitionError,
        consecutive: u32,
    },

    /// Housekeeping removed a subscriber.
    SubscriberRemoved {
        id: SubscriberId,
        reason: EvictionReason,
    },

    /// One payload went out to live subscribers.
    FramePushed { recipients: usize, bytes: usize },

    /// Periodic housekeeping status.
    Status(StatusReport),

    /// Runtime configuration was replaced.
    ConfigUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Bootstrap failed in a way the driver treats as fatal.
    Calibration(CalibrationError),
    /// `max_consecutive_failures` attempts failed in a row.
    TooManyFailures(u32),
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calibration(e) => write!(f, "calibration failed: {e}"),
            Self::TooManyFailures(n) => write!(f, "{n} consecutive acquisition failures"),
        }
    }
}

/// Housekeeping snapshot: admitted subscribers against open transport
/// connections, plus acquisition counters and heap headroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub subscribers: usize,
    pub capacity: usize,
    pub connections: usize,
    pub frames_published: u64,
    pub runtime: RuntimeMetrics,
}
