//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CameraService / Distributor (domain)
//! ```
//!
//! Driven adapters (sensor drivers, network channels, event sinks) implement
//! these traits. The domain consumes them via generics, so the pipeline core
//! never touches hardware or sockets directly.

use crate::error::{AcquisitionError, CalibrationError};
use crate::frame::ThermalFrame;
use crate::sensor::calibration::CalibrationParameters;
use crate::sensor::conversion::ConversionSettings;
use crate::stream::subscribers::SubscriberId;

// ───────────────────────────────────────────────────────────────
// Thermal source port (driven adapter: sensor → domain)
// ───────────────────────────────────────────────────────────────

/// One acquisition strategy. The service calls [`bootstrap`](Self::bootstrap)
/// once, then [`acquire`](Self::acquire) on every acquisition tick.
pub trait ThermalSource {
    /// Probe the sensor and produce calibration constants.
    ///
    /// Whether a bad EEPROM dump is fatal or degrades to preset constants
    /// is up to the implementation; a missing sensor is always fatal.
    fn bootstrap(&mut self) -> Result<CalibrationParameters, CalibrationError>;

    /// Read both subpages and convert them into a complete frame.
    fn acquire(
        &mut self,
        params: &CalibrationParameters,
        settings: &ConversionSettings,
    ) -> Result<ThermalFrame, AcquisitionError>;
}

// ───────────────────────────────────────────────────────────────
// Channel port (driven adapter: domain → subscribers)
// ───────────────────────────────────────────────────────────────

/// Transport carrying frames to live subscribers.
pub trait ChannelPort {
    /// Send `payload` to every open connection. Returns how many accepted it.
    fn broadcast(&mut self, payload: &str) -> usize;

    /// Connections the transport currently holds open.
    fn connection_count(&self) -> usize;

    /// Whether the transport still considers this subscriber connected.
    fn is_alive(&self, id: SubscriberId) -> bool;

    /// Tear down a subscriber's connection.
    fn close(&mut self, id: SubscriberId);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`CameraEvent`](super::events::CameraEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::CameraEvent);
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the pipeline)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when an activity is due.
///
/// The [`Scheduler`](crate::scheduler::Scheduler) only keeps time; the
/// main loop implements this to drive acquisition, push and housekeeping.
pub trait SchedulerDelegate {
    fn on_activity_due(&mut self, activity: Activity);
}

/// Periodic activities, listed in the order they run within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Activity {
    /// Read a subpage pair and publish the resulting frame.
    Acquire,
    /// Broadcast the current frame to subscribers.
    Push,
    /// Evict dead, idle and excess subscribers; log status.
    Housekeeping,
}

impl Activity {
    pub const ALL: [Self; 3] = [Self::Acquire, Self::Push, Self::Housekeeping];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Acquire => "acquire",
            Self::Push => "push",
            Self::Housekeeping => "housekeeping",
        }
    }
}
