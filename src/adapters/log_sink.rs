//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured camera events to the
//! ESP-IDF logger (UART / USB-CDC in production). Per-frame events go out
//! at debug level; everything else at info or above.

use log::{debug, error, info, warn};

use crate::app::events::{CameraEvent, HaltReason};
use crate::app::ports::EventSink;

/// Adapter that logs every [`CameraEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &CameraEvent) {
        match event {
            CameraEvent::Calibrated { source } => {
                info!("CAL | ready, source={:?}", source);
            }
            CameraEvent::Halted(HaltReason::Calibration(e)) => {
                error!("HALT | calibration: {}", e);
            }
            CameraEvent::Halted(HaltReason::TooManyFailures(n)) => {
                error!("HALT | {} consecutive acquisition failures", n);
            }
            CameraEvent::FrameAcquired { sequence, min, max } => {
                debug!(
                    "FRAME | #{} | min={:.1}\u{00b0}C max={:.1}\u{00b0}C",
                    sequence, min, max
                );
            }
            CameraEvent::AcquisitionFailed { error, consecutive } => {
                warn!("FRAME | discarded: {} (x{})", error, consecutive);
            }
            CameraEvent::SubscriberRemoved { id, reason } => {
                info!("CLIENT | {} removed ({:?})", id, reason);
            }
            CameraEvent::FramePushed { recipients, bytes } => {
                debug!("PUSH | {} B to {} clients", bytes, recipients);
            }
            CameraEvent::Status(s) => {
                let rt = &s.runtime;
                info!(
                    "STATUS | clients {} / {} total (cap {}) | frames={} failed={} | up {}s",
                    s.subscribers, s.connections, s.capacity, s.frames_published, rt.failed_attempts, rt.uptime_secs
                );
                if let Some(heap) = rt.heap {
                    info!("STATUS | free heap {} B (min {} B)", heap.free, heap.min_free);
                }
            }
            CameraEvent::ConfigUpdated => {
                info!("CONFIG | updated");
            }
        }
    }
}
