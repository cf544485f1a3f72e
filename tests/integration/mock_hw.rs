//! Mock adapters for integration tests.
//!
//! Records every event and every transport call so tests can assert on the
//! full history without a network stack.

use std::collections::BTreeSet;

use thermocam::app::events::CameraEvent;
use thermocam::app::ports::{ChannelPort, EventSink};
use thermocam::config::SystemConfig;
use thermocam::frame::{ThermalFrame, PIXELS};
use thermocam::sensor::bus::I2cBus;
use thermocam::sensor::sim::{NoopDelay, SimulatedCamera};
use thermocam::sensor::SensorSource;
use thermocam::stream::SubscriberId;

pub type SimSource = SensorSource<I2cBus<SimulatedCamera>, NoopDelay>;

/// A sensor source wired to `cam` (which stays usable for fault injection).
pub fn sim_source(cam: &SimulatedCamera, config: &SystemConfig) -> SimSource {
    SensorSource::from_config(
        I2cBus::new(cam.clone(), config.i2c_address),
        NoopDelay::default(),
        config,
    )
}

pub fn uniform_frame(t: f32) -> ThermalFrame {
    ThermalFrame::try_from(vec![t; PIXELS]).expect("PIXELS values")
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<CameraEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&CameraEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn last_status(&self) -> Option<&CameraEvent> {
        self.events
            .iter()
            .rev()
            .find(|e| matches!(e, CameraEvent::Status(_)))
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &CameraEvent) {
        self.events.push(event.clone());
    }
}

// ── MockChannel ───────────────────────────────────────────────

/// Transport double: a set of open connections and a log of what was sent.
#[derive(Default)]
pub struct MockChannel {
    pub open: BTreeSet<SubscriberId>,
    pub sent: Vec<String>,
    pub closed: Vec<SubscriberId>,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn connect(&mut self, id: SubscriberId) {
        self.open.insert(id);
    }

    /// Drop a connection without telling the distributor, as a crashed
    /// browser tab would.
    pub fn vanish(&mut self, id: SubscriberId) {
        self.open.remove(&id);
    }
}

impl ChannelPort for MockChannel {
    fn broadcast(&mut self, payload: &str) -> usize {
        self.sent.push(payload.to_owned());
        self.open.len()
    }

    fn connection_count(&self) -> usize {
        self.open.len()
    }

    fn is_alive(&self, id: SubscriberId) -> bool {
        self.open.contains(&id)
    }

    fn close(&mut self, id: SubscriberId) {
        self.open.remove(&id);
        self.closed.push(id);
    }
}
