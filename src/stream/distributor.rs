//! Live distribution: one current frame, a bounded set of subscribers, a
//! push on every push tick and a housekeeping sweep.
//!
//! Every method takes `&self` so the control loop and the HTTP server task
//! can share one `Arc<Distributor>`.

use std::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;
use log::{debug, info, warn};

use crate::app::ports::ChannelPort;
use crate::config::MAX_SUBSCRIBER_SLOTS;
use crate::error::{AdmissionRejected, WireError};
use crate::frame::ThermalFrame;

use super::codec;
use super::slot::FrameSlot;
use super::subscribers::{EvictionReason, SubscriberId, SubscriberTable};

/// Result of one push tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// No subscribers; nothing was encoded.
    Idle,
    /// Nothing has been published yet.
    NoFrame,
    /// One payload of `bytes` bytes went to `recipients` connections.
    Sent { recipients: usize, bytes: usize },
}

pub type Evictions = Vec<(SubscriberId, EvictionReason), MAX_SUBSCRIBER_SLOTS>;

pub struct Distributor {
    slot: FrameSlot,
    subscribers: Mutex<CriticalSectionRawMutex, RefCell<SubscriberTable>>,
}

impl Distributor {
    pub fn new(capacity: usize, idle_timeout_ms: u64) -> Self {
        Self {
            slot: FrameSlot::new(),
            subscribers: Mutex::new(RefCell::new(SubscriberTable::new(capacity, idle_timeout_ms))),
        }
    }

    fn with_table<R>(&self, f: impl FnOnce(&mut SubscriberTable) -> R) -> R {
        self.subscribers.lock(|cell| f(&mut cell.borrow_mut()))
    }

    // ── Frame ─────────────────────────────────────────────────

    /// Make `frame` the current frame. Returns its sequence number.
    pub fn publish(&self, frame: ThermalFrame) -> u64 {
        self.slot.publish(frame)
    }

    /// Pull-style read of the current frame. Never touches the subscriber table.
    pub fn snapshot(&self) -> Arc<ThermalFrame> {
        self.slot.current()
    }

    /// The current frame in wire format.
    pub fn snapshot_payload(&self) -> Result<String, WireError> {
        codec::encode(&self.slot.current())
    }

    pub fn frames_published(&self) -> u64 {
        self.slot.sequence()
    }

    // ── Subscribers ───────────────────────────────────────────

    pub fn on_subscriber_connect(&self, id: SubscriberId, now_ms: u64) -> Result<(), AdmissionRejected> {
        let result = self.with_table(|t| t.admit(id, now_ms).map(|()| (t.len(), t.capacity())));
        match result {
            Ok((count, capacity)) => {
                info!("CLIENT | {} connected ({}/{})", id, count, capacity);
                Ok(())
            }
            Err(e) => {
                warn!("CLIENT | {} rejected: {}", id, e);
                Err(e)
            }
        }
    }

    pub fn on_subscriber_disconnect(&self, id: SubscriberId) {
        if self.with_table(|t| t.remove(id)) {
            info!("CLIENT | {} disconnected", id);
        }
    }

    pub fn on_subscriber_activity(&self, id: SubscriberId, now_ms: u64) {
        self.with_table(|t| t.touch(id, now_ms));
    }

    pub fn subscriber_count(&self) -> usize {
        self.with_table(|t| t.len())
    }

    pub fn capacity(&self) -> usize {
        self.with_table(|t| t.capacity())
    }

    pub fn set_capacity(&self, capacity: usize) {
        self.with_table(|t| t.set_capacity(capacity));
    }

    pub fn set_idle_timeout(&self, idle_timeout_ms: u64) {
        self.with_table(|t| t.set_idle_timeout(idle_timeout_ms));
    }

    // ── Periodic work ─────────────────────────────────────────

    /// Encode the current frame once and broadcast it, if anyone is listening.
    pub fn push(&self, channel: &mut impl ChannelPort) -> Result<PushOutcome, WireError> {
        if self.subscriber_count() == 0 {
            return Ok(PushOutcome::Idle);
        }
        let (frame, sequence) = self.slot.current_with_sequence();
        if sequence == 0 {
            return Ok(PushOutcome::NoFrame);
        }
        let payload = codec::encode(&frame)?;
        let recipients = channel.broadcast(&payload);
        debug!("PUSH | frame {} → {} recipients ({} B)", sequence, recipients, payload.len());
        Ok(PushOutcome::Sent {
            recipients,
            bytes: payload.len(),
        })
    }

    /// Drop dead, idle and excess subscribers and close their connections.
    pub fn evict_stale(&self, now_ms: u64, channel: &mut impl ChannelPort) -> Evictions {
        let evicted = self.with_table(|t| t.sweep(now_ms, |id| channel.is_alive(id)));
        for &(id, reason) in &evicted {
            info!("CLIENT | {} evicted ({:?})", id, reason);
            channel.close(id);
        }
        evicted
    }
}
