//! The current-frame slot.
//!
//! Exactly one frame is live. Publishing swaps in a new `Arc`; readers clone
//! the `Arc` under the lock and then work on their own reference, so a
//! reader can never observe a frame that is still being written.

use std::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::frame::ThermalFrame;

struct Slot {
    frame: Arc<ThermalFrame>,
    /// Number of frames published so far; 0 while the blank frame is live.
    sequence: u64,
}

pub struct FrameSlot {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Slot>>,
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSlot {
    /// Starts out holding a blank frame.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Slot {
                frame: Arc::new(ThermalFrame::blank()),
                sequence: 0,
            })),
        }
    }

    /// Replace the current frame. Returns the new sequence number.
    pub fn publish(&self, frame: ThermalFrame) -> u64 {
        let frame = Arc::new(frame);
        self.inner.lock(|cell| {
            let mut slot = cell.borrow_mut();
            slot.frame = frame;
            slot.sequence += 1;
            slot.sequence
        })
    }

    pub fn current(&self) -> Arc<ThermalFrame> {
        self.inner.lock(|cell| Arc::clone(&cell.borrow().frame))
    }

    /// Current frame together with its sequence number.
    pub fn current_with_sequence(&self) -> (Arc<ThermalFrame>, u64) {
        self.inner.lock(|cell| {
            let slot = cell.borrow();
            (Arc::clone(&slot.frame), slot.sequence)
        })
    }

    pub fn sequence(&self) -> u64 {
        self.inner.lock(|cell| cell.borrow().sequence)
    }
}
