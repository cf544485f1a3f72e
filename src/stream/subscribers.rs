//! Admission-controlled subscriber table.
//!
//! Fixed storage of [`MAX_SUBSCRIBER_SLOTS`]; the effective capacity is
//! configurable below that. A connection beyond capacity is refused
//! outright, never queued.

use heapless::Vec;

use crate::config::MAX_SUBSCRIBER_SLOTS;
use crate::error::AdmissionRejected;

/// Transport-assigned connection identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub u32);

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub connected_at_ms: u64,
    pub last_activity_ms: u64,
}

/// Why the housekeeping sweep removed a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// The transport reports the connection closed.
    Dead,
    /// No activity within the idle timeout.
    Idle,
    /// Capacity was lowered below the current count.
    OverCapacity,
}

#[derive(Debug)]
pub struct SubscriberTable {
    entries: Vec<Subscriber, MAX_SUBSCRIBER_SLOTS>,
    capacity: usize,
    idle_timeout_ms: u64,
}

impl SubscriberTable {
    pub fn new(capacity: usize, idle_timeout_ms: u64) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.clamp(1, MAX_SUBSCRIBER_SLOTS),
            idle_timeout_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.entries.iter().any(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscriber> {
        self.entries.iter()
    }

    /// Admit `id` if below capacity. Re-admitting a known id only refreshes it.
    pub fn admit(&mut self, id: SubscriberId, now_ms: u64) -> Result<(), AdmissionRejected> {
        if let Some(existing) = self.entries.iter_mut().find(|s| s.id == id) {
            existing.last_activity_ms = now_ms;
            return Ok(());
        }
        if self.entries.len() >= self.capacity {
            return Err(AdmissionRejected::Busy);
        }
        self.entries
            .push(Subscriber {
                id,
                connected_at_ms: now_ms,
                last_activity_ms: now_ms,
            })
            .map_err(|_| AdmissionRejected::Busy)
    }

    /// Returns `true` if `id` was present.
    pub fn remove(&mut self, id: SubscriberId) -> bool {
        match self.entries.iter().position(|s| s.id == id) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn touch(&mut self, id: SubscriberId, now_ms: u64) -> bool {
        match self.entries.iter_mut().find(|s| s.id == id) {
            Some(s) => {
                s.last_activity_ms = now_ms;
                true
            }
            None => false,
        }
    }

    /// Takes effect for new admissions now and for existing ones at the next sweep.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.clamp(1, MAX_SUBSCRIBER_SLOTS);
    }

    pub fn set_idle_timeout(&mut self, idle_timeout_ms: u64) {
        self.idle_timeout_ms = idle_timeout_ms;
    }

    /// Remove dead and idle subscribers, then the newest ones beyond
    /// capacity. A subscriber idle for exactly the timeout is kept.
    pub fn sweep(
        &mut self,
        now_ms: u64,
        mut is_alive: impl FnMut(SubscriberId) -> bool,
    ) -> Vec<(SubscriberId, EvictionReason), MAX_SUBSCRIBER_SLOTS> {
        let mut evicted = Vec::new();
        let timeout = self.idle_timeout_ms;
        self.entries.retain(|s| {
            let reason = if !is_alive(s.id) {
                Some(EvictionReason::Dead)
            } else if now_ms.saturating_sub(s.last_activity_ms) > timeout {
                Some(EvictionReason::Idle)
            } else {
                None
            };
            match reason {
                Some(r) => {
                    let _ = evicted.push((s.id, r));
                    false
                }
                None => true,
            }
        });

        if self.entries.len() > self.capacity {
            // Oldest connections keep their seats.
            self.entries.sort_unstable_by_key(|s| (s.connected_at_ms, s.id));
            while self.entries.len() > self.capacity {
                if let Some(s) = self.entries.pop() {
                    let _ = evicted.push((s.id, EvictionReason::OverCapacity));
                }
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: SubscriberId = SubscriberId(1);
    const B: SubscriberId = SubscriberId(2);
    const C: SubscriberId = SubscriberId(3);

    #[test]
    fn third_connection_is_busy() {
        let mut t = SubscriberTable::new(2, 10_000);
        t.admit(A, 0).unwrap();
        t.admit(B, 0).unwrap();
        assert_eq!(t.admit(C, 0), Err(AdmissionRejected::Busy));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn reconnect_after_disconnect_is_admitted() {
        let mut t = SubscriberTable::new(2, 10_000);
        t.admit(A, 0).unwrap();
        t.admit(B, 0).unwrap();
        assert!(t.remove(A));
        assert!(t.admit(C, 5).is_ok());
        assert!(t.contains(C));
    }

    #[test]
    fn readmitting_known_id_does_not_consume_a_slot() {
        let mut t = SubscriberTable::new(1, 10_000);
        t.admit(A, 0).unwrap();
        t.admit(A, 50).unwrap();
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn idle_threshold_is_exclusive() {
        let mut t = SubscriberTable::new(2, 1000);
        t.admit(A, 0).unwrap();
        t.admit(B, 0).unwrap();
        t.touch(B, 500);
        let evicted = t.sweep(1000, |_| true);
        assert!(evicted.is_empty());
        let evicted = t.sweep(1001, |_| true);
        assert_eq!(evicted.as_slice(), &[(A, EvictionReason::Idle)]);
        assert!(t.contains(B));
    }

    #[test]
    fn dead_subscribers_are_removed() {
        let mut t = SubscriberTable::new(2, 10_000);
        t.admit(A, 0).unwrap();
        t.admit(B, 0).unwrap();
        let evicted = t.sweep(10, |id| id != B);
        assert_eq!(evicted.as_slice(), &[(B, EvictionReason::Dead)]);
    }

    #[test]
    fn lowered_capacity_drops_newest_in_one_sweep() {
        let mut t = SubscriberTable::new(3, 10_000);
        t.admit(A, 0).unwrap();
        t.admit(B, 10).unwrap();
        t.admit(C, 20).unwrap();
        t.set_capacity(1);
        let evicted = t.sweep(30, |_| true);
        assert_eq!(t.len(), 1);
        assert!(t.contains(A));
        assert_eq!(
            evicted.as_slice(),
            &[(C, EvictionReason::OverCapacity), (B, EvictionReason::OverCapacity)]
        );
    }
}
