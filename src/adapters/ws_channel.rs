//! WebSocket session registry.
//!
//! Implements [`ChannelPort`] over a map of per-session senders. The HTTP
//! server task registers a sender when a subscriber is admitted and drops
//! it on disconnect; the control loop broadcasts through a clone of the
//! same handle.
//!
//! The sender type is abstract so the registry can be exercised on the
//! host; on ESP-IDF it is the server's detached WebSocket sender.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::app::ports::ChannelPort;
use crate::error::AdmissionRejected;
use crate::stream::{Distributor, SubscriberId};

/// Outcome of a connect attempt that got as far as admission control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected(AdmissionRejected),
}

/// Outbound half of one WebSocket session.
pub trait SessionSender: Send {
    /// Queue one text frame. `false` means the session is gone.
    fn send_text(&mut self, payload: &str) -> bool;

    fn is_closed(&self) -> bool;

    /// Send a close frame. Errors are ignored; the session is dropped anyway.
    fn close(&mut self);
}

type Session<T> = Arc<Mutex<T>>;

/// Sends happen outside the map lock: the detached sender blocks until the
/// httpd task has queued the frame, and that task needs the map to
/// register and unregister sessions.
pub struct SessionChannel<T> {
    sessions: Arc<Mutex<BTreeMap<SubscriberId, Session<T>>>>,
}

impl<T> Clone for SessionChannel<T> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<T> Default for SessionChannel<T> {
    fn default() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

// A panic while holding either lock leaves the data itself consistent.
fn lock<U>(mutex: &Mutex<U>) -> MutexGuard<'_, U> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: SessionSender> SessionChannel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, BTreeMap<SubscriberId, Session<T>>> {
        lock(&*self.sessions)
    }

    fn session(&self, id: SubscriberId) -> Option<Session<T>> {
        self.sessions().get(&id).map(Arc::clone)
    }

    pub fn register(&self, id: SubscriberId, sender: T) {
        self.sessions().insert(id, Arc::new(Mutex::new(sender)));
    }

    /// Claim a seat for `id`, then open its sender. A sender that fails to
    /// open gives the seat back.
    pub fn admit<E>(
        &self,
        distributor: &Distributor,
        id: SubscriberId,
        now_ms: u64,
        open: impl FnOnce() -> Result<T, E>,
    ) -> Result<Admission, E> {
        if let Err(rejected) = distributor.on_subscriber_connect(id, now_ms) {
            return Ok(Admission::Rejected(rejected));
        }
        match open() {
            Ok(sender) => {
                self.register(id, sender);
                Ok(Admission::Admitted)
            }
            Err(e) => {
                distributor.on_subscriber_disconnect(id);
                Err(e)
            }
        }
    }

    /// Forget a session without sending anything. Returns whether it was known.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.sessions().remove(&id).is_some()
    }
}

impl<T: SessionSender> ChannelPort for SessionChannel<T> {
    fn broadcast(&mut self, payload: &str) -> usize {
        let targets: Vec<(SubscriberId, Session<T>)> = self
            .sessions()
            .iter()
            .map(|(&id, session)| (id, Arc::clone(session)))
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, session) in targets {
            if lock(&*session).send_text(payload) {
                delivered += 1;
            } else {
                debug!("WS | {} dropped on send", id);
                failed.push((id, session));
            }
        }

        if !failed.is_empty() {
            let mut sessions = self.sessions();
            for (id, session) in failed {
                // Only drop the entry we failed on, not a reconnect under the same id.
                if sessions.get(&id).is_some_and(|current| Arc::ptr_eq(current, &session)) {
                    sessions.remove(&id);
                }
            }
        }
        delivered
    }

    fn connection_count(&self) -> usize {
        self.sessions().len()
    }

    fn is_alive(&self, id: SubscriberId) -> bool {
        self.session(id).is_some_and(|s| !lock(&*s).is_closed())
    }

    fn close(&mut self, id: SubscriberId) {
        let removed = self.sessions().remove(&id);
        if let Some(session) = removed {
            lock(&*session).close();
        }
    }
}
