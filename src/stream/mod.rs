//! Live distribution layer.
//!
//! ```text
//!   publish ──▶ FrameSlot ──┬──▶ push ──▶ ChannelPort::broadcast   (every push tick)
//!                           └──▶ snapshot / snapshot_payload       (pull, /data)
//!
//!   connect ──▶ SubscriberTable (≤ capacity, else Busy)
//!   housekeeping ──▶ evict_stale (dead · idle · over capacity)
//! ```

pub mod codec;
pub mod distributor;
pub mod slot;
pub mod subscribers;

pub use distributor::{Distributor, PushOutcome};
pub use subscribers::{EvictionReason, SubscriberId};
