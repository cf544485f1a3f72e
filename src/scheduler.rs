//! Cadence scheduler for the control loop.
//!
//! Keeps one independent interval per [`Activity`] and notifies a
//! [`SchedulerDelegate`] when an activity comes due. Within one tick the
//! activities always fire in the fixed order acquire → push → housekeeping,
//! so a frame acquired on a tick is the one pushed on that same tick.
//!
//! ```text
//!   main loop ──(delta_ms)──▶ Scheduler::tick
//!                                 │
//!          ┌──────────────────────┼──────────────────────┐
//!          ▼                      ▼                      ▼
//!      Acquire (100 ms)      Push (100 ms)     Housekeeping (2000 ms)
//!          │                      │                      │
//!          └──────────▶ SchedulerDelegate::on_activity_due ◀┘
//! ```

use log::info;

use crate::app::ports::{Activity, SchedulerDelegate};
use crate::config::SystemConfig;

#[derive(Debug, Clone, Copy)]
struct Cadence {
    interval_ms: u32,
    elapsed_ms: u32,
}

impl Cadence {
    const fn every(interval_ms: u32) -> Self {
        Self {
            interval_ms: if interval_ms == 0 { 1 } else { interval_ms },
            elapsed_ms: 0,
        }
    }
}

/// The scheduler engine.
///
/// Decoupled from the pipeline: when an activity is due it invokes the
/// delegate rather than doing the work itself, so it can be tested with a
/// recording delegate and no hardware.
pub struct Scheduler {
    /// Indexed by `Activity as usize`.
    cadences: [Cadence; 3],
}

impl Scheduler {
    pub fn new(acquire_ms: u32, push_ms: u32, housekeeping_ms: u32) -> Self {
        Self {
            cadences: [
                Cadence::every(acquire_ms),
                Cadence::every(push_ms),
                Cadence::every(housekeeping_ms),
            ],
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(
            config.acquisition_interval_ms,
            config.push_interval_ms,
            config.housekeeping_interval_ms,
        )
    }

    /// Adopt the cadences of a (validated) configuration. Elapsed time is kept.
    pub fn apply_config(&mut self, config: &SystemConfig) {
        self.set_interval(Activity::Acquire, config.acquisition_interval_ms);
        self.set_interval(Activity::Push, config.push_interval_ms);
        self.set_interval(Activity::Housekeeping, config.housekeeping_interval_ms);
    }

    /// Change one activity's interval. Zero is treated as 1 ms.
    pub fn set_interval(&mut self, activity: Activity, interval_ms: u32) {
        let cadence = &mut self.cadences[activity as usize];
        let interval_ms = interval_ms.max(1);
        if cadence.interval_ms != interval_ms {
            info!(
                "Scheduler: {} every {} ms (was {} ms)",
                activity.label(),
                interval_ms,
                cadence.interval_ms
            );
            cadence.interval_ms = interval_ms;
        }
    }

    pub fn interval(&self, activity: Activity) -> u32 {
        self.cadences[activity as usize].interval_ms
    }

    /// Advance time by `delta_ms` and fire every activity that came due.
    ///
    /// An activity fires at most once per tick; a long stall does not
    /// trigger a burst of catch-up runs. The remainder past the interval is
    /// carried so the long-run rate matches the configured cadence.
    pub fn tick(&mut self, delta_ms: u32, delegate: &mut dyn SchedulerDelegate) {
        for activity in Activity::ALL {
            let cadence = &mut self.cadences[activity as usize];
            cadence.elapsed_ms = cadence.elapsed_ms.saturating_add(delta_ms);
            if cadence.elapsed_ms >= cadence.interval_ms {
                cadence.elapsed_ms %= cadence.interval_ms;
                delegate.on_activity_due(activity);
            }
        }
    }
}
